//! # Exam Attempt Client
//!
//! 学习管理系统的考试作答客户端核心
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 网关层（Clients）
//! - `clients/` - 唯一与后端通信的地方
//! - `ExamGateway` - 六个网关操作的 trait
//! - `HttpExamGateway` - 基于 reqwest 的实现，负责信封拆解、列表归一化、失败归类
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 不关心流程，只处理答案
//! - `AnswerBuffer` - 题目 → 暂存答案的有序映射
//! - `true_false` - 判断题选项文字 → 标准记号
//! - `submission_builder` - 缓冲区 → 完整提交记录
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次作答"的完整流程
//! - `AttemptState` - 单一的带数据状态值
//! - `AttemptMachine` - 状态机（load → start → answer → submit → result）
//!
//! ### ④ 编排层（App）
//! - `app` - 读取答题卡，驱动状态机，输出成绩
//!
//! ## 已知限制
//!
//! 同一考试在两个标签页（两台状态机）中各自开始作答不会被客户端阻止，由后端的作答次数规则约束。

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use clients::{ExamGateway, HttpExamGateway};
pub use config::Config;
pub use error::{AppError, AppResult, AttemptError, ErrorKind, GatewayError, GatewayResult};
pub use models::{AnswerValue, Exam, ExamResult, Question, SubmissionRecord};
pub use workflow::{AttemptCtx, AttemptMachine, AttemptPhase, AttemptState, Failure};
