pub mod exam_gateway;
pub mod http_gateway;

pub use exam_gateway::ExamGateway;
pub use http_gateway::HttpExamGateway;
