pub mod attempt_ctx;
pub mod attempt_machine;
pub mod attempt_state;

pub use attempt_ctx::AttemptCtx;
pub use attempt_machine::AttemptMachine;
pub use attempt_state::{AttemptPhase, AttemptState, Failure};
