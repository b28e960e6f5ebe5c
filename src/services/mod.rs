pub mod answer_buffer;
pub mod submission_builder;
pub mod true_false;

pub use answer_buffer::AnswerBuffer;
pub use submission_builder::{build_submission, validate_answer};
pub use true_false::{canonical_token, token_from_text};
