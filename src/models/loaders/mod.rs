pub mod answer_sheet;

pub use answer_sheet::{load_answer_sheet, AnswerSheet, SheetAnswer};
