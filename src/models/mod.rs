pub mod question;

pub use question::{AnswerResult, Question, QuestionType};
