#![forbid(unsafe_code)]

pub mod error;
pub mod practice;
pub mod selector;
pub mod session;
pub mod source;

pub use drill_core::Clock;

pub use error::{PickError, SessionError};
pub use practice::{AnswerResult, PracticeService};
pub use selector::{LevelSelector, PickedQuestion};
pub use session::LearningSession;
pub use source::{FnSource, QuestionSource};
