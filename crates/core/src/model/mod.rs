mod band;
mod event;
mod mix;
mod outcome;
mod question;
mod session;
mod session_log;

pub use band::Band;
pub use event::AnswerEvent;
pub use mix::{QuestionKind, QuestionMix};
pub use outcome::{AnswerOutcome, AnsweredQuestion, SpeedTier};
pub use question::{Question, QuestionSignature, signature_of};
pub use session::{SessionMode, SessionSummary, SessionSummaryError};
pub use session_log::SessionLogEntry;
