#![forbid(unsafe_code)]

pub mod repository;
pub mod sink;

pub use repository::{InMemorySessionLog, SessionLogRepository, StorageError};
pub use sink::{AnswerSink, ChannelSink, InMemoryAnswerLog, JsonLinesSink};
