use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AnswerOutcome, Band, QuestionSignature, SessionMode};

/// Everything that happened on one answer, as handed to a persistence sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEvent {
    pub session_id: Uuid,
    pub signature: QuestionSignature,
    pub band: Band,
    pub outcome: AnswerOutcome,
    pub mode: SessionMode,
    pub response_time_secs: f64,
    pub speed_score: f64,
    pub delta: f64,
    pub level: f64,
    pub streak: u32,
    pub answered_at: DateTime<Utc>,
}
