use drill_core::model::{AnswerOutcome, QuestionSignature, SessionLogEntry};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the per-session question log.
///
/// Implementors only provide raw entry access and the question counter; the
/// bookkeeping rules live in the provided methods so every backend agrees on
/// them.
pub trait SessionLogRepository: Send + Sync {
    /// Fetch the entry for a signature, if it was ever asked.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, signature: &QuestionSignature) -> Result<Option<SessionLogEntry>, StorageError>;

    /// Persist or replace the entry for a signature.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    fn upsert(&self, signature: &QuestionSignature, entry: SessionLogEntry) -> Result<(), StorageError>;

    /// Number of questions recorded so far this session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn counter(&self) -> Result<u64, StorageError>;

    /// Bump the question counter and return its new value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the counter cannot be updated.
    fn advance_counter(&self) -> Result<u64, StorageError>;

    /// Record that `signature` was asked and answered with `outcome`.
    ///
    /// Skips and unrecognised outcomes still count as an asking but leave the
    /// correctness tallies alone. Returns the new counter value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` from the underlying backend.
    fn record_asked(
        &self,
        signature: &QuestionSignature,
        outcome: Option<AnswerOutcome>,
    ) -> Result<u64, StorageError> {
        let index = self.advance_counter()?;
        let mut entry = self.get(signature)?.unwrap_or_default();
        entry.record(index, outcome);
        self.upsert(signature, entry)?;
        Ok(index)
    }

    /// Answered correctly more often than not. Unknown signatures are not overasked.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` from the underlying backend.
    fn is_overasked(&self, signature: &QuestionSignature) -> Result<bool, StorageError> {
        Ok(self
            .get(signature)?
            .is_some_and(|entry| entry.is_overasked()))
    }

    /// Missed at least once within the last `window` questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` from the underlying backend.
    fn is_recently_missed(&self, signature: &QuestionSignature, window: u64) -> Result<bool, StorageError> {
        let Some(entry) = self.get(signature)? else {
            return Ok(false);
        };
        let counter = self.counter()?;
        Ok(entry.is_recently_missed(counter, window))
    }
}

/// Simple in-memory session log, the default backend.
#[derive(Clone, Default)]
pub struct InMemorySessionLog {
    entries: Arc<Mutex<HashMap<QuestionSignature, SessionLogEntry>>>,
    counter: Arc<Mutex<u64>>,
}

impl InMemorySessionLog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            counter: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of distinct signatures seen.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.len())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

impl SessionLogRepository for InMemorySessionLog {
    fn get(&self, signature: &QuestionSignature) -> Result<Option<SessionLogEntry>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(signature).copied())
    }

    fn upsert(&self, signature: &QuestionSignature, entry: SessionLogEntry) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(signature.clone(), entry);
        Ok(())
    }

    fn counter(&self) -> Result<u64, StorageError> {
        let guard = self
            .counter
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(*guard)
    }

    fn advance_counter(&self) -> Result<u64, StorageError> {
        let mut guard = self
            .counter
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = guard.saturating_add(1);
        Ok(*guard)
    }
}
