//! Session Transcript
//!
//! The ordered, append-only log of conversation turns for one CLI process.
//! Every remote call receives the full transcript as context. Nothing here
//! touches disk; the transcript dies with the process.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::types::{Turn, TurnContent};

/// The aggregate owning the turn sequence. Turns can be appended and read,
/// never removed or mutated.
pub struct Session {
    id: String,
    started_at: String,
    turns: Vec<Turn>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at: Utc::now().to_rfc3339(),
            turns: Vec::new(),
        }
    }

    /// Session id for log correlation.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> &str {
        &self.started_at
    }

    /// Append one turn at the end of the sequence, assigning the next
    /// ordering index. Pure in-memory append; cannot fail.
    pub fn append(&mut self, content: TurnContent) -> u64 {
        let index = self.turns.len() as u64;
        let turn = Turn {
            index,
            at: Utc::now().to_rfc3339(),
            content,
        };
        debug!(session = %self.id, index, role = turn.role(), "transcript append");
        self.turns.push(turn);
        index
    }

    /// The full ordered sequence, for inclusion in the next outgoing request.
    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
