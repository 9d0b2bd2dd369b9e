//! Conversation turns and the per-call turn sequence.
//!
//! A [`Conversation`] always starts with exactly one seed pair: the
//! instruction turn followed by the assistant greeting. After the seed,
//! caller and assistant turns strictly alternate, starting with the caller.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The fixed instruction that opens every conversation.
    System,
    /// The person on the phone.
    Caller,
    /// The AI assistant.
    Assistant,
}

impl Role {
    /// Returns the string label for this role.
    pub fn label(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Caller => "caller",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One utterance attributed to a single role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn caller(content: impl Into<String>) -> Self {
        Self {
            role: Role::Caller,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The seed pair every call starts from.
///
/// Produced by the knowledge-base loader before any call is accepted and
/// shared read-only between calls; each call builds its own
/// [`Conversation`] from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSeed {
    /// Instruction turn (persona, menu, FAQ).
    pub instruction: String,
    /// First thing the caller hears.
    pub greeting: String,
}

impl CallSeed {
    pub fn new(instruction: impl Into<String>, greeting: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            greeting: greeting.into(),
        }
    }
}

impl Default for CallSeed {
    fn default() -> Self {
        Self::new(crate::DEFAULT_INSTRUCTION, crate::DEFAULT_GREETING)
    }
}

/// Errors raised when a turn would break the sequence ordering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    /// The appended turn does not alternate with the previous one.
    #[error("expected a {expected} turn, got a {actual} turn")]
    OutOfOrder { expected: Role, actual: Role },

    /// There is no trailing caller turn to remove.
    #[error("no pending caller turn to retract")]
    NothingToRetract,
}

/// Ordered turn sequence for one call.
///
/// Owned by exactly one dialogue stage; never shared between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

/// Number of turns in the seed pair.
const SEED_LEN: usize = 2;

impl Conversation {
    /// Starts a conversation from the seed pair.
    pub fn seeded(seed: &CallSeed) -> Self {
        Self {
            turns: vec![
                ConversationTurn::system(seed.instruction.clone()),
                ConversationTurn::assistant(seed.greeting.clone()),
            ],
        }
    }

    /// All turns in order, seed included.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// The greeting from the seed pair.
    pub fn greeting(&self) -> &str {
        &self.turns[1].content
    }

    /// Turns appended after the seed pair.
    pub fn exchanged(&self) -> &[ConversationTurn] {
        &self.turns[SEED_LEN..]
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always false: the seed pair is never removed.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The role the next appended turn must have.
    pub fn expected_role(&self) -> Role {
        match self.turns.last().map(|turn| turn.role) {
            Some(Role::Caller) => Role::Assistant,
            _ => Role::Caller,
        }
    }

    pub fn push_caller(&mut self, content: impl Into<String>) -> Result<(), ConversationError> {
        self.push(ConversationTurn::caller(content))
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) -> Result<(), ConversationError> {
        self.push(ConversationTurn::assistant(content))
    }

    /// Removes the trailing caller turn whose reply could not be produced.
    pub fn retract_caller(&mut self) -> Result<ConversationTurn, ConversationError> {
        match self.turns.last() {
            Some(turn) if turn.role == Role::Caller && self.turns.len() > SEED_LEN => {
                self.turns.pop().ok_or(ConversationError::NothingToRetract)
            }
            _ => Err(ConversationError::NothingToRetract),
        }
    }

    fn push(&mut self, turn: ConversationTurn) -> Result<(), ConversationError> {
        let expected = self.expected_role();
        if turn.role != expected {
            return Err(ConversationError::OutOfOrder {
                expected,
                actual: turn.role,
            });
        }
        self.turns.push(turn);
        Ok(())
    }
}
