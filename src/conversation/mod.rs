// Conversation module
// Dialogue turns kept within a cost budget, and per-session buffers

pub mod store;


use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embeddings::estimate_token_count;

pub use store::ConversationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        })
    }
}

/// One message of a dialogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
    approximate_token_cost: usize,
}

impl Turn {
    /// Create a turn whose cost is estimated from its content
    #[inline]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            role,
            approximate_token_cost: estimate_token_count(&content),
            content,
        }
    }

    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Override the estimated cost
    #[inline]
    #[must_use]
    pub fn with_cost(mut self, cost: usize) -> Self {
        self.approximate_token_cost = cost;
        self
    }

    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[inline]
    pub fn cost(&self) -> usize {
        self.approximate_token_cost
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferState {
    #[default]
    Empty,
    Accumulating,
    /// The last append pushed the total over the retention budget
    Trimmed,
}

/// Settings for conversation buffers and the session store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Retention budget; stored turns are compacted once it is exceeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cost: Option<usize>,
    /// Keep the first system turn through every trim
    pub include_system: bool,
    /// Sessions kept before the least recently used one is dropped
    pub max_sessions: usize,
    /// Sessions untouched for this long are dropped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_ttl_secs: Option<u64>,
}

impl Default for ConversationConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_cost: None,
            include_system: true,
            max_sessions: 100,
            idle_ttl_secs: Some(3600),
        }
    }
}

/// Ordered dialogue turns of one session.
///
/// The anchor is the first `system` turn. With `include_system` set it
/// survives every trim and its cost counts against the budget.
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    turns: Vec<Turn>,
    state: BufferState,
    include_system: bool,
    max_cost: Option<usize>,
}

impl Default for ConversationBuffer {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationBuffer {
    /// Unbounded buffer that keeps its system turn
    #[inline]
    pub fn new() -> Self {
        Self {
            turns: Vec::new(),
            state: BufferState::Empty,
            include_system: true,
            max_cost: None,
        }
    }

    #[inline]
    pub fn with_config(config: &ConversationConfig) -> Self {
        Self {
            include_system: config.include_system,
            max_cost: config.max_cost,
            ..Self::new()
        }
    }

    /// Add a turn, compacting stored turns if the retention budget is exceeded
    #[inline]
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);

        match self.max_cost {
            Some(max_cost) if self.total_cost() > max_cost => {
                let before = self.turns.len();
                self.turns = self.trimmed_view(max_cost);
                self.state = BufferState::Trimmed;
                debug!(
                    "Trimmed conversation from {} to {} turns (budget {})",
                    before,
                    self.turns.len(),
                    max_cost
                );
            }
            _ => self.state = BufferState::Accumulating,
        }
    }

    /// The longest suffix of turns that fits in `max_cost`, plus the anchor.
    ///
    /// Turns are never split. When not even the latest turn fits, it is
    /// returned on its own with the anchor.
    #[inline]
    pub fn trimmed_view(&self, max_cost: usize) -> Vec<Turn> {
        let anchor = self.anchor_index();
        let budget = max_cost.saturating_sub(anchor.map_or(0, |i| self.turns[i].cost()));

        let mut kept = Vec::new();
        let mut spent = 0;
        for (i, turn) in self.turns.iter().enumerate().rev() {
            if Some(i) == anchor {
                continue;
            }
            if spent + turn.cost() > budget {
                if kept.is_empty() {
                    kept.push(i);
                }
                break;
            }
            spent += turn.cost();
            kept.push(i);
        }

        kept.extend(anchor);
        kept.sort_unstable();
        kept.into_iter().map(|i| self.turns[i].clone()).collect()
    }

    #[inline]
    pub fn total_cost(&self) -> usize {
        self.turns.iter().map(Turn::cost).sum()
    }

    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[inline]
    pub fn state(&self) -> BufferState {
        self.state
    }

    #[inline]
    pub fn clear(&mut self) {
        self.turns.clear();
        self.state = BufferState::Empty;
    }

    fn anchor_index(&self) -> Option<usize> {
        if !self.include_system {
            return None;
        }
        self.turns.iter().position(|t| t.role == Role::System)
    }
}
