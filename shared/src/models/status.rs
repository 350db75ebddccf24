//! Order status state machine
//!
//! Fulfillment moves strictly forward along
//! `pending → preparing → ready → completed`; `cancelled` is reachable from
//! `pending` or `preparing` only. `completed` and `cancelled` are terminal.
//! A rejected transition never mutates stored state; callers surface the
//! error and leave the order as-is.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fulfillment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

/// Rejected status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The order already reached a terminal state.
    #[error("order is {from} and can no longer change status")]
    Terminal { from: OrderStatus },

    /// The requested edge is not in the transition graph.
    #[error("invalid status transition: {from} -> {to}")]
    Invalid { from: OrderStatus, to: OrderStatus },
}

impl OrderStatus {
    /// Wire representation, matching the serde value
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// True for `completed` and `cancelled`
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Whether `self → next` is an edge of the transition graph.
    ///
    /// Forward moves are adjacent-only: skipping a stage (e.g.
    /// `pending → ready`) is rejected just like moving backwards.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Preparing)
                | (Preparing, Ready)
                | (Ready, Completed)
                | (Pending, Cancelled)
                | (Preparing, Cancelled)
        )
    }

    /// Validate `self → next`, distinguishing terminal-state violations
    /// from plain out-of-graph requests.
    pub fn validate_transition(&self, next: OrderStatus) -> Result<(), TransitionError> {
        if self.can_transition_to(next) {
            return Ok(());
        }
        if self.is_terminal() {
            Err(TransitionError::Terminal { from: *self })
        } else {
            Err(TransitionError::Invalid {
                from: *self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
