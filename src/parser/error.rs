//! Error types for selection parsing.

use thiserror::Error;

/// Errors raised while parsing or resolving a numbered selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Nothing was entered.
    #[error("empty selection\n  Suggestion: enter a number, a list such as '1 4 5', or a range such as '4-6'")]
    Empty,

    /// A token is not a positive number or a `start-end` range.
    #[error("invalid selection '{token}'\n  Suggestion: numbers start at 1; ranges are written 'start-end'")]
    Malformed {
        /// The offending token.
        token: String,
    },

    /// A range ends before it starts.
    #[error("invalid range {start}-{end}: end is before start")]
    ReversedRange {
        /// First number of the range.
        start: usize,
        /// Last number of the range.
        end: usize,
    },

    /// An index does not exist in the list it was applied to.
    #[error("selection {index} is out of range (1-{max})")]
    OutOfRange {
        /// The requested 1-based index.
        index: usize,
        /// Largest valid index.
        max: usize,
    },
}

impl SelectionError {
    /// Creates a `Malformed` error for a token.
    #[must_use]
    pub fn malformed(token: &str) -> Self {
        Self::Malformed {
            token: token.to_string(),
        }
    }
}
