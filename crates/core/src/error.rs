//! Error types for venue planning.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the caller-side validation helpers.
///
/// The solvers themselves never fail on infeasible input; infeasibility is
/// reported through energies and feasibility flags instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The room boundary is malformed.
    #[error("invalid room: {0}")]
    InvalidRoom(String),

    /// A furniture item has non-positive dimensions or similar defects.
    #[error("invalid furniture item {index}: {reason}")]
    InvalidFurniture {
        /// Position of the offending item.
        index: usize,
        /// Description of the defect.
        reason: String,
    },

    /// Event, room or timeslot data is inconsistent.
    #[error("invalid schedule input: {0}")]
    InvalidSchedule(String),

    /// A buffer length does not match the expected length.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// A solver configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}
