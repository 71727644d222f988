//! Validated primitives shared across the pathway simulator crates.
//!
//! Every type in here guarantees its invariant once constructed, so the engine can rely on
//! them without re-checking:
//! - [`NonEmptyText`]: trimmed, never empty.
//! - [`PatientId`]: key of a pathway's persons map (or an MRN).
//! - [`Percentage`]: pathway selection weight with bounded decimal precision.
//! - [`duration`]: signed duration literals such as `"90m"`, `"-3h"` or `"1h30m"`.

pub mod duration;
mod patient_id;
mod percentage;
mod text;

pub use patient_id::PatientId;
pub use percentage::{Percentage, MAX_SIGNIFICANT_DIGITS};
pub use text::NonEmptyText;

/// Errors that can occur when creating validated primitive types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypesError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    EmptyText,

    /// A duration literal could not be parsed.
    #[error("invalid duration {input:?}: {reason}")]
    InvalidDuration { input: String, reason: String },

    /// A percentage was negative or not a finite number.
    #[error("invalid percentage: {0}")]
    InvalidPercentage(String),
}

/// Result type for primitive type construction.
pub type TypesResult<T> = Result<T, TypesError>;
