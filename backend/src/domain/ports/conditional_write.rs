//! Outcome of a store write that only applies while a precondition holds.

/// Result of a conditional write.
///
/// Adapters decide between the three outcomes from the number of rows the
/// write itself changed. A follow-up existence check may only distinguish
/// [`ConditionalWrite::PreconditionFailed`] from [`ConditionalWrite::Missing`];
/// it never feeds another write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalWrite<T> {
    /// Exactly one row matched the precondition and was changed.
    Applied(T),
    /// The row exists but the precondition no longer held.
    PreconditionFailed,
    /// No row exists for the key.
    Missing,
}

impl<T> ConditionalWrite<T> {
    /// Whether the write changed a row.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// Map the applied value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ConditionalWrite<U> {
        match self {
            Self::Applied(value) => ConditionalWrite::Applied(f(value)),
            Self::PreconditionFailed => ConditionalWrite::PreconditionFailed,
            Self::Missing => ConditionalWrite::Missing,
        }
    }
}
