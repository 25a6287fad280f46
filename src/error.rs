use thiserror::Error;

/// All recoverable error conditions surfaced by [`crate::BpTreeMap`].
///
/// None of these are fatal: every operation leaves the map in a valid state
/// and reports the condition to the caller as a value. Lookup misses are not
/// errors; `get` returns `None` for an absent key.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum TreeError {
    /// An insert attempted to place a key that is already present. The stored
    /// value is retained and the map is unchanged.
    #[error("attempt to insert duplicate key")]
    DuplicateKey,

    /// `first_key` or `last_key` was called on an empty map.
    #[error("key query on an empty map")]
    Empty,
}
