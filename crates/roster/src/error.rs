use thiserror::Error;

/// Wire-format decode failure for the row and feed string encodings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid bit character {found:?} at position {pos}")]
    InvalidBit { found: char, pos: usize },
    #[error("expected {expected} award tracks, found {found}")]
    TrackCount { expected: usize, found: usize },
    #[error("malformed credit entry {entry:?}")]
    CreditEntry { entry: String },
}

/// Failures surfaced by the remote side.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Network failure or a non-success status.
    #[error("remote unavailable: {0}")]
    Unavailable(String),
    /// The page came back but its expected structure is missing.  Distinct
    /// from plain unavailability: it means the remote format changed.
    #[error("remote structure changed: {0}")]
    Structure(String),
}

/// Failures surfaced by the row store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// A stored value failed to deserialize at all.
    #[error("corrupt store value for {alias:?}: {reason}")]
    Corrupt { alias: String, reason: String },
    /// The value deserialized but one of its wire-encoded fields did not.
    #[error("malformed row for {alias:?}: {source}")]
    MalformedRow {
        alias: String,
        #[source]
        source: CodecError,
    },
}

/// Umbrella error for member resolution and reconciliation.
///
/// Everything here propagates uncaught to the cycle caller; the engine does
/// no local retry and no partial-success bookkeeping beyond write-backs that
/// already committed.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error(transparent)]
    Remote(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A fetch completed but the attribute it was supposed to resolve is
    /// still unset.  Programming-contract violation, not a transport failure.
    #[error("attribute {attribute} still unset after fetch")]
    Unresolved { attribute: &'static str },
    /// Neither an alias nor a linked id is known.
    #[error("member has neither an alias nor a linked id")]
    MissingIdentity,
    /// The row never appeared after repeated fetch-insert-reread rounds.
    #[error("bootstrap for {alias:?} gave up after {attempts} attempts")]
    BootstrapFailed { alias: String, attempts: u32 },
}
