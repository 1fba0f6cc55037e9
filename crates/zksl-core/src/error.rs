use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid 32-byte hex digest")]
    InvalidHexDigest,

    #[error("invalid slot range: start {start} > end {end}")]
    InvalidSlotRange { start: u64, end: u64 },

    #[error("slot window of {got} exceeds the {max}-slot maximum")]
    WindowTooWide { got: u64, max: u64 },

    #[error("artifact of {got} bytes exceeds the {max}-byte maximum")]
    ArtifactTooLarge { got: usize, max: usize },

    #[error("malformed keypair file: {0}")]
    MalformedKeypair(&'static str),

    #[error("aggregator key mismatch: allowed {allowed}, loaded {loaded}")]
    AggregatorKeyMismatch { allowed: String, loaded: String },

    #[error("malformed {kind} account data")]
    MalformedAccount { kind: &'static str },

    #[error("canonical encoding failed")]
    CanonicalEncoding,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
