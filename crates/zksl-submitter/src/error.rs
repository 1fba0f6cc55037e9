//! The public error taxonomy of the submitter. Every handler failure maps
//! into exactly one of these kinds and one HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use zksl_core::CoreError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("POST requires an Idempotency-Key header")]
    MissingIdempotencyKey,

    #[error("not found")]
    NotFound,

    #[error("chain id mismatch: configured {local}, on-chain {onchain}")]
    ChainIdMismatch { local: u64, onchain: u64 },

    #[error("local aggregator key is not allowed for this sequence")]
    AggregatorKeyMismatch,

    #[error("configuration record not found on ledger")]
    ConfigNotFound,

    #[error("failed to read aggregator state")]
    FetchLastSeqFailed,

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("authentication required")]
    AuthRequired,

    #[error("forbidden")]
    Forbidden,

    #[error("verifier rejected submission: {0}")]
    Verifier(VerifierError),

    #[error("anchor submission failed: {0}")]
    AnchorSubmitFailed(String),

    #[error("path outside the allow-listed root")]
    PathNotAllowed,
}

/// Verifier program rejections that surface with a dedicated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierError {
    BadEd25519Order,
    BadDomainSeparation,
    NonMonotonicSeq,
    RangeOverlap,
    ClockSkew,
    AggregatorMismatch,
    InvalidMint,
    Paused,
}

impl VerifierError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadEd25519Order => "BadEd25519Order",
            Self::BadDomainSeparation => "BadDomainSeparation",
            Self::NonMonotonicSeq => "NonMonotonicSeq",
            Self::RangeOverlap => "RangeOverlap",
            Self::ClockSkew => "ClockSkew",
            Self::AggregatorMismatch => "AggregatorMismatch",
            Self::InvalidMint => "InvalidMint",
            Self::Paused => "Paused",
        }
    }

    const fn custom_code(self) -> u32 {
        match self {
            Self::InvalidMint => 6000,
            Self::AggregatorMismatch => 6006,
            Self::Paused => 6010,
            Self::NonMonotonicSeq => 6012,
            Self::RangeOverlap => 6013,
            Self::ClockSkew => 6014,
            Self::BadEd25519Order => 6015,
            Self::BadDomainSeparation => 6016,
        }
    }
}

impl std::fmt::Display for VerifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const VERIFIER_ERRORS: [VerifierError; 8] = [
    VerifierError::BadEd25519Order,
    VerifierError::BadDomainSeparation,
    VerifierError::NonMonotonicSeq,
    VerifierError::RangeOverlap,
    VerifierError::ClockSkew,
    VerifierError::AggregatorMismatch,
    VerifierError::InvalidMint,
    VerifierError::Paused,
];

/// Map a ledger submission failure to the taxonomy: first by the verifier's
/// numeric custom code, then by error-name substring, else the catch-all.
pub fn map_verifier_error(custom_code: Option<u32>, message: &str) -> ApiError {
    if let Some(code) = custom_code {
        if let Some(err) = VERIFIER_ERRORS.iter().find(|e| e.custom_code() == code) {
            return ApiError::Verifier(*err);
        }
    }
    if let Some(err) = VERIFIER_ERRORS.iter().find(|e| message.contains(e.as_str())) {
        return ApiError::Verifier(*err);
    }
    ApiError::AnchorSubmitFailed(message.to_string())
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_)
            | Self::MissingIdempotencyKey
            | Self::ChainIdMismatch { .. }
            | Self::AggregatorKeyMismatch
            | Self::ConfigNotFound => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AuthRequired => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::Verifier(VerifierError::Paused) => StatusCode::FORBIDDEN,
            Self::Verifier(_) => StatusCode::BAD_REQUEST,
            Self::FetchLastSeqFailed | Self::AnchorSubmitFailed(_) | Self::PathNotAllowed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BadRequest",
            Self::MissingIdempotencyKey => "MissingIdempotencyKey",
            Self::NotFound => "NotFound",
            Self::ChainIdMismatch { .. } => "ChainIdMismatch",
            Self::AggregatorKeyMismatch => "AggregatorKeyMismatch",
            Self::ConfigNotFound => "ConfigNotFound",
            Self::FetchLastSeqFailed => "FetchLastSeqFailed",
            Self::RateLimitExceeded => "RateLimitExceeded",
            Self::AuthRequired => "AuthRequired",
            Self::Forbidden => "Forbidden",
            Self::Verifier(err) => err.as_str(),
            Self::AnchorSubmitFailed(_) => "AnchorSubmitFailed",
            Self::PathNotAllowed => "PathNotAllowed",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AggregatorKeyMismatch { .. } => Self::AggregatorKeyMismatch,
            CoreError::InvalidHexDigest
            | CoreError::InvalidSlotRange { .. }
            | CoreError::WindowTooWide { .. }
            | CoreError::ArtifactTooLarge { .. } => Self::BadRequest(err.to_string()),
            other => Self::AnchorSubmitFailed(other.to_string()),
        }
    }
}

impl From<zksl_store::StoreError> for ApiError {
    fn from(err: zksl_store::StoreError) -> Self {
        Self::AnchorSubmitFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_codes_map_to_taxonomy() {
        for (code, expected) in [
            (6015, VerifierError::BadEd25519Order),
            (6016, VerifierError::BadDomainSeparation),
            (6012, VerifierError::NonMonotonicSeq),
            (6013, VerifierError::RangeOverlap),
            (6014, VerifierError::ClockSkew),
            (6006, VerifierError::AggregatorMismatch),
            (6000, VerifierError::InvalidMint),
            (6010, VerifierError::Paused),
        ] {
            match map_verifier_error(Some(code), "unrelated text") {
                ApiError::Verifier(got) => assert_eq!(got, expected),
                other => panic!("code {code} mapped to {other:?}"),
            }
        }
    }

    #[test]
    fn name_substrings_map_to_taxonomy() {
        match map_verifier_error(None, "custom program error: NonMonotonicSeq") {
            ApiError::Verifier(VerifierError::NonMonotonicSeq) => {}
            other => panic!("mapped to {other:?}"),
        }
    }

    #[test]
    fn unknown_failures_are_anchor_submit_failed() {
        let err = map_verifier_error(Some(6001), "InvalidLockAmount");
        assert!(matches!(err, ApiError::AnchorSubmitFailed(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn paused_is_forbidden_other_verifier_errors_bad_request() {
        assert_eq!(
            ApiError::Verifier(VerifierError::Paused).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Verifier(VerifierError::RangeOverlap).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn http_statuses_follow_the_table() {
        assert_eq!(ApiError::RateLimitExceeded.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::AuthRequired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::ChainIdMismatch { local: 2, onchain: 1 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::PathNotAllowed.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
