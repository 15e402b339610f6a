use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the request core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The input is not a `0x`-prefixed hex string at all.
    #[error("This method only supports 0x-prefixed hex strings but input was: {0}")]
    InvalidAddress(String),

    /// The input is hex but does not encode 20 bytes.
    #[error("invalid address {input}: expected 40 hex characters, got {hex_len}")]
    MalformedAddress { input: String, hex_len: usize },

    #[error(transparent)]
    MissingParam(#[from] MissingParam),

    #[error("typed data schema violation at `{field}`: {reason}")]
    SchemaViolation { field: String, reason: String },

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("request {0} not found")]
    RequestNotFound(u64),

    #[error("request {0} is not the active confirmation")]
    RequestNotActive(u64),

    #[error("network error: {0}")]
    Network(String),

    #[error("signer error: {0}")]
    Signer(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("window error: {0}")]
    Window(String),
}

impl Error {
    pub(crate) fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::SchemaViolation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// A required argument was empty or absent.
///
/// Each parameter has exactly one sentinel so callers match on the value
/// rather than on the rendered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum MissingParam {
    #[error("token address parameter not present")]
    TokenAddress,

    #[error("search parameter not present")]
    Search,

    #[error("token parameter not present")]
    Token,
}

/// The only error vocabulary exposed to a dapp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderError {
    #[error("INVALID_PARAMS")]
    InvalidParams,

    #[error("RESOURCE_UNAVAILABLE")]
    ResourceUnavailable,

    #[error("TRANSACTION_REJECTED")]
    TransactionRejected,

    #[error("UNAUTHORIZED")]
    Unauthorized,

    #[error("UNSUPPORTED_METHOD")]
    UnsupportedMethod,

    #[error("USER_REJECTED_REQUEST")]
    UserRejectedRequest,
}

impl ProviderError {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderError::InvalidParams => "INVALID_PARAMS",
            ProviderError::ResourceUnavailable => "RESOURCE_UNAVAILABLE",
            ProviderError::TransactionRejected => "TRANSACTION_REJECTED",
            ProviderError::Unauthorized => "UNAUTHORIZED",
            ProviderError::UnsupportedMethod => "UNSUPPORTED_METHOD",
            ProviderError::UserRejectedRequest => "USER_REJECTED_REQUEST",
        }
    }
}

impl From<&Error> for ProviderError {
    fn from(err: &Error) -> Self {
        match err {
            Error::InvalidAddress(_)
            | Error::MalformedAddress { .. }
            | Error::MissingParam(_)
            | Error::SchemaViolation { .. }
            | Error::InvalidParams(_) => ProviderError::InvalidParams,
            Error::Unauthorized(_) => ProviderError::Unauthorized,
            Error::UnsupportedMethod(_) => ProviderError::UnsupportedMethod,
            Error::RequestNotFound(_)
            | Error::RequestNotActive(_)
            | Error::Network(_)
            | Error::Signer(_)
            | Error::Store(_)
            | Error::Window(_) => ProviderError::ResourceUnavailable,
        }
    }
}

impl From<Error> for ProviderError {
    fn from(err: Error) -> Self {
        ProviderError::from(&err)
    }
}
