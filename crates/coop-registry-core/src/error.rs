//! Closed failure taxonomy surfaced to callers, and the classifier that maps
//! port failures into it.

use thiserror::Error;

use crate::codec::CodecError;
use crate::domain::{ActionError, ParseError, TxId};
use crate::plutus::PlutusError;
use crate::ports::PortError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),
    #[error("insufficient funds: {reason} (required {required} lovelace, available {available})")]
    InsufficientFunds {
        reason: String,
        required: u64,
        available: u64,
    },
    #[error("encoding error: {0}")]
    Encoding(String),
    #[error("submission outcome ambiguous: {0}")]
    SubmissionAmbiguous(String),
    #[error("submission rejected by ledger: {0}")]
    SubmissionRejected(String),
    #[error("signing declined: {0}")]
    UserDeclined(String),
    #[error("confirmation not observed for {0} within the bound")]
    TimedOut(TxId),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid action: {0}")]
    InvalidAction(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CapabilityUnavailable,
    InsufficientFunds,
    EncodingError,
    SubmissionAmbiguous,
    SubmissionRejected,
    UserDeclined,
    TimedOut,
    NetworkError,
    InvalidAction,
    Configuration,
}

impl ErrorKind {
    /// Only transient kinds may be retried without re-deriving inputs.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::NetworkError | ErrorKind::TimedOut)
    }
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::CapabilityUnavailable(_) => ErrorKind::CapabilityUnavailable,
            RegistryError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            RegistryError::Encoding(_) => ErrorKind::EncodingError,
            RegistryError::SubmissionAmbiguous(_) => ErrorKind::SubmissionAmbiguous,
            RegistryError::SubmissionRejected(_) => ErrorKind::SubmissionRejected,
            RegistryError::UserDeclined(_) => ErrorKind::UserDeclined,
            RegistryError::TimedOut(_) => ErrorKind::TimedOut,
            RegistryError::Network(_) => ErrorKind::NetworkError,
            RegistryError::InvalidAction(_) => ErrorKind::InvalidAction,
            RegistryError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<CodecError> for RegistryError {
    fn from(e: CodecError) -> Self {
        RegistryError::Encoding(e.to_string())
    }
}

impl From<PlutusError> for RegistryError {
    fn from(e: PlutusError) -> Self {
        RegistryError::Encoding(e.to_string())
    }
}

impl From<ActionError> for RegistryError {
    fn from(e: ActionError) -> Self {
        RegistryError::InvalidAction(e.to_string())
    }
}

impl From<ParseError> for RegistryError {
    fn from(e: ParseError) -> Self {
        RegistryError::Configuration(e.to_string())
    }
}

/// Where a port failure happened; the same raw failure means different
/// things before and after bytes reach the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Wallet or ledger reads (balances, UTxOs, addresses, parameters).
    Read,
    Sign,
    Submit,
    /// Confirmation polling.
    Query,
}

pub fn classify(phase: Phase, err: PortError) -> RegistryError {
    match (phase, err) {
        (_, PortError::Unsupported(op)) => {
            RegistryError::CapabilityUnavailable(format!("{op} is not supported by the provider"))
        }
        (_, PortError::Declined(m)) => RegistryError::UserDeclined(m),
        (Phase::Submit, PortError::Timeout(m)) => {
            RegistryError::SubmissionAmbiguous(format!("submission timed out: {m}"))
        }
        (_, PortError::Timeout(m)) => RegistryError::Network(format!("timed out: {m}")),
        (_, PortError::Transport(m)) => RegistryError::Network(m),
        (Phase::Submit, PortError::Rejected(m)) => RegistryError::SubmissionRejected(m),
        (_, PortError::Rejected(m)) => RegistryError::CapabilityUnavailable(m),
        (_, PortError::Ambiguous(m)) => RegistryError::SubmissionAmbiguous(m),
        (_, PortError::Validation(m)) => {
            RegistryError::Encoding(format!("malformed provider data: {m}"))
        }
        (Phase::Query, PortError::NotFound(m)) => RegistryError::Network(m),
        (_, PortError::NotFound(m)) => RegistryError::CapabilityUnavailable(m),
        (_, PortError::Policy(m)) => RegistryError::Configuration(m),
    }
}
