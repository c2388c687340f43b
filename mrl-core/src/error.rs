use std::any::Any;
use std::error::Error as StdError;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;

use ethers::providers::ProviderError;

use crate::H256;

/// The result of interacting with a chain.
pub type ChainResult<T> = Result<T, ChainCommunicationError>;

/// An "Any"-typed error.
pub trait MrlCustomError: StdError + Send + Sync + Any {}

impl<E: StdError + Send + Sync + Any> MrlCustomError for E {}

/// Thin wrapper around a boxed MrlCustomError; a trait-object adaptor so that
/// arbitrary client errors can live inside [`ChainCommunicationError`].
#[repr(transparent)]
pub struct MrlCustomErrorWrapper(Box<dyn MrlCustomError>);

impl Debug for MrlCustomErrorWrapper {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", AsRef::<dyn MrlCustomError>::as_ref(&self))
    }
}

impl Display for MrlCustomErrorWrapper {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", AsRef::<dyn MrlCustomError>::as_ref(&self))
    }
}

impl StdError for MrlCustomErrorWrapper {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl AsRef<dyn MrlCustomError> for MrlCustomErrorWrapper {
    fn as_ref(&self) -> &dyn MrlCustomError {
        self.0.as_ref()
    }
}

impl Deref for MrlCustomErrorWrapper {
    type Target = Box<dyn MrlCustomError>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// ChainCommunicationError contains errors returned when attempting to
/// call a chain, dispatch a transaction or reach an attestation API.
///
/// The rendered text of these errors is what the completion queue classifies,
/// so variants keep the upstream message intact.
#[derive(Debug, thiserror::Error)]
pub enum ChainCommunicationError {
    /// Decoding of chain or attestation data failed
    #[error(transparent)]
    ProtocolError(#[from] MrlProtocolError),
    /// A contract call reverted with a decodable reason
    #[error("execution reverted: {0}")]
    Revert(String),
    /// An error with a contract call
    #[error(transparent)]
    ContractError(MrlCustomErrorWrapper),
    /// Provider Error
    #[error(transparent)]
    ProviderError(#[from] ProviderError),
    /// A transaction was dropped from the mempool
    #[error("Transaction dropped from mempool {0:?}")]
    TransactionDropped(H256),
    /// Waiting for a transaction receipt timed out
    #[error("Transaction confirmation timed out {0:?}")]
    TransactionTimeout(H256),
    /// Any other error; does not implement `From` to prevent
    /// conflicting/absorbing other errors.
    #[error(transparent)]
    Other(MrlCustomErrorWrapper),
}

impl ChainCommunicationError {
    /// Create a chain communication error from any other existing error
    pub fn from_other<E: MrlCustomError>(err: E) -> Self {
        Self::Other(MrlCustomErrorWrapper(Box::new(err)))
    }

    /// Creates a chain communication error of the other error variant from a string
    pub fn from_other_str(err: impl Into<String>) -> Self {
        Self::from_other(StringError(err.into()))
    }

    /// Creates a chain communication error of the contract error variant from any other existing
    /// error
    pub fn from_contract_error<E>(err: E) -> Self
    where
        E: MrlCustomError,
    {
        Self::ContractError(MrlCustomErrorWrapper(Box::new(err)))
    }

    /// Creates a chain communication error of the contract error variant from a string
    pub fn from_contract_error_str(err: impl Into<String>) -> Self {
        Self::from_contract_error(StringError(err.into()))
    }
}

#[derive(Debug)]
#[repr(transparent)]
struct StringError(String);

impl Display for StringError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for StringError {}

/// Errors decoding wormhole wire data
#[derive(Debug, thiserror::Error)]
pub enum MrlProtocolError {
    /// IO error from Read usage, most commonly a truncated buffer
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    /// Only version 1 VAAs are understood
    #[error("Unsupported VAA version ({0})")]
    UnsupportedVaaVersion(u8),
    /// The token bridge payload id is not one this relayer knows
    #[error("Unknown token bridge payload type ({0})")]
    UnknownPayloadType(u8),
    /// The token bridge payload is a known type that carries no transfer
    #[error("Token bridge payload type {0} is not a transfer")]
    NotATransfer(u8),
    /// A hex or numeric field could not be parsed
    #[error("Invalid field `{field}`: {reason}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },
}
