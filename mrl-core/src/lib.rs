//! Shared types and chain-facing traits for the MRL completion relayer.
//!
//! The relayer watches token bridge VAAs that are addressed to the Moonbeam
//! GMP precompile and completes them on the destination chain. This crate has
//! no opinion on how attestations are delivered or how completions are
//! sequenced; it only describes the data that flows between those parts.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub use chain::*;
pub use error::*;
pub use traits::*;
pub use types::*;

pub use ethers::types::{Address, Bytes, H160, H256, U256};

mod chain;
mod error;
mod traits;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
