//! Completion of token bridge transfers on EVM chains through the GMP
//! precompile.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub use self::{completer::*, config::*};

mod completer;

mod config;
