pub use outcome::*;
pub use token_bridge::*;
pub use transfer::*;
pub use vaa::*;

mod outcome;
mod token_bridge;
mod transfer;
mod vaa;
