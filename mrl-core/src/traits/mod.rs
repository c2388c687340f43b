pub use completer::*;
pub use encode::*;
pub use fetcher::*;

mod completer;
mod encode;
mod fetcher;
