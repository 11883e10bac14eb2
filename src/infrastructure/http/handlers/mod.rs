//! HTTP Handlers

mod generate;
mod ping;
mod progress;
mod transformations;

pub use generate::*;
pub use ping::*;
pub use progress::*;
pub use transformations::*;
