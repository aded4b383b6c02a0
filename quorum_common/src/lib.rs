//! Primitives shared by the Quorum Payment Server crates.
mod cents;
pub mod helpers;
pub mod op;
mod secret;

pub use cents::{Cents, CentsConversionError, DEFAULT_CURRENCY};
pub use secret::Secret;
