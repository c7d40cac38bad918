//! Secret handling.
//!
//! Re-exported so binaries can expose the Redis URL without naming
//! `secrecy` themselves.

pub use secrecy::{ExposeSecret, SecretString};
