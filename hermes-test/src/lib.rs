//! Test support for `hermes`: JSON:API fixture documents and an in-memory transport.

pub mod fixtures;
mod transport;

pub use transport::{MockTransport, Route};

/// The base url every fixture link points at.
pub const BASE_URL: &str = "http://example.com/";
