//! selstore-swift: Swift HTTP adapter for selstore
//!
//! Implements the transport and authentication seams of selstore-core
//! with reqwest. It is the only crate that depends on an HTTP client.

pub mod auth;
pub mod client;
pub mod transport;

pub use auth::CredentialsAuthenticator;
pub use client::{connect, container};
pub use transport::ReqwestTransport;
