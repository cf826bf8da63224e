//! Galactic REST client
//!
//! A thin `reqwest` wrapper for JSON APIs: base-URL resolution, bearer or
//! basic credentials, opt-in retry of throttled idempotent requests, and
//! status errors that keep the response body.

pub mod client;
pub mod error;

pub use client::{Credentials, RestClient, RestClientBuilder, TokenProvider};
pub use error::{RestError, Result};
