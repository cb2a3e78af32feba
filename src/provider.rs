//! Provider-facing endpoints (data) and strategies (behavior).
//!
//! `endpoints` derives the hosted login, token, and logout URLs from a domain prefix and region
//! (or an explicit base URL) and enforces HTTPS outside loopback hosts. `strategy` defines
//! [`ProviderStrategy`], an HTTP-client-agnostic hook used by the exchange client to decorate the
//! token request form and classify rejections.

pub mod endpoints;
pub mod strategy;

pub use endpoints::*;
pub use strategy::*;
