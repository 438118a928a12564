//! Identity-provider metadata (descriptors) and error classification (strategies).
//!
//! `descriptor` holds validated, HTTPS-only endpoint data, the grants the provider
//! enables, the preferred client authentication method and a few quirks.
//! `strategy` defines [`ProviderStrategy`], the hook the confidential client uses to
//! decorate token requests and to map provider errors onto [`Error`](crate::error::Error).

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
