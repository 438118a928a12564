//! Public extension contracts for the resources tokens are issued for.
//!
//! The crate ships no concrete adapters; hosts implement [`DownstreamResource`] over
//! their own database or HTTP clients.

pub mod downstream;

pub use downstream::*;
