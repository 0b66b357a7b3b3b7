//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the use-case layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `QuoteProvider`: one source of fresh numeric quotes

pub mod quote_provider;

pub use quote_provider::{FetchError, QuoteProvider};
