//! Quote Source Adapters
//!
//! Concrete `QuoteProvider` implementations over public JSON REST
//! endpoints, plus the template/field-path helpers they share.

pub mod http;
pub mod template;

pub use http::{HttpQuoteProvider, ProviderDescriptor, build_http_client};
pub use template::{FieldPath, TemplateError};
