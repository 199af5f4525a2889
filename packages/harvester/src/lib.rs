//! CSW Harvester - Page through OGC catalogue services and fetch ISO metadata.
//!
//! This crate lists record identifiers from a Catalogue Service for the Web
//! (CSW 2.0.2) endpoint, page by page and only as fast as the caller
//! consumes them, and fetches full ISO 19139 records by identifier.
//!
//! # Example
//!
//! ```
//! use csw_harvester::filter::{translate, FilterExpression};
//! use csw_harvester::config;
//!
//! assert!(config::validate_page_size(10).is_ok());
//!
//! // Several configured filters are alternatives
//! let filter = translate(&[
//!     "PropertyIsEqualTo('dc:type', 'dataset')",
//!     "PropertyIsLike('dc:title', '%eau%')",
//! ])
//! .unwrap();
//! assert!(matches!(filter, Some(FilterExpression::Or(_))));
//! ```
//!
//! # Architecture
//!
//! - [`namespaces`]: XML namespace prefix registry
//! - [`filter`]: filter specification parser and OGC filter tree
//! - [`protocol`]: request builders and response parsers (CSW 2.0.2)
//! - [`pagination`]: lazy identifier listing
//! - [`record`]: ISO 19139 record model
//! - [`http`]: transport
//! - [`client`]: catalogue client tying it together
//! - [`config`]: constants, validation, source configuration
//! - [`error`]: error types and Result alias
//! - [`xml`]: XML utilities
//! - [`cli`]: command-line interface

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod namespaces;
pub mod pagination;
pub mod protocol;
pub mod record;
pub mod xml;

pub use client::CatalogClient;
pub use config::{validate_endpoint_url, validate_page_size, SourceConfig};
pub use error::{ErrorKind, HarvesterError, Result};
pub use filter::{translate, FilterExpression};
pub use pagination::RecordIds;
pub use protocol::{CatalogProtocol, Csw202, SearchPage};
pub use record::Record;
