//! # xmlschema-template
//!
//! Mines "Venetian Blind" XML Schemas (global named types, elements that
//! reference types by name) into a namespace-partitioned definition
//! registry, and expands the root element into a template document holding
//! one example of every element and attribute the schema allows.
//!
//! ## Features
//!
//! - Multi-file schemas with `include` (including chameleon includes) and `import`
//! - Extension flattening, permissive restriction, substitution groups
//! - Cycle analysis of the type graph with a bounded recursion guard
//! - Path-addressed schema facts (cardinality, compositors, derivation)
//! - Minimal documents and fresh elements cut from the template
//! - Sequence-ordered insertion into live instance documents
//!
//! ## Example
//!
//! ```rust,ignore
//! use xmlschema_template::{DocMap, SchemaHelper};
//! use xmlschema_template::documents::Document;
//!
//! let helper = SchemaHelper::new("path/to/catalog.xsd", Some("catalog"))?;
//! assert!(helper.is_repeating_element("/catalog/tag"));
//!
//! let mut doc = helper.minimal_document();
//! let mut map = DocMap::with_helper(&mut doc, &helper);
//! map.put("/catalog/tag[1]", "rust")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;
pub mod settings;

// Names, namespaces and locations
pub mod names;
pub mod namespaces;
pub mod locations;

// Resource loading and documents
pub mod loaders;
pub mod documents;
pub mod paths;

// Schema model and mining
pub mod definitions;
pub mod reader;
pub mod cycles;
pub mod miner;

// Template expansion and queries
pub mod nodes;
pub mod walker;
pub mod datatypes;
pub mod helper;
pub mod mutation;

// Re-exports for convenience
pub use error::{Error, Result};
pub use helper::SchemaHelper;
pub use miner::{DefinitionMiner, MinedSchema};
pub use mutation::DocMap;
pub use settings::{RequiredContentPolicy, Settings};
pub use walker::{StructureWalker, Template};

/// Version of the xmlschema-template library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XSD namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XML Schema instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

