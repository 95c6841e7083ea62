//! Error types for xmlschema-template
//!
//! This module defines all error types used throughout the library.
//! Schema mining failures are fatal and surface as a single [`Error`];
//! lookups that may legitimately miss return `Option` instead.

use std::fmt;
use thiserror::Error;

/// Result type alias using the crate Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for schema mining, template building and document mutation
#[derive(Error, Debug)]
pub enum Error {
    /// Value rejected by a datatype validator
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Malformed schema or XML document
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Two global definitions share a namespace and local name
    #[error("duplicate definition '{name}' in namespace '{namespace}' (first in {existing}, again in {new})")]
    DuplicateDefinition {
        /// Local name of the definition
        name: String,
        /// Namespace URI of the definition
        namespace: String,
        /// Location of the registered definition
        existing: String,
        /// Location of the rejected definition
        new: String,
    },

    /// A type, element, group or attribute reference names nothing
    #[error("unresolved reference '{name}' in {context}")]
    UnresolvedReference {
        /// Qualified name as written in the schema
        name: String,
        /// Where the reference was found
        context: String,
    },

    /// An include or import could not be located
    #[error("could not resolve schema location '{location}' (tried: {})", attempts.join(", "))]
    UnresolvedInclude {
        /// schemaLocation as written
        location: String,
        /// Candidate locations that were tried
        attempts: Vec<String>,
    },

    /// The root element could not be chosen
    #[error("{}", describe_root_failure(requested.as_deref(), candidates))]
    AmbiguousRootElement {
        /// Name asked for, if any
        requested: Option<String>,
        /// Candidate global elements as "name (namespace)"
        candidates: Vec<String>,
    },

    /// Derivation bases form a cycle
    #[error("derivation cycle: {}", chain.join(" -> "))]
    DerivationCycle {
        /// Types on the cycle, in order
        chain: Vec<String>,
    },

    /// Unsupported or unexpected schema component
    #[error("schema error: {0}")]
    Schema(String),

    /// Document mutation error
    #[error("mutation error: {0}")]
    Mutation(String),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// Namespace error
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

fn describe_root_failure(requested: Option<&str>, candidates: &[String]) -> String {
    match requested {
        Some(name) => format!(
            "root element '{}' not found; candidates: {}",
            name,
            candidates.join(", ")
        ),
        None => format!(
            "root element is ambiguous; candidates: {}",
            candidates.join(", ")
        ),
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

/// Datatype validation error with context
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error message
    pub message: String,
    /// Type the value was checked against
    pub type_name: Option<String>,
    /// Offending value
    pub value: Option<String>,
    /// Path of the node holding the value
    pub path: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            type_name: None,
            value: None,
            path: None,
        }
    }

    /// Set the type name
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Set the rejected value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set the node path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref type_name) = self.type_name {
            write!(f, " (type {})", type_name)?;
        }

        if let Some(ref value) = self.value {
            write!(f, "\n\nValue: {:?}", value)?;
        }

        if let Some(ref path) = self.path {
            write!(f, "\n\nPath: {}", path)?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Malformed schema or document error
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// File or URL being parsed
    pub location: Option<String>,
    /// Line number, when known
    pub line: Option<u32>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            line: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the line number
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        match (&self.location, self.line) {
            (Some(loc), Some(line)) => write!(f, "\n\nLocation: {}:{}", loc, line)?,
            (Some(loc), None) => write!(f, "\n\nLocation: {}", loc)?,
            (None, Some(line)) => write!(f, "\n\nLine: {}", line)?,
            (None, None) => {}
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("value is not a valid xs:decimal")
            .with_type("xs:decimal")
            .with_value("abc")
            .with_path("/catalog/price");

        let msg = format!("{}", err);
        assert!(msg.contains("xs:decimal"));
        assert!(msg.contains("Value:"));
        assert!(msg.contains("Path: /catalog/price"));
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("unexpected end of file")
            .with_location("catalog.xsd")
            .with_line(42);

        let msg = format!("{}", err);
        assert!(msg.contains("unexpected end of file"));
        assert!(msg.contains("catalog.xsd:42"));
    }

    #[test]
    fn test_duplicate_definition_display() {
        let err = Error::DuplicateDefinition {
            name: "itemType".to_string(),
            namespace: "urn:a".to_string(),
            existing: "a.xsd".to_string(),
            new: "b.xsd".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("itemType"));
        assert!(msg.contains("a.xsd"));
        assert!(msg.contains("b.xsd"));
    }

    #[test]
    fn test_root_failure_lists_candidates() {
        let err = Error::AmbiguousRootElement {
            requested: None,
            candidates: vec!["a (urn:x)".to_string(), "b (urn:x)".to_string()],
        };
        assert!(err.to_string().contains("a (urn:x), b (urn:x)"));

        let err = Error::AmbiguousRootElement {
            requested: Some("zzz".to_string()),
            candidates: vec!["a (urn:x)".to_string()],
        };
        assert!(err.to_string().contains("'zzz' not found"));
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = ParseError::new("test").into();
        assert!(matches!(err, Error::Parse(_)));
    }
}
