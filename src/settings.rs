//! Mining and template settings
//!
//! [`Settings`] gathers the knobs a caller can turn before mining a schema:
//! resource limits, remote loading, the prefix synthesized for a default
//! namespace, and the rule deciding when a node requires text content.

use crate::limits::Limits;

/// Prefix given to the default namespace when a schema mixes it with
/// other prefixed namespaces
pub const NAMED_DEFAULT_PREFIX: &str = "this";

/// Rule for [`crate::helper::SchemaHelper::is_required_content_element`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequiredContentPolicy {
    /// Derived complex types require content unless their validating type
    /// is the XSD `string` built-in; everything else follows minOccurs/use
    #[default]
    DerivedNonString,
    /// Content is required exactly when the node itself is required
    OccursOnly,
}

/// Settings for mining a schema and building its template
#[derive(Debug, Clone)]
pub struct Settings {
    /// Resource limits
    pub limits: Limits,
    /// Whether includes and imports may be fetched over HTTP
    pub allow_remote: bool,
    /// Required-content rule
    pub required_content: RequiredContentPolicy,
    /// Prefix synthesized for the default namespace
    pub named_default_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            allow_remote: false,
            required_content: RequiredContentPolicy::default(),
            named_default_prefix: NAMED_DEFAULT_PREFIX.to_string(),
        }
    }
}

impl Settings {
    /// Create settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set whether to allow remote resources
    pub fn with_allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }

    /// Set the required-content rule
    pub fn with_required_content(mut self, policy: RequiredContentPolicy) -> Self {
        self.required_content = policy;
        self
    }

    /// Set the prefix used for a named default namespace
    pub fn with_named_default_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.named_default_prefix = prefix.into();
        self
    }
}
