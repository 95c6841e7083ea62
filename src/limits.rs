//! Limits and constraints for schema mining and template expansion
//!
//! This module defines the bounds that keep mining finite on hostile or
//! pathological schemas: how many files an include graph may pull in, how
//! large a single file may be, how often a recursive type may repeat along
//! one branch, and an absolute cap on template depth.

use crate::error::{Error, Result};

/// Global limits configuration
#[derive(Debug, Clone)]
pub struct Limits {
    /// Number of ancestor type repeats after which an element is treated
    /// as recursive and left unexpanded
    pub recursion_bound: usize,

    /// Maximum depth of the template tree
    pub max_expansion_depth: usize,

    /// Maximum number of schema files reachable through include/import
    pub max_schema_files: usize,

    /// Maximum schema or document size in bytes
    pub max_xml_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            recursion_bound: 4,
            max_expansion_depth: 256,
            max_schema_files: 1000,
            max_xml_size: 100 * 1024 * 1024, // 100 MB
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            recursion_bound: 2,
            max_expansion_depth: 64,
            max_schema_files: 100,
            max_xml_size: 10 * 1024 * 1024, // 10 MB
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            recursion_bound: 8,
            max_expansion_depth: 4096,
            max_schema_files: 100000,
            max_xml_size: 1024 * 1024 * 1024, // 1 GB
        }
    }

    /// Set the recursion bound
    pub fn with_recursion_bound(mut self, bound: usize) -> Self {
        self.recursion_bound = bound;
        self
    }

    /// Set the expansion depth cap
    pub fn with_max_expansion_depth(mut self, depth: usize) -> Self {
        self.max_expansion_depth = depth;
        self
    }

    /// Check if template depth is within limits
    pub fn check_expansion_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_expansion_depth {
            Err(Error::LimitExceeded(format!(
                "template depth {} exceeds maximum {}",
                depth, self.max_expansion_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if XML size is within limits
    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        if size > self.max_xml_size {
            Err(Error::LimitExceeded(format!(
                "XML size {} bytes exceeds maximum {} bytes",
                size, self.max_xml_size
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the number of schema files is within limits
    pub fn check_schema_files(&self, count: usize) -> Result<()> {
        if count > self.max_schema_files {
            Err(Error::LimitExceeded(format!(
                "schema file count {} exceeds maximum {}",
                count, self.max_schema_files
            )))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.recursion_bound, 4);
        assert_eq!(limits.max_expansion_depth, 256);
        assert_eq!(limits.max_xml_size, 100 * 1024 * 1024);
    }

    #[test]
    fn test_strict_limits() {
        let limits = Limits::strict();
        assert!(limits.max_expansion_depth < Limits::default().max_expansion_depth);
        assert!(limits.max_schema_files < Limits::default().max_schema_files);
    }

    #[test]
    fn test_permissive_limits() {
        let limits = Limits::permissive();
        assert!(limits.max_expansion_depth > Limits::default().max_expansion_depth);
        assert!(limits.max_xml_size > Limits::default().max_xml_size);
    }

    #[test]
    fn test_check_expansion_depth() {
        let limits = Limits::default().with_max_expansion_depth(10);
        assert!(limits.check_expansion_depth(10).is_ok());
        assert!(matches!(
            limits.check_expansion_depth(11),
            Err(Error::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_check_xml_size() {
        let limits = Limits::default();
        assert!(limits.check_xml_size(1024).is_ok());
        assert!(limits.check_xml_size(200 * 1024 * 1024).is_err());
    }

    #[test]
    fn test_check_schema_files() {
        let limits = Limits::strict();
        assert!(limits.check_schema_files(100).is_ok());
        assert!(limits.check_schema_files(101).is_err());
    }
}
