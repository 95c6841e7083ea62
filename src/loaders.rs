//! Resource loading utilities
//!
//! This module loads schema files from disk or, with the `remote` feature,
//! over HTTP.

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::Location;
use std::fs;
use tracing::debug;

/// Resource loader for schemas and documents
#[derive(Debug)]
pub struct Loader {
    /// Resource limits
    limits: Limits,
    /// Whether to allow remote resources
    allow_remote: bool,
}

impl Loader {
    /// Create a new loader with default settings
    pub fn new() -> Self {
        Self {
            limits: Limits::default(),
            allow_remote: false,
        }
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

    /// Load a resource as a string
    pub fn load(&self, location: &Location) -> Result<String> {
        match location {
            Location::Path(path) => {
                debug!(path = %path.display(), "loading schema file");
                let content = fs::read_to_string(path).map_err(|e| {
                    Error::Resource(format!("Failed to read file '{}': {}", path.display(), e))
                })?;

                self.limits.check_xml_size(content.len())?;

                Ok(content)
            }
            Location::Url(url) => {
                if !self.allow_remote {
                    return Err(Error::Resource(format!(
                        "Remote resources are not allowed: {}",
                        url
                    )));
                }
                debug!(url = %url, "fetching remote schema");
                let content = fetch(url)?;
                self.limits.check_xml_size(content.len())?;
                Ok(content)
            }
            Location::String(s) => Ok(s.clone()),
        }
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "remote")]
fn fetch(url: &url::Url) -> Result<String> {
    let response = reqwest::blocking::get(url.as_str())
        .and_then(|r| r.error_for_status())
        .map_err(|e| Error::Resource(format!("Failed to fetch '{}': {}", url, e)))?;
    response
        .text()
        .map_err(|e| Error::Resource(format!("Failed to read '{}': {}", url, e)))
}

#[cfg(not(feature = "remote"))]
fn fetch(url: &url::Url) -> Result<String> {
    Err(Error::Resource(format!(
        "URL loading requires the 'remote' feature: {}",
        url
    )))
}
