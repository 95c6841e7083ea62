//! Resource location resolution
//!
//! This module handles resolution of schema locations (URLs or file paths),
//! including `schemaLocation` values relative to an including file.

use crate::error::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Resource location - can be a URL, file path, or string identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// URL (http, https, ftp, etc.)
    Url(Url),
    /// String identifier (for in-memory resources)
    String(String),
}

impl Location {
    /// Create a location from a string (auto-detect type)
    pub fn from_str(s: &str) -> Result<Self> {
        if let Ok(url) = Url::parse(s) {
            if url.scheme() == "file" {
                if let Ok(path) = url.to_file_path() {
                    return Ok(Location::Path(path));
                }
            } else if url.scheme().len() > 1 {
                // single-letter schemes are Windows drive letters
                return Ok(Location::Url(url));
            }
        }

        Ok(Location::Path(PathBuf::from(s)))
    }

    /// Get the location as a string
    pub fn as_str(&self) -> String {
        match self {
            Location::Path(p) => p.to_string_lossy().to_string(),
            Location::Url(u) => u.to_string(),
            Location::String(s) => s.clone(),
        }
    }

    /// Stable key for "already processed" bookkeeping.
    ///
    /// Paths are canonicalized when they exist so that `a/../b.xsd` and
    /// `b.xsd` name the same file.
    pub fn key(&self) -> String {
        match self {
            Location::Path(p) => p
                .canonicalize()
                .map(|c| c.to_string_lossy().to_string())
                .unwrap_or_else(|_| p.to_string_lossy().to_string()),
            other => other.as_str(),
        }
    }

    /// Check if this is a remote location (URL)
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Url(_))
    }

    /// Check if this is a local file
    pub fn is_file(&self) -> bool {
        matches!(self, Location::Path(_))
    }

    /// True when the location can plausibly be loaded.
    ///
    /// Local paths must exist; URLs are assumed reachable until fetched.
    pub fn exists(&self) -> bool {
        match self {
            Location::Path(p) => p.is_file(),
            Location::Url(_) => true,
            Location::String(_) => true,
        }
    }

    /// Resolve `relative` against this location
    pub fn resolve(&self, relative: &str) -> Result<Location> {
        if let Ok(url) = Url::parse(relative) {
            if url.scheme().len() > 1 {
                return Location::from_str(relative);
            }
        }
        if Path::new(relative).is_absolute() {
            return Ok(Location::Path(PathBuf::from(relative)));
        }

        match self {
            Location::Url(base) => Ok(Location::Url(base.join(relative)?)),
            Location::Path(path) => {
                let dir = path.parent().unwrap_or_else(|| Path::new(""));
                Ok(Location::Path(dir.join(relative)))
            }
            Location::String(_) => Ok(Location::Path(PathBuf::from(relative))),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
