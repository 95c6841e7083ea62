//! Static facts about the fixture schemas for assertion in tests.
//!
//! Each module records what mining and expanding one fixture must produce,
//! so the integration tests can assert against named constants rather than
//! scattered literals.

#![allow(dead_code)]

pub mod catalog_facts;
pub mod record_facts;

pub use catalog_facts::CatalogFacts;
pub use record_facts::RecordFacts;

use std::path::PathBuf;

/// Absolute path of a file under `tests/fixtures`
pub fn fixture(relative: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(relative);
    path.to_string_lossy().into_owned()
}
