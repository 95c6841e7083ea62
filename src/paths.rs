//! Path utilities
//!
//! Nodes are addressed by simple absolute paths: `/`-separated element
//! names, optional 1-based `[N]` occurrence indices, and a final `@name`
//! step for attributes. Form field names carry indices in an encoded
//! `_N_` form, which [`decode`] turns back into brackets.

use regex::Regex;

lazy_static::lazy_static! {
    static ref ENCODED_INDEX: Regex = Regex::new(r"_(\d+)_").unwrap();
    static ref BRACKET_INDEX: Regex = Regex::new(r"\[(\d+)\]").unwrap();
    static ref ANY_INDEX: Regex = Regex::new(r"\[[^\]]*\]").unwrap();
    static ref TEMPLATE_VAR: Regex = Regex::new(r"\$\{([^}]*)\}").unwrap();
}

/// One step of a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Element or attribute name, `*` matches any element
    pub name: String,
    /// 1-based occurrence index
    pub index: Option<usize>,
    /// True for an `@name` step
    pub attribute: bool,
}

impl Step {
    /// True when this step selects an element of the given name
    pub fn matches(&self, name: &str) -> bool {
        !self.attribute && (self.name == "*" || self.name == name)
    }
}

/// Split a path into steps
pub fn steps(path: &str) -> Vec<Step> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            let (attribute, segment) = match segment.strip_prefix('@') {
                Some(rest) => (true, rest),
                None => (false, segment),
            };
            let (name, index) = match segment.find('[') {
                Some(pos) => {
                    let index = segment[pos + 1..]
                        .trim_end_matches(']')
                        .parse::<usize>()
                        .ok();
                    (&segment[..pos], index)
                }
                None => (segment, None),
            };
            Step {
                name: name.to_string(),
                index,
                attribute,
            }
        })
        .collect()
}

/// Turn `_N_` indices into `[N]` and unwrap `${...}` variables
pub fn decode(path: &str) -> String {
    let path = TEMPLATE_VAR.replace_all(path, "$1");
    ENCODED_INDEX.replace_all(&path, "[$1]").to_string()
}

/// Turn `[N]` indices into `_N_`
pub fn encode(path: &str) -> String {
    BRACKET_INDEX.replace_all(path, "_${1}_").to_string()
}

/// Strip all occurrence indices
pub fn normalize(path: &str) -> String {
    ANY_INDEX.replace_all(path, "").to_string()
}

/// Path of the parent node, empty for a top-level step
pub fn parent(path: &str) -> String {
    match path.rfind('/') {
        Some(pos) => path[..pos].to_string(),
        None => String::new(),
    }
}

/// Last step of the path without its `@` marker
pub fn leaf(path: &str) -> String {
    let last = path.rsplit('/').next().unwrap_or(path);
    last.trim_start_matches('@').to_string()
}

/// True if the path addresses an attribute
pub fn is_attribute_path(path: &str) -> bool {
    path.rsplit('/')
        .next()
        .map_or(false, |last| last.starts_with('@'))
}

/// Name of the addressed node, without index or `@`
pub fn node_name(path: &str) -> String {
    normalize(&leaf(path))
}

/// Occurrence index of the last step, 0 when none is given
pub fn index(path: &str) -> usize {
    steps(path)
        .last()
        .and_then(|step| step.index)
        .unwrap_or(0)
}

/// Path of the `index`-th sibling with the same name
pub fn sibling_path(path: &str, index: usize) -> String {
    format!("{}/{}[{}]", parent(path), node_name(path), index)
}

/// Append an element step
pub fn join(parent: &str, name: &str) -> String {
    format!("{}/{}", parent, name)
}

/// Append an attribute step
pub fn join_attribute(parent: &str, name: &str) -> String {
    format!("{}/@{}", parent, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_steps() {
        let parsed = steps("/catalog/item[2]/@id");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[1].name, "item");
        assert_eq!(parsed[1].index, Some(2));
        assert!(parsed[2].attribute);
        assert_eq!(parsed[2].name, "id");
    }

    #[test]
    fn test_decode_and_encode() {
        assert_eq!(decode("/record/item_2_/title"), "/record/item[2]/title");
        assert_eq!(decode("${/record/item_1_}"), "/record/item[1]");
        assert_eq!(encode("/record/item[2]/title"), "/record/item_2_/title");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/a[1]/b[12]/@c"), "/a/b/@c");
        assert_eq!(normalize("/a/b"), "/a/b");
    }

    #[test]
    fn test_parent_leaf_and_names() {
        assert_eq!(parent("/a/b[2]"), "/a");
        assert_eq!(parent("/a"), "");
        assert_eq!(leaf("/a/@id"), "id");
        assert_eq!(node_name("/a/b[3]"), "b");
        assert!(is_attribute_path("/a/@id"));
        assert!(!is_attribute_path("/a/b"));
    }

    #[test]
    fn test_index_and_sibling() {
        assert_eq!(index("/a/b[3]"), 3);
        assert_eq!(index("/a/b"), 0);
        assert_eq!(sibling_path("/a/b[1]", 4), "/a/b[4]");
    }

    proptest! {
        #[test]
        fn test_normalize_is_idempotent(path in "(/[a-z]{1,6}(\\[[0-9]{1,2}\\])?){1,5}") {
            let once = normalize(&path);
            prop_assert_eq!(normalize(&once), once.clone());
            prop_assert!(!once.contains('['));
        }

        #[test]
        fn test_parent_and_leaf_rebuild_path(path in "(/[a-z]{1,6}){1,5}") {
            prop_assert_eq!(join(&parent(&path), &leaf(&path)), path);
        }
    }
}
