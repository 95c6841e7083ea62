//! Qualified name utilities
//!
//! Schema components and instance nodes are named by prefixed strings
//! (`xs:string`, `this:record`). These helpers split, strip and check
//! such names; resolution of the prefix is left to the
//! [`NamespaceRegistry`](crate::namespaces::NamespaceRegistry).

use once_cell::sync::Lazy;
use regex::Regex;

static NCNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}][A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}\-\.0-9\u{B7}]*$")
        .unwrap()
});

/// Check if a string is a valid NCName (non-colonized name)
pub fn is_valid_ncname(name: &str) -> bool {
    NCNAME.is_match(name)
}

/// Check if a string is a valid QName (qualified name)
pub fn is_valid_qname(name: &str) -> bool {
    match name.split_once(':') {
        Some((prefix, local)) => is_valid_ncname(prefix) && is_valid_ncname(local),
        None => is_valid_ncname(name),
    }
}

/// Split a QName into prefix and local name
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    if let Some((prefix, local)) = qname.split_once(':') {
        (Some(prefix), local)
    } else {
        (None, qname)
    }
}

/// Local part of a QName
pub fn local_name(qname: &str) -> &str {
    split_qname(qname).1
}

/// Prefix of a QName, empty when unprefixed
pub fn prefix(qname: &str) -> &str {
    split_qname(qname).0.unwrap_or("")
}

/// True when the name carries a prefix
pub fn is_qualified(qname: &str) -> bool {
    qname.contains(':')
}

/// Join a prefix and a local name
pub fn make_qualified(prefix: &str, local_name: &str) -> String {
    if prefix.is_empty() {
        local_name.to_string()
    } else {
        format!("{}:{}", prefix, local_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_ncname() {
        assert!(is_valid_ncname("element"));
        assert!(is_valid_ncname("my-element"));
        assert!(is_valid_ncname("record-inline-3"));

        assert!(!is_valid_ncname(""));
        assert!(!is_valid_ncname("prefix:element"));
        assert!(!is_valid_ncname("123element"));
    }

    #[test]
    fn test_is_valid_qname() {
        assert!(is_valid_qname("element"));
        assert!(is_valid_qname("xs:schema"));

        assert!(!is_valid_qname(""));
        assert!(!is_valid_qname(":element"));
        assert!(!is_valid_qname("element:"));
    }

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("element"), (None, "element"));
        assert_eq!(split_qname("xs:element"), (Some("xs"), "element"));
        assert_eq!(local_name("this:record"), "record");
        assert_eq!(prefix("this:record"), "this");
        assert_eq!(prefix("record"), "");
    }

    #[test]
    fn test_make_qualified() {
        assert_eq!(make_qualified("", "a"), "a");
        assert_eq!(make_qualified("p", "a"), "p:a");
        assert!(is_qualified("p:a"));
        assert!(!is_qualified("a"));
    }
}
