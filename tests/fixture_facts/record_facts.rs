//! Static facts about the multi-namespace fixture `record/record.xsd`,
//! which imports `record/dc.xsd`.

/// Known facts about the multi-namespace fixture
pub struct RecordFacts;

impl RecordFacts {
    /// Namespace of `record.xsd`
    pub const RECORD_NAMESPACE: &'static str = "urn:record";

    /// Namespace of `dc.xsd`
    pub const DC_NAMESPACE: &'static str = "urn:dc";

    /// Prefix synthesized for the default namespace
    pub const NAMED_DEFAULT: &'static str = "this";

    /// Instance name of the root element
    pub const ROOT: &'static str = "this:record";

    /// Element paths of the template, in walk order
    pub const ELEMENT_PATHS: &'static [&'static str] = &[
        "/this:record",
        "/this:record/this:identifier",
        "/this:record/dc:title",
        "/this:record/dc:subject",
    ];

    /// Attribute paths of the template
    pub const ATTRIBUTE_PATHS: &'static [&'static str] = &["/this:record/@xml:lang"];
}
