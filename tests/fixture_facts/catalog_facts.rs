//! Static facts about the single-namespace fixtures: `catalog.xsd`,
//! `media.xsd`, `tree.xsd`, `substitution.xsd` and `library/`.

/// Known facts about the single-namespace fixtures
pub struct CatalogFacts;

impl CatalogFacts {
    /// Root element of `catalog.xsd`
    pub const CATALOG_ROOT: &'static str = "catalog";

    /// Minimal document of `catalog.xsd`
    pub const CATALOG_MINIMAL: &'static str = "<catalog><title/></catalog>";

    /// Every schema node path of `catalog.xsd`, in walk order
    pub const CATALOG_PATHS: &'static [&'static str] =
        &["/catalog", "/catalog/title", "/catalog/tag"];

    /// Template children of `/media`; base members come first
    pub const MEDIA_CHILDREN: &'static [&'static str] = &["label", "created", "url"];

    /// Attributes of `/media`; base attributes come first
    pub const MEDIA_ATTRIBUTES: &'static [&'static str] = &["/media/@id", "/media/@format"];

    /// Type `/media` is validated against
    pub const MEDIA_VALIDATING_TYPE: &'static str = "baseType";

    /// Deepest expanded `node` path of `tree.xsd` under the default bound
    pub const TREE_RECURSIVE_PATH: &'static str = "/node/node/node/node/node";

    /// Substitution members of `publication` in `substitution.xsd`
    pub const SHELF_MEMBERS: &'static [&'static str] = &["book", "magazine"];

    /// Namespace of the `library/` fixtures
    pub const LIBRARY_NAMESPACE: &'static str = "urn:library";

    /// Definitions contributed by `library/authors.xsd`
    pub const LIBRARY_INCLUDED: &'static [&'static str] = &["author", "authorType", "roleType"];
}
