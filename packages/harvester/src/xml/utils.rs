//! XML utility functions for navigating and extracting data from DOM trees.
//!
//! Element names are written as `prefix:local` and resolved through the
//! [`namespaces`](crate::namespaces) registry, so `gmd:title` only matches a
//! `title` element in the ISO 19139 namespace whatever prefix the server
//! chose. A bare `local` name matches any namespace.

use roxmltree::Node;

use crate::namespaces::qname;

/// Get the tag name without namespace prefix.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use csw_harvester::xml::get_tag_name;
///
/// let xml = r#"<csw:Record xmlns:csw="http://www.opengis.net/cat/csw/2.0.2"/>"#;
/// let doc = Document::parse(xml).unwrap();
/// assert_eq!(get_tag_name(doc.root_element()), "Record");
/// ```
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Check whether an element matches a `prefix:local` (or bare `local`) name.
pub fn matches_name(node: Node<'_, '_>, name: &str) -> bool {
    if !node.is_element() {
        return false;
    }
    if !name.contains(':') {
        return get_tag_name(node) == name;
    }
    match qname(name) {
        Ok((uri, local)) => node.tag_name().namespace() == Some(uri) && get_tag_name(node) == local,
        Err(e) => {
            tracing::warn!(error = %e, name, "Element name cannot be resolved");
            false
        }
    }
}

/// Find the first child element with the given name.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use csw_harvester::xml::find_child;
///
/// let xml = r#"<r xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:identifier>42</dc:identifier></r>"#;
/// let doc = Document::parse(xml).unwrap();
/// assert!(find_child(doc.root_element(), "dc:identifier").is_some());
/// assert!(find_child(doc.root_element(), "dc:title").is_none());
/// ```
pub fn find_child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| matches_name(*child, name))
}

/// Find all child elements with the given name.
pub fn find_children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |child| matches_name(*child, name))
}

/// Find a descendant element matching a slash-separated path of names.
///
/// A `*` segment matches any element child, which covers the ISO
/// substitution groups (`MD_DataIdentification` vs `SV_ServiceIdentification`).
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use csw_harvester::xml::find_by_path;
///
/// let xml = r#"<a><b><c>found</c></b></a>"#;
/// let doc = Document::parse(xml).unwrap();
/// let c = find_by_path(doc.root_element(), "b/c").unwrap();
/// assert_eq!(c.text(), Some("found"));
/// assert!(find_by_path(doc.root_element(), "*/c").is_some());
/// ```
pub fn find_by_path<'a, 'input>(node: Node<'a, 'input>, path: &str) -> Option<Node<'a, 'input>> {
    let mut current = node;
    for part in path.split('/') {
        current = if part == "*" {
            element_children(current).next()?
        } else {
            find_child(current, part)?
        };
    }
    Some(current)
}

/// Get the text content of a node, trimmed.
///
/// # Returns
/// Trimmed text content, or empty string if no text
pub fn get_text(node: Node<'_, '_>) -> String {
    node.text()
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Trimmed, non-empty text of the element at `path` below `node`.
pub fn text_at(node: Node<'_, '_>, path: &str) -> Option<String> {
    find_by_path(node, path)
        .map(get_text)
        .filter(|s| !s.is_empty())
}

/// Read an ISO 19139 free-text property.
///
/// The value sits in a `gco:CharacterString` or `gmx:Anchor` child of the
/// property element.
pub fn character_string(property: Node<'_, '_>) -> Option<String> {
    element_children(property)
        .find(|c| matches_name(*c, "gco:CharacterString") || matches_name(*c, "gmx:Anchor"))
        .map(get_text)
        .filter(|s| !s.is_empty())
}

/// Read the `codeListValue` of the code list element inside a property,
/// falling back to its text.
pub fn code_list_value(property: Node<'_, '_>) -> Option<String> {
    let code = element_children(property).next()?;
    code.attribute("codeListValue")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| Some(get_text(code)).filter(|s| !s.is_empty()))
}

/// Get all element children of a node.
pub fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}
