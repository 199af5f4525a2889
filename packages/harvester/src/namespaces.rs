//! XML namespace registry for CSW and ISO 19139 documents.
//!
//! Resolves the short prefixes used throughout the catalogue protocols
//! (`csw`, `dc`, `ows`, `gmd`, `ogc`, ...) to their namespace URIs.

use crate::error::{HarvesterError, Result};

/// CSW 2.0.2 namespace.
pub const CSW: &str = "http://www.opengis.net/cat/csw/2.0.2";
/// Dublin Core elements namespace.
pub const DC: &str = "http://purl.org/dc/elements/1.1/";
/// Dublin Core terms namespace.
pub const DCT: &str = "http://purl.org/dc/terms/";
/// ISO 19139 geographic metadata namespace.
pub const GMD: &str = "http://www.isotc211.org/2005/gmd";
/// ISO 19139 common objects namespace.
pub const GCO: &str = "http://www.isotc211.org/2005/gco";
/// ISO 19139 extended types namespace (anchors).
pub const GMX: &str = "http://www.isotc211.org/2005/gmx";
/// OGC Filter Encoding namespace.
pub const OGC: &str = "http://www.opengis.net/ogc";
/// OWS 1.0 namespace, used by CSW 2.0.2 capabilities and exceptions.
pub const OWS: &str = "http://www.opengis.net/ows";
/// XML Schema instance namespace.
pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Known prefixes, sorted by prefix.
const NAMESPACES: &[(&str, &str)] = &[
    ("atom", "http://www.w3.org/2005/Atom"),
    ("csw", CSW),
    ("dc", DC),
    ("dct", DCT),
    ("dif", "http://gcmd.gsfc.nasa.gov/Aboutus/xml/dif/"),
    ("fgdc", "http://www.opengis.net/cat/csw/csdgm"),
    ("gco", GCO),
    ("geonet", "http://www.fao.org/geonetwork"),
    ("gmd", GMD),
    ("gmi", "http://www.isotc211.org/2005/gmi"),
    ("gml", "http://www.opengis.net/gml"),
    ("gml32", "http://www.opengis.net/gml/3.2"),
    ("gmx", GMX),
    ("gsr", "http://www.isotc211.org/2005/gsr"),
    ("gts", "http://www.isotc211.org/2005/gts"),
    ("ogc", OGC),
    ("ows", OWS),
    ("ows110", "http://www.opengis.net/ows/1.1"),
    ("rim", "urn:oasis:names:tc:ebxml-regrep:xsd:rim:3.0"),
    ("srv", "http://www.isotc211.org/2005/srv"),
    ("xlink", "http://www.w3.org/1999/xlink"),
    ("xs", "http://www.w3.org/2001/XMLSchema"),
    ("xsi", XSI),
];

/// Look up the namespace URI for a prefix.
///
/// # Examples
/// ```
/// use csw_harvester::namespaces::ns;
///
/// assert_eq!(ns("csw"), Some("http://www.opengis.net/cat/csw/2.0.2"));
/// assert_eq!(ns("nope"), None);
/// ```
#[must_use]
pub fn ns(prefix: &str) -> Option<&'static str> {
    NAMESPACES
        .binary_search_by(|(p, _)| (*p).cmp(prefix))
        .ok()
        .map(|i| NAMESPACES[i].1)
}

/// Look up the namespace URI for a prefix, failing on unknown prefixes.
pub fn require_ns(prefix: &str) -> Result<&'static str> {
    ns(prefix).ok_or_else(|| HarvesterError::UnknownNamespace(prefix.to_string()))
}

/// Build a prefix-to-URI map for the given prefixes, in order.
pub fn nsmap<'a>(prefixes: &[&'a str]) -> Result<Vec<(&'a str, &'static str)>> {
    prefixes
        .iter()
        .map(|p| require_ns(p).map(|uri| (*p, uri)))
        .collect()
}

/// Split a `prefix:local` name into its namespace URI and local part.
///
/// # Examples
/// ```
/// use csw_harvester::namespaces::qname;
///
/// let (uri, local) = qname("gmd:MD_Metadata").unwrap();
/// assert_eq!(uri, "http://www.isotc211.org/2005/gmd");
/// assert_eq!(local, "MD_Metadata");
/// ```
pub fn qname(name: &str) -> Result<(&'static str, &str)> {
    let (prefix, local) = name
        .split_once(':')
        .ok_or_else(|| HarvesterError::UnknownNamespace(name.to_string()))?;
    Ok((require_ns(prefix)?, local))
}
