//! Wire format of the catalogue service.
//!
//! [`CatalogProtocol`] isolates everything that knows what requests and
//! responses look like, so the pagination logic and the transport can be
//! tested without each other. [`Csw202`] speaks CSW 2.0.2 over POST/XML.

use roxmltree::{Document, Node};

use crate::config::{CSW_VERSION, LISTING_OUTPUT_SCHEMA, RECORD_OUTPUT_SCHEMA};
use crate::error::{HarvesterError, Result};
use crate::filter::FilterExpression;
use crate::record::{file_identifier, parse_md_metadata, Record};
use crate::xml::{element_children, find_child, get_tag_name, matches_name, text_at, XmlWriter};

/// Parameters of one listing request.
#[derive(Debug, Clone, Copy)]
pub struct ListingRequest<'a> {
    /// Offset of the next unseen record; `None` omits the attribute.
    pub start_position: Option<usize>,
    /// Maximum number of records the server should return.
    pub max_records: usize,
    pub filter: Option<&'a FilterExpression>,
}

/// One listing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    /// Total records matching the query, as reported by the server.
    pub matched_count: usize,
    /// Records included in this response, as reported by the server.
    pub returned_count: usize,
    /// Server's `nextRecord` hint, informational only.
    pub next_record: Option<usize>,
    pub record_ids: Vec<String>,
}

/// Service metadata discovered through `GetCapabilities`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub service_type: String,
    pub version: String,
    pub title: Option<String>,
}

/// Request builders and response parsers for a catalogue protocol.
pub trait CatalogProtocol: Send + Sync {
    /// Body of a listing (search) request.
    fn build_listing_request(&self, request: &ListingRequest<'_>) -> Result<String>;

    /// Parse a listing response.
    fn parse_listing_response(&self, body: &str) -> Result<SearchPage>;

    /// Body of a retrieval request for one identifier.
    fn build_retrieval_request(&self, id: &str) -> Result<String>;

    /// Extract the record with identifier `id` from a retrieval response.
    fn parse_retrieval_response(&self, body: &str, id: &str) -> Result<Record>;

    /// Query parameters of a capabilities request.
    fn capabilities_query(&self) -> Vec<(&'static str, &'static str)>;

    /// Parse a capabilities document.
    fn parse_capabilities(&self, body: &str) -> Result<Capabilities>;
}

/// CSW 2.0.2: brief Dublin Core records for listing, ISO 19139 for retrieval.
#[derive(Debug, Clone)]
pub struct Csw202 {
    listing_schema: String,
    record_schema: String,
}

impl Default for Csw202 {
    fn default() -> Self {
        Self {
            listing_schema: LISTING_OUTPUT_SCHEMA.to_string(),
            record_schema: RECORD_OUTPUT_SCHEMA.to_string(),
        }
    }
}

impl Csw202 {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CatalogProtocol for Csw202 {
    fn build_listing_request(&self, request: &ListingRequest<'_>) -> Result<String> {
        let max_records = request.max_records.to_string();
        let start_position = request.start_position.map(|s| s.to_string());

        let mut attrs = vec![
            ("service", "CSW"),
            ("version", CSW_VERSION),
            ("resultType", "results"),
            ("outputSchema", self.listing_schema.as_str()),
            ("maxRecords", max_records.as_str()),
        ];
        if let Some(start) = &start_position {
            attrs.push(("startPosition", start.as_str()));
        }

        let mut w = XmlWriter::new()?;
        w.start_with_namespaces("csw:GetRecords", &["csw", "ogc", "dc", "dct", "xsi"], &attrs)?;
        w.start("csw:Query", &[("typeNames", "csw:Record")])?;
        w.text_element("csw:ElementSetName", "brief")?;
        if let Some(filter) = request.filter {
            w.start("csw:Constraint", &[("version", "1.1.0")])?;
            w.start("ogc:Filter", &[])?;
            filter.write_xml(&mut w)?;
            w.end("ogc:Filter")?;
            w.end("csw:Constraint")?;
        }
        w.end("csw:Query")?;
        w.end("csw:GetRecords")?;
        w.finish()
    }

    fn parse_listing_response(&self, body: &str) -> Result<SearchPage> {
        let doc = Document::parse(body)?;
        let root = expect_root(&doc, "csw:GetRecordsResponse")?;
        let results = find_child(root, "csw:SearchResults")
            .ok_or_else(|| HarvesterError::missing_element("SearchResults", "GetRecordsResponse"))?;

        let matched_count = count_attribute(results, "numberOfRecordsMatched")?;
        let returned_count = count_attribute(results, "numberOfRecordsReturned")?;
        let next_record = results
            .attribute("nextRecord")
            .and_then(|v| v.trim().parse().ok());

        let record_ids = element_children(results)
            .enumerate()
            .map(|(i, record)| {
                listing_identifier(record).ok_or_else(|| {
                    HarvesterError::missing_element(
                        "identifier",
                        &format!("record {} <{}> of SearchResults", i + 1, get_tag_name(record)),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SearchPage {
            matched_count,
            returned_count,
            next_record,
            record_ids,
        })
    }

    fn build_retrieval_request(&self, id: &str) -> Result<String> {
        let mut w = XmlWriter::new()?;
        w.start_with_namespaces(
            "csw:GetRecordById",
            &["csw"],
            &[
                ("service", "CSW"),
                ("version", CSW_VERSION),
                ("outputSchema", self.record_schema.as_str()),
            ],
        )?;
        w.text_element("csw:Id", id)?;
        w.text_element("csw:ElementSetName", "full")?;
        w.end("csw:GetRecordById")?;
        w.finish()
    }

    fn parse_retrieval_response(&self, body: &str, id: &str) -> Result<Record> {
        let doc = Document::parse(body)?;
        let root = expect_root(&doc, "csw:GetRecordByIdResponse")?;

        let mut metadata_seen = false;
        for child in element_children(root) {
            if !is_iso_metadata(child) {
                return Err(HarvesterError::UnexpectedResponse {
                    expected: "gmd:MD_Metadata".to_string(),
                    found: get_tag_name(child).to_string(),
                });
            }
            metadata_seen = true;
            if file_identifier(child).as_deref() == Some(id) {
                return Ok(parse_md_metadata(child));
            }
        }

        tracing::debug!(id, metadata_seen, "Requested record absent from response");
        Err(HarvesterError::RecordNotFound(id.to_string()))
    }

    fn capabilities_query(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            ("service", "CSW"),
            ("request", "GetCapabilities"),
            ("version", CSW_VERSION),
        ]
    }

    fn parse_capabilities(&self, body: &str) -> Result<Capabilities> {
        let doc = Document::parse(body)?;
        let root = expect_root(&doc, "csw:Capabilities")?;
        let ident = find_child(root, "ows:ServiceIdentification");

        let service_type = ident
            .and_then(|i| text_at(i, "ows:ServiceType"))
            .unwrap_or_else(|| "CSW".to_string());
        let version = ident
            .and_then(|i| text_at(i, "ows:ServiceTypeVersion"))
            .or_else(|| root.attribute("version").map(str::to_string))
            .ok_or_else(|| HarvesterError::MissingAttribute {
                attribute: "version".to_string(),
                element: "Capabilities".to_string(),
            })?;

        Ok(Capabilities {
            service_type,
            version,
            title: ident.and_then(|i| text_at(i, "ows:Title")),
        })
    }
}

/// Check the root element, turning exception reports into errors.
fn expect_root<'a, 'input>(doc: &'a Document<'input>, expected: &str) -> Result<Node<'a, 'input>> {
    let root = doc.root_element();
    if get_tag_name(root) == "ExceptionReport" {
        return Err(exception_report(root));
    }
    if !matches_name(root, expected) {
        return Err(HarvesterError::UnexpectedResponse {
            expected: expected.to_string(),
            found: get_tag_name(root).to_string(),
        });
    }
    Ok(root)
}

fn exception_report(root: Node<'_, '_>) -> HarvesterError {
    let exception = element_children(root).find(|n| get_tag_name(*n) == "Exception");
    let code = exception
        .and_then(|e| e.attribute("exceptionCode"))
        .map(str::to_string);
    let text = exception
        .and_then(|e| element_children(e).find(|n| get_tag_name(*n) == "ExceptionText"))
        .and_then(|t| t.text())
        .map(|t| t.trim().to_string())
        .unwrap_or_else(|| "no exception text".to_string());
    HarvesterError::ExceptionReport { code, text }
}

fn count_attribute(node: Node<'_, '_>, name: &str) -> Result<usize> {
    let raw = node
        .attribute(name)
        .ok_or_else(|| HarvesterError::MissingAttribute {
            attribute: name.to_string(),
            element: get_tag_name(node).to_string(),
        })?;
    raw.trim()
        .parse()
        .map_err(|_| HarvesterError::InvalidAttribute {
            attribute: name.to_string(),
            element: get_tag_name(node).to_string(),
            value: raw.to_string(),
        })
}

fn listing_identifier(record: Node<'_, '_>) -> Option<String> {
    if is_iso_metadata(record) {
        return file_identifier(record);
    }
    find_child(record, "dc:identifier")
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn is_iso_metadata(node: Node<'_, '_>) -> bool {
    matches_name(node, "gmd:MD_Metadata") || matches_name(node, "gmi:MI_Metadata")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::namespaces::{CSW, DC, DCT, GMD, OGC, OWS, XSI};
    use crate::xml::find_by_path;
    use pretty_assertions::assert_eq;

    fn listing_xml(matched: &str, returned: &str, ids: &[&str]) -> String {
        let records: String = ids
            .iter()
            .map(|id| {
                format!(
                    "<csw:BriefRecord><dc:identifier>{id}</dc:identifier><dc:type>dataset</dc:type></csw:BriefRecord>"
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<csw:GetRecordsResponse xmlns:csw="{CSW}" xmlns:dc="{DC}">
  <csw:SearchStatus timestamp="2024-01-01T00:00:00"/>
  <csw:SearchResults numberOfRecordsMatched="{matched}" numberOfRecordsReturned="{returned}" elementSet="brief" nextRecord="0">{records}</csw:SearchResults>
</csw:GetRecordsResponse>"#
        )
    }

    fn request_root(xml: &str) -> (String, Vec<(String, String)>) {
        let doc = Document::parse(xml).unwrap();
        let root = doc.root_element();
        let attrs = root
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect();
        (root.tag_name().name().to_string(), attrs)
    }

    #[test]
    fn test_listing_request_first_page_omits_start_position() {
        let xml = Csw202::new()
            .build_listing_request(&ListingRequest {
                start_position: None,
                max_records: 10,
                filter: None,
            })
            .unwrap();
        let (name, attrs) = request_root(&xml);

        assert_eq!(name, "GetRecords");
        let get = |k: &str| attrs.iter().find(|(n, _)| n == k).map(|(_, v)| v.as_str());
        assert_eq!(get("maxRecords"), Some("10"));
        assert_eq!(get("resultType"), Some("results"));
        assert_eq!(get("outputSchema"), Some(LISTING_OUTPUT_SCHEMA));
        assert_eq!(get("startPosition"), None);

        let doc = Document::parse(&xml).unwrap();
        let root = doc.root_element();
        for (prefix, uri) in [("csw", CSW), ("ogc", OGC), ("dc", DC), ("dct", DCT), ("xsi", XSI)] {
            assert_eq!(root.lookup_namespace_uri(Some(prefix)), Some(uri));
        }
        let query = find_child(root, "csw:Query").unwrap();
        assert_eq!(query.attribute("typeNames"), Some("csw:Record"));
        assert_eq!(text_at(query, "csw:ElementSetName").as_deref(), Some("brief"));
        assert!(find_child(query, "csw:Constraint").is_none());
    }

    #[test]
    fn test_listing_request_with_offset_and_filter() {
        let filter = FilterExpression::equal_to("dc:type", "dataset");
        let xml = Csw202::new()
            .build_listing_request(&ListingRequest {
                start_position: Some(20),
                max_records: 5,
                filter: Some(&filter),
            })
            .unwrap();
        let doc = Document::parse(&xml).unwrap();
        let root = doc.root_element();

        assert_eq!(root.attribute("startPosition"), Some("20"));
        let ogc_filter = find_by_path(root, "csw:Query/csw:Constraint/ogc:Filter").unwrap();
        let children: Vec<_> = element_children(ogc_filter).collect();
        assert_eq!(children.len(), 1);
        assert!(matches_name(children[0], "ogc:PropertyIsEqualTo"));
        assert_eq!(text_at(children[0], "ogc:Literal").as_deref(), Some("dataset"));
    }

    #[test]
    fn test_parse_listing_response() {
        let page = Csw202::new()
            .parse_listing_response(&listing_xml("12", "2", &["a", "b"]))
            .unwrap();
        assert_eq!(
            page,
            SearchPage {
                matched_count: 12,
                returned_count: 2,
                next_record: Some(0),
                record_ids: vec!["a".to_string(), "b".to_string()],
            }
        );
    }

    #[test]
    fn test_parse_listing_response_iso_records() {
        let xml = format!(
            r#"<csw:GetRecordsResponse xmlns:csw="{CSW}" xmlns:gmd="{GMD}" xmlns:gco="http://www.isotc211.org/2005/gco">
  <csw:SearchResults numberOfRecordsMatched="1" numberOfRecordsReturned="1">
    <gmd:MD_Metadata><gmd:fileIdentifier><gco:CharacterString>iso-1</gco:CharacterString></gmd:fileIdentifier></gmd:MD_Metadata>
  </csw:SearchResults>
</csw:GetRecordsResponse>"#
        );
        let page = Csw202::new().parse_listing_response(&xml).unwrap();
        assert_eq!(page.record_ids, vec!["iso-1".to_string()]);
    }

    #[test]
    fn test_parse_listing_response_errors() {
        let protocol = Csw202::new();

        let missing = listing_xml("1", "1", &["a"]).replace(" numberOfRecordsMatched=\"1\"", "");
        assert!(matches!(
            protocol.parse_listing_response(&missing),
            Err(HarvesterError::MissingAttribute { attribute, .. }) if attribute == "numberOfRecordsMatched"
        ));

        assert!(matches!(
            protocol.parse_listing_response(&listing_xml("many", "1", &["a"])),
            Err(HarvesterError::InvalidAttribute { value, .. }) if value == "many"
        ));

        let err = protocol.parse_listing_response("<not-xml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let no_id = listing_xml("1", "1", &["a"]).replace("<dc:identifier>a</dc:identifier>", "");
        assert!(matches!(
            protocol.parse_listing_response(&no_id),
            Err(HarvesterError::MissingElement { .. })
        ));

        let wrong_root = format!(r#"<csw:GetRecordByIdResponse xmlns:csw="{CSW}"/>"#);
        assert!(matches!(
            protocol.parse_listing_response(&wrong_root),
            Err(HarvesterError::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn test_exception_report() {
        let xml = format!(
            r#"<ows:ExceptionReport xmlns:ows="{OWS}" version="1.2.0">
  <ows:Exception exceptionCode="InvalidParameterValue" locator="typeNames">
    <ows:ExceptionText>Unknown type</ows:ExceptionText>
  </ows:Exception>
</ows:ExceptionReport>"#
        );
        let err = Csw202::new().parse_listing_response(&xml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(
            err.to_string(),
            "Server exception [InvalidParameterValue]: Unknown type"
        );
    }

    #[test]
    fn test_retrieval_request() {
        let xml = Csw202::new().build_retrieval_request("abc&1").unwrap();
        let doc = Document::parse(&xml).unwrap();
        let root = doc.root_element();

        assert!(matches_name(root, "csw:GetRecordById"));
        assert_eq!(root.attribute("outputSchema"), Some(RECORD_OUTPUT_SCHEMA));
        assert_eq!(text_at(root, "csw:Id").as_deref(), Some("abc&1"));
        assert_eq!(text_at(root, "csw:ElementSetName").as_deref(), Some("full"));
    }

    fn retrieval_xml(ids: &[&str]) -> String {
        let records: String = ids
            .iter()
            .map(|id| {
                format!(
                    "<gmd:MD_Metadata><gmd:fileIdentifier><gco:CharacterString>{id}</gco:CharacterString></gmd:fileIdentifier></gmd:MD_Metadata>"
                )
            })
            .collect();
        format!(
            r#"<csw:GetRecordByIdResponse xmlns:csw="{CSW}" xmlns:gmd="{GMD}" xmlns:gco="http://www.isotc211.org/2005/gco">{records}</csw:GetRecordByIdResponse>"#
        )
    }

    #[test]
    fn test_parse_retrieval_response_picks_requested_id() {
        let record = Csw202::new()
            .parse_retrieval_response(&retrieval_xml(&["other", "wanted"]), "wanted")
            .unwrap();
        assert_eq!(record.identifier, "wanted");
    }

    #[test]
    fn test_parse_retrieval_response_not_found() {
        let err = Csw202::new()
            .parse_retrieval_response(&retrieval_xml(&["other"]), "missing-id")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecordNotFound);

        let err = Csw202::new()
            .parse_retrieval_response(&retrieval_xml(&[]), "missing-id")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecordNotFound);
    }

    #[test]
    fn test_parse_retrieval_response_schema_mismatch() {
        let xml = format!(
            r#"<csw:GetRecordByIdResponse xmlns:csw="{CSW}" xmlns:dc="{DC}"><csw:Record><dc:identifier>x</dc:identifier></csw:Record></csw:GetRecordByIdResponse>"#
        );
        let err = Csw202::new().parse_retrieval_response(&xml, "x").unwrap_err();
        assert!(matches!(err, HarvesterError::UnexpectedResponse { .. }));
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_parse_capabilities() {
        let xml = format!(
            r#"<csw:Capabilities xmlns:csw="{CSW}" xmlns:ows="{OWS}" version="2.0.2">
  <ows:ServiceIdentification>
    <ows:Title>Catalogue</ows:Title>
    <ows:ServiceType>CSW</ows:ServiceType>
    <ows:ServiceTypeVersion>2.0.2</ows:ServiceTypeVersion>
  </ows:ServiceIdentification>
</csw:Capabilities>"#
        );
        let caps = Csw202::new().parse_capabilities(&xml).unwrap();
        assert_eq!(
            caps,
            Capabilities {
                service_type: "CSW".to_string(),
                version: "2.0.2".to_string(),
                title: Some("Catalogue".to_string()),
            }
        );

        let bare = format!(r#"<csw:Capabilities xmlns:csw="{CSW}" version="2.0.2"/>"#);
        let caps = Csw202::new().parse_capabilities(&bare).unwrap();
        assert_eq!(caps.version, "2.0.2");
        assert_eq!(caps.title, None);
    }
}
