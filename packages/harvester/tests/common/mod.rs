//! Fake CSW endpoint and XML fixture builders shared by integration tests.

#![allow(dead_code)]

use csw_harvester::namespaces::{CSW, DC, GCO, GMD, OWS};
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Capabilities document of the fake catalogue.
pub fn capabilities_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<csw:Capabilities xmlns:csw="{CSW}" xmlns:ows="{OWS}" version="2.0.2">
  <ows:ServiceIdentification>
    <ows:Title>Fake catalogue</ows:Title>
    <ows:ServiceType>CSW</ows:ServiceType>
    <ows:ServiceTypeVersion>2.0.2</ows:ServiceTypeVersion>
  </ows:ServiceIdentification>
</csw:Capabilities>"#
    )
}

/// `GetRecordsResponse` listing brief records.
pub fn listing_xml(matched: usize, ids: &[String]) -> String {
    let records: String = ids
        .iter()
        .map(|id| {
            format!(
                "<csw:BriefRecord><dc:identifier>{id}</dc:identifier><dc:title>Record {id}</dc:title><dc:type>dataset</dc:type></csw:BriefRecord>"
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<csw:GetRecordsResponse xmlns:csw="{CSW}" xmlns:dc="{DC}" version="2.0.2">
  <csw:SearchStatus timestamp="2024-05-01T10:00:00Z"/>
  <csw:SearchResults numberOfRecordsMatched="{matched}" numberOfRecordsReturned="{}" elementSet="brief">{records}</csw:SearchResults>
</csw:GetRecordsResponse>"#,
        ids.len()
    )
}

/// ISO 19139 `MD_Metadata` for one record.
pub fn iso_record_xml(id: &str, title: &str) -> String {
    format!(
        r#"<gmd:MD_Metadata>
  <gmd:fileIdentifier><gco:CharacterString>{id}</gco:CharacterString></gmd:fileIdentifier>
  <gmd:hierarchyLevel><gmd:MD_ScopeCode codeList="http://standards.iso.org/iso/19139/resources/gmxCodelists.xml#MD_ScopeCode" codeListValue="dataset"/></gmd:hierarchyLevel>
  <gmd:identificationInfo>
    <gmd:MD_DataIdentification>
      <gmd:citation><gmd:CI_Citation>
        <gmd:title><gco:CharacterString>{title}</gco:CharacterString></gmd:title>
        <gmd:date><gmd:CI_Date>
          <gmd:date><gco:Date>2021-03-15</gco:Date></gmd:date>
          <gmd:dateType><gmd:CI_DateTypeCode codeList="" codeListValue="creation"/></gmd:dateType>
        </gmd:CI_Date></gmd:date>
      </gmd:CI_Citation></gmd:citation>
      <gmd:abstract><gco:CharacterString>Abstract of {id}</gco:CharacterString></gmd:abstract>
      <gmd:descriptiveKeywords><gmd:MD_Keywords>
        <gmd:keyword><gco:CharacterString>water</gco:CharacterString></gmd:keyword>
        <gmd:keyword><gco:CharacterString>environment</gco:CharacterString></gmd:keyword>
      </gmd:MD_Keywords></gmd:descriptiveKeywords>
    </gmd:MD_DataIdentification>
  </gmd:identificationInfo>
  <gmd:distributionInfo><gmd:MD_Distribution><gmd:transferOptions><gmd:MD_DigitalTransferOptions>
    <gmd:onLine><gmd:CI_OnlineResource>
      <gmd:linkage><gmd:URL>https://data.example.com/{id}.zip</gmd:URL></gmd:linkage>
      <gmd:name><gco:CharacterString>Download</gco:CharacterString></gmd:name>
    </gmd:CI_OnlineResource></gmd:onLine>
  </gmd:MD_DigitalTransferOptions></gmd:transferOptions></gmd:MD_Distribution></gmd:distributionInfo>
</gmd:MD_Metadata>"#
    )
}

/// `GetRecordByIdResponse` wrapping the given `MD_Metadata` fragments.
pub fn retrieval_xml(records: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<csw:GetRecordByIdResponse xmlns:csw="{CSW}" xmlns:gmd="{GMD}" xmlns:gco="{GCO}">{}</csw:GetRecordByIdResponse>"#,
        records.concat()
    )
}

/// OWS exception report.
pub fn exception_xml(code: &str, text: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ows:ExceptionReport xmlns:ows="{OWS}" version="1.2.0">
  <ows:Exception exceptionCode="{code}"><ows:ExceptionText>{text}</ows:ExceptionText></ows:Exception>
</ows:ExceptionReport>"#
    )
}

/// Identifier of the n-th record of the fake catalogue.
pub fn record_id(n: usize) -> String {
    format!("rec-{n}")
}

/// `(startPosition, maxRecords)` of a `GetRecords` body.
pub fn paging(body: &[u8]) -> (Option<usize>, usize) {
    let text = std::str::from_utf8(body).unwrap();
    let doc = roxmltree::Document::parse(text).unwrap();
    let root = doc.root_element();
    let start = root
        .attribute("startPosition")
        .map(|s| s.parse().unwrap());
    let max = root.attribute("maxRecords").unwrap().parse().unwrap();
    (start, max)
}

/// Catalogue of `total` records answering `GetRecords` and `GetRecordById`
/// from the request body. `startPosition` is read as a 0-based offset.
pub struct FakeCsw {
    pub total: usize,
    /// Records returned beyond `maxRecords`.
    pub overshoot: usize,
}

impl Respond for FakeCsw {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let text = String::from_utf8_lossy(&request.body);
        let doc = roxmltree::Document::parse(&text).unwrap();
        let root = doc.root_element();

        let body = match root.tag_name().name() {
            "GetRecords" => {
                let (start, max) = paging(&request.body);
                let start = start.unwrap_or(0).min(self.total);
                let end = (start + max + self.overshoot).min(self.total);
                let ids: Vec<String> = (start..end).map(record_id).collect();
                listing_xml(self.total, &ids)
            }
            "GetRecordById" => {
                let records: Vec<String> = root
                    .descendants()
                    .filter(|n| n.has_tag_name((CSW, "Id")))
                    .filter_map(|n| n.text())
                    .filter(|id| {
                        id.strip_prefix("rec-")
                            .and_then(|n| n.parse::<usize>().ok())
                            .is_some_and(|n| n < self.total)
                    })
                    .map(|id| iso_record_xml(id, &format!("Title of {id}")))
                    .collect();
                retrieval_xml(&records)
            }
            other => exception_xml("OperationNotSupported", other),
        };
        ResponseTemplate::new(200).set_body_raw(body, "application/xml")
    }
}

/// Start a fake catalogue holding `total` records.
pub async fn start_catalogue(total: usize, overshoot: usize) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("request", "GetCapabilities"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(capabilities_xml(), "application/xml"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(FakeCsw { total, overshoot })
        .mount(&server)
        .await;
    server
}

/// Bodies of all POST requests the server received, in order.
pub async fn post_bodies(server: &MockServer) -> Vec<Vec<u8>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST")
        .map(|r| r.body)
        .collect()
}

/// Number of GET requests the server received.
pub async fn get_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "GET")
        .count()
}
