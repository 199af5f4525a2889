//! Full metadata records and their extraction from ISO 19139 documents.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use roxmltree::Node;
use serde::{Serialize, Serializer};

use crate::xml::{
    character_string, code_list_value, element_children, find_by_path, find_child,
    find_children, get_text, matches_name,
};

/// Type of a citation date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateType {
    Creation,
    Publication,
    Revision,
    Other(String),
}

impl DateType {
    /// Parse from a `CI_DateTypeCode` value.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "creation" => Self::Creation,
            "publication" => Self::Publication,
            "revision" => Self::Revision,
            _ => Self::Other(code.trim().to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Creation => "creation",
            Self::Publication => "publication",
            Self::Revision => "revision",
            Self::Other(code) => code,
        }
    }
}

impl Serialize for DateType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A typed citation date, kept as the server wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateEntry {
    pub date_type: DateType,
    pub value: String,
}

impl DateEntry {
    /// Parse the raw value.
    ///
    /// Accepts `YYYY-MM-DD`, RFC 3339 timestamps (converted to UTC) and
    /// ISO datetimes without offset.
    ///
    /// # Examples
    /// ```
    /// use csw_harvester::record::{DateEntry, DateType};
    ///
    /// let entry = DateEntry { date_type: DateType::Creation, value: "2021-03-04".into() };
    /// assert_eq!(entry.parse().unwrap().to_string(), "2021-03-04 00:00:00");
    /// ```
    #[must_use]
    pub fn parse(&self) -> Option<NaiveDateTime> {
        let value = self.value.trim();
        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return date.and_hms_opt(0, 0, 0);
        }
        if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
            return Some(datetime.naive_utc());
        }
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()
    }
}

/// A group of keywords sharing a type and thesaurus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeywordGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thesaurus: Option<String>,
    pub keywords: Vec<String>,
}

impl KeywordGroup {
    /// Label of the group: its keyword type, else its thesaurus title.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.keyword_type.as_deref().or(self.thesaurus.as_deref())
    }
}

/// A linked online resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnlineResource {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

/// A responsible party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organisation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Full metadata document for one catalogue entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_title: Option<String>,
    /// Citation identifier codes, usually URIs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uri_codes: Vec<String>,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hierarchy_level: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<DateEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<KeywordGroup>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<OnlineResource>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contacts: Vec<Contact>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub topic_categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_version: Option<String>,
}

impl Record {
    /// Title, falling back to the alternate title.
    #[must_use]
    pub fn display_title(&self) -> Option<&str> {
        self.title.as_deref().or(self.alternate_title.as_deref())
    }

    /// First date whose type appears in `types`, trying types in order.
    #[must_use]
    pub fn first_date(&self, types: &[DateType]) -> Option<&DateEntry> {
        types
            .iter()
            .find_map(|t| self.dates.iter().find(|d| &d.date_type == t))
    }

    /// First date of one of `types` that parses, trying types in order.
    ///
    /// Unlike [`Record::first_date`], an entry whose value cannot be read
    /// is skipped and the next type is tried.
    #[must_use]
    pub fn first_parsed_date(&self, types: &[DateType]) -> Option<NaiveDateTime> {
        types.iter().find_map(|t| {
            self.dates
                .iter()
                .filter(|d| &d.date_type == t)
                .find_map(DateEntry::parse)
        })
    }

    /// All keywords of all groups, sorted and de-duplicated.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        self.keywords
            .iter()
            .flat_map(|g| g.keywords.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// File identifier of a `gmd:MD_Metadata` element.
pub fn file_identifier(metadata: Node<'_, '_>) -> Option<String> {
    find_child(metadata, "gmd:fileIdentifier").and_then(character_string)
}

/// Extract a [`Record`] from a `gmd:MD_Metadata` element.
///
/// Missing optional sections leave the corresponding fields empty.
pub fn parse_md_metadata(metadata: Node<'_, '_>) -> Record {
    let mut record = Record {
        identifier: file_identifier(metadata).unwrap_or_default(),
        hierarchy_level: find_child(metadata, "gmd:hierarchyLevel").and_then(code_list_value),
        standard_name: find_child(metadata, "gmd:metadataStandardName").and_then(character_string),
        standard_version: find_child(metadata, "gmd:metadataStandardVersion")
            .and_then(character_string),
        lineage: find_by_path(
            metadata,
            "gmd:dataQualityInfo/gmd:DQ_DataQuality/gmd:lineage/gmd:LI_Lineage/gmd:statement",
        )
        .and_then(character_string),
        ..Record::default()
    };

    // MD_DataIdentification or SV_ServiceIdentification
    if let Some(ident) = find_by_path(metadata, "gmd:identificationInfo/*") {
        parse_identification(ident, &mut record);
    }

    if let Some(distribution) = find_child(metadata, "gmd:distributionInfo") {
        record.resources = distribution
            .descendants()
            .filter(|n| matches_name(*n, "gmd:CI_OnlineResource"))
            .filter_map(parse_online_resource)
            .collect();
    }

    record
}

fn parse_identification(ident: Node<'_, '_>, record: &mut Record) {
    if let Some(citation) = find_by_path(ident, "gmd:citation/gmd:CI_Citation") {
        record.title = find_child(citation, "gmd:title").and_then(character_string);
        record.alternate_title = find_child(citation, "gmd:alternateTitle").and_then(character_string);
        // MD_Identifier or RS_Identifier
        record.uri_codes = find_children(citation, "gmd:identifier")
            .filter_map(|i| element_children(i).next())
            .filter_map(|i| find_child(i, "gmd:code"))
            .filter_map(character_string)
            .collect();
        record.dates = find_children(citation, "gmd:date")
            .filter_map(|d| find_child(d, "gmd:CI_Date"))
            .filter_map(parse_ci_date)
            .collect();
    }

    record.abstract_text = find_child(ident, "gmd:abstract").and_then(character_string);
    record.status = find_child(ident, "gmd:status").and_then(code_list_value);

    record.contacts = find_children(ident, "gmd:pointOfContact")
        .filter_map(|p| find_child(p, "gmd:CI_ResponsibleParty"))
        .map(parse_responsible_party)
        .collect();

    record.keywords = find_children(ident, "gmd:descriptiveKeywords")
        .filter_map(|k| find_child(k, "gmd:MD_Keywords"))
        .map(parse_keywords)
        .filter(|g| !g.keywords.is_empty())
        .collect();

    record.topic_categories = find_children(ident, "gmd:topicCategory")
        .filter_map(|t| element_children(t).next())
        .map(get_text)
        .filter(|s| !s.is_empty())
        .collect();
}

fn parse_ci_date(ci_date: Node<'_, '_>) -> Option<DateEntry> {
    let value = find_child(ci_date, "gmd:date")
        .and_then(|d| element_children(d).next())
        .map(get_text)
        .filter(|s| !s.is_empty())?;
    let date_type = find_child(ci_date, "gmd:dateType")
        .and_then(code_list_value)
        .map_or_else(|| DateType::Other(String::new()), |c| DateType::from_code(&c));
    Some(DateEntry { date_type, value })
}

fn parse_keywords(md_keywords: Node<'_, '_>) -> KeywordGroup {
    KeywordGroup {
        keyword_type: find_child(md_keywords, "gmd:type").and_then(code_list_value),
        thesaurus: find_by_path(md_keywords, "gmd:thesaurusName/gmd:CI_Citation/gmd:title")
            .and_then(character_string),
        keywords: find_children(md_keywords, "gmd:keyword")
            .filter_map(character_string)
            .collect(),
    }
}

fn parse_responsible_party(party: Node<'_, '_>) -> Contact {
    Contact {
        name: find_child(party, "gmd:individualName").and_then(character_string),
        organisation: find_child(party, "gmd:organisationName").and_then(character_string),
        email: find_by_path(
            party,
            "gmd:contactInfo/gmd:CI_Contact/gmd:address/gmd:CI_Address/gmd:electronicMailAddress",
        )
        .and_then(character_string),
        role: find_child(party, "gmd:role").and_then(code_list_value),
    }
}

fn parse_online_resource(resource: Node<'_, '_>) -> Option<OnlineResource> {
    let url = find_by_path(resource, "gmd:linkage/gmd:URL")
        .map(get_text)
        .filter(|s| !s.is_empty())?;
    Some(OnlineResource {
        url,
        name: find_child(resource, "gmd:name").and_then(character_string),
        description: find_child(resource, "gmd:description").and_then(character_string),
        protocol: find_child(resource, "gmd:protocol").and_then(character_string),
    })
}
