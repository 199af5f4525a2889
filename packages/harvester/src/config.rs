//! Configuration constants, validation, and the harvest source configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{HarvesterError, Result};
use crate::filter::{translate, FilterExpression};

/// Default number of records requested per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// HTTP timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Protocol version sent with every request.
pub const CSW_VERSION: &str = "2.0.2";

/// Output schema of listing requests (brief Dublin Core records).
pub const LISTING_OUTPUT_SCHEMA: &str = "http://www.opengis.net/cat/csw/2.0.2";

/// Output schema of retrieval requests (ISO 19139 records).
pub const RECORD_OUTPUT_SCHEMA: &str = "http://www.isotc211.org/2005/gmd";

/// Filter entry key holding an OGC filter specification.
pub const OGC_FILTERS_KEY: &str = "ogc_filters";

/// Validate a listing page size.
///
/// # Examples
/// ```
/// use csw_harvester::config::validate_page_size;
///
/// assert!(validate_page_size(1).is_ok());
/// assert!(validate_page_size(0).is_err());
/// ```
pub fn validate_page_size(page_size: usize) -> Result<()> {
    if page_size < 1 {
        return Err(HarvesterError::InvalidPageSize(page_size));
    }
    Ok(())
}

/// Validate a catalogue endpoint URL.
///
/// # Returns
/// The parsed URL if it is an absolute `http` or `https` URL
///
/// # Examples
/// ```
/// use csw_harvester::config::validate_endpoint_url;
///
/// assert!(validate_endpoint_url("https://example.com/csw").is_ok());
/// assert!(validate_endpoint_url("ftp://example.com/csw").is_err());
/// assert!(validate_endpoint_url("not a url").is_err());
/// ```
pub fn validate_endpoint_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| HarvesterError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(HarvesterError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{scheme}'"),
        }),
    }
}

/// Whether a filter entry selects or excludes records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    #[default]
    Include,
    Exclude,
}

/// One configured filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterEntry {
    pub key: String,
    pub value: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<FilterType>,
}

impl FilterEntry {
    /// An `ogc_filters` entry.
    #[must_use]
    pub fn ogc(value: impl Into<String>) -> Self {
        Self {
            key: OGC_FILTERS_KEY.to_string(),
            value: value.into(),
            filter_type: None,
        }
    }
}

/// A harvest source as configured by the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    #[serde(default)]
    pub skip_caps: bool,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Maximum number of identifiers; 0 means unbounded.
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub filters: Vec<FilterEntry>,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl SourceConfig {
    /// Source with default paging and no filters.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            skip_caps: false,
            page_size: DEFAULT_PAGE_SIZE,
            limit: 0,
            filters: Vec::new(),
        }
    }

    /// Parse and validate a YAML configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Check URL, page size and every filter specification.
    pub fn validate(&self) -> Result<()> {
        validate_endpoint_url(&self.url)?;
        validate_page_size(self.page_size)?;
        self.filter()?;
        Ok(())
    }

    /// Filter specifications that apply, in configuration order.
    ///
    /// Only `ogc_filters` entries count; `exclude` entries are skipped.
    #[must_use]
    pub fn filter_specs(&self) -> Vec<&str> {
        self.filters
            .iter()
            .filter(|f| {
                if f.key != OGC_FILTERS_KEY {
                    tracing::debug!(key = %f.key, "Ignoring filter with unsupported key");
                    return false;
                }
                if f.filter_type == Some(FilterType::Exclude) {
                    tracing::warn!(value = %f.value, "Skipping exclude filter, not supported for CSW");
                    return false;
                }
                true
            })
            .map(|f| f.value.as_str())
            .collect()
    }

    /// Translate the applicable filter specifications.
    pub fn filter(&self) -> Result<Option<FilterExpression>> {
        translate(&self.filter_specs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validate_page_size() {
        assert!(validate_page_size(1).is_ok());
        assert!(validate_page_size(500).is_ok());
        assert!(matches!(
            validate_page_size(0),
            Err(HarvesterError::InvalidPageSize(0))
        ));
    }

    #[test]
    fn test_validate_endpoint_url() {
        assert!(validate_endpoint_url("http://www.example.com/csw").is_ok());
        assert!(validate_endpoint_url("https://example.com/geonetwork/srv/fre/csw").is_ok());

        let err = validate_endpoint_url("/relative/csw").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(validate_endpoint_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_source_config_from_yaml_defaults() {
        let config = SourceConfig::from_yaml_str("url: http://www.example.com/csw\n").unwrap();
        assert_eq!(config, SourceConfig::new("http://www.example.com/csw"));
        assert_eq!(config.filter().unwrap(), None);
    }

    #[test]
    fn test_source_config_filter_specs() {
        let yaml = r#"
url: http://www.example.com/csw
skip_caps: true
page_size: 25
limit: 100
filters:
  - key: ogc_filters
    value: "PropertyIsEqualTo('dc:type', 'dataset')"
  - key: tags
    value: environment
  - key: ogc_filters
    value: "PropertyIsNull('dc:title')"
    type: exclude
  - key: ogc_filters
    value: "PropertyIsLike('dc:title', '%eau%')"
    type: include
"#;
        let config = SourceConfig::from_yaml_str(yaml).unwrap();

        assert!(config.skip_caps);
        assert_eq!(config.page_size, 25);
        assert_eq!(config.limit, 100);
        assert_eq!(
            config.filter_specs(),
            vec![
                "PropertyIsEqualTo('dc:type', 'dataset')",
                "PropertyIsLike('dc:title', '%eau%')"
            ]
        );
        assert!(matches!(config.filter().unwrap(), Some(FilterExpression::Or(c)) if c.len() == 2));
    }

    #[test]
    fn test_source_config_rejects_bad_values() {
        let bad_page = "url: http://www.example.com/csw\npage_size: 0\n";
        assert!(matches!(
            SourceConfig::from_yaml_str(bad_page),
            Err(HarvesterError::InvalidPageSize(0))
        ));

        let bad_filter = r#"
url: http://www.example.com/csw
filters:
  - key: ogc_filters
    value: "__import__('os')"
"#;
        let err = SourceConfig::from_yaml_str(bad_filter).unwrap_err();
        assert!(matches!(err, HarvesterError::InvalidFilter { .. }));

        let err = SourceConfig::from_yaml_str("page_size: [").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_filter_entry_ogc() {
        let entry = FilterEntry::ogc("PropertyIsNull('dc:title')");
        assert_eq!(entry.key, OGC_FILTERS_KEY);
        assert_eq!(entry.filter_type, None);
    }
}
