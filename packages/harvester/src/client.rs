//! Catalogue client: the public entry point for harvesting.

use std::fmt;

use crate::config::{validate_endpoint_url, validate_page_size, SourceConfig, CSW_VERSION};
use crate::error::Result;
use crate::filter::{translate, FilterExpression};
use crate::http::{HttpTransport, Transport};
use crate::pagination::RecordIds;
use crate::protocol::{CatalogProtocol, Capabilities, Csw202};
use crate::record::Record;

/// Client bound to one catalogue endpoint.
///
/// The client holds no traversal state: every [`get_ids`](Self::get_ids)
/// call gets its own cursor, and [`get_record`](Self::get_record) may be
/// called from several threads at once.
///
/// # Example
///
/// ```no_run
/// use csw_harvester::CatalogClient;
///
/// let client = CatalogClient::new("https://example.com/csw", false)?;
/// for id in client.get_ids(None, 10, 0)? {
///     let record = client.get_record(&id?)?;
///     println!("{}", record.display_title().unwrap_or("untitled"));
/// }
/// # Ok::<(), csw_harvester::HarvesterError>(())
/// ```
pub struct CatalogClient<P: CatalogProtocol = Csw202, T: Transport = HttpTransport> {
    url: String,
    capabilities: Option<Capabilities>,
    protocol: P,
    transport: T,
}

impl<P: CatalogProtocol, T: Transport> fmt::Debug for CatalogClient<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogClient")
            .field("url", &self.url)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Connect to a CSW 2.0.2 endpoint over HTTP.
    ///
    /// Unless `skip_caps` is set, the service capabilities are fetched
    /// once here.
    pub fn new(url: &str, skip_caps: bool) -> Result<Self> {
        Self::with_parts(url, skip_caps, Csw202::new(), HttpTransport::new()?)
    }

    /// Client for a configured harvest source.
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        Self::new(&config.url, config.skip_caps)
    }
}

impl<P: CatalogProtocol, T: Transport> CatalogClient<P, T> {
    /// Client with an explicit protocol and transport.
    pub fn with_parts(url: &str, skip_caps: bool, protocol: P, transport: T) -> Result<Self> {
        validate_endpoint_url(url)?;
        let mut client = Self {
            url: url.to_string(),
            capabilities: None,
            protocol,
            transport,
        };
        if skip_caps {
            tracing::debug!(url, "Skipping capabilities discovery");
        } else {
            client.capabilities = Some(client.discover()?);
        }
        Ok(client)
    }

    fn discover(&self) -> Result<Capabilities> {
        let body = self
            .transport
            .get(&self.url, &self.protocol.capabilities_query())?;
        let caps = self.protocol.parse_capabilities(&body)?;
        tracing::info!(
            url = %self.url,
            service = %caps.service_type,
            version = %caps.version,
            title = caps.title.as_deref().unwrap_or(""),
            "Discovered catalogue capabilities"
        );
        if caps.version != CSW_VERSION {
            tracing::warn!(
                version = %caps.version,
                expected = CSW_VERSION,
                "Catalogue advertises another protocol version"
            );
        }
        Ok(caps)
    }

    /// Endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Capabilities discovered at construction, if discovery ran.
    #[must_use]
    pub fn capabilities(&self) -> Option<&Capabilities> {
        self.capabilities.as_ref()
    }

    /// Lazily list record identifiers.
    ///
    /// `limit` of 0 means unbounded. The page size is checked here, before
    /// any request is made; pages are fetched as the sequence is consumed.
    pub fn get_ids(
        &self,
        filter: Option<FilterExpression>,
        page_size: usize,
        limit: usize,
    ) -> Result<RecordIds<'_, P, T>> {
        validate_page_size(page_size)?;
        tracing::debug!(url = %self.url, page_size, limit, filtered = filter.is_some(), "Listing identifiers");
        Ok(RecordIds::new(
            &self.protocol,
            &self.transport,
            &self.url,
            filter,
            page_size,
            limit,
        ))
    }

    /// [`get_ids`](Self::get_ids) with raw filter specifications, combined
    /// with `Or` when there are several.
    pub fn get_ids_matching<S: AsRef<str>>(
        &self,
        specs: &[S],
        page_size: usize,
        limit: usize,
    ) -> Result<RecordIds<'_, P, T>> {
        validate_page_size(page_size)?;
        let filter = translate(specs)?;
        self.get_ids(filter, page_size, limit)
    }

    /// Identifiers for a configured source, using its filters and paging.
    pub fn get_ids_for(&self, config: &SourceConfig) -> Result<RecordIds<'_, P, T>> {
        self.get_ids(config.filter()?, config.page_size, config.limit)
    }

    /// Fetch one full record.
    pub fn get_record(&self, id: &str) -> Result<Record> {
        tracing::debug!(id, "Fetching record");
        let body = self.protocol.build_retrieval_request(id)?;
        let response = self.transport.post_xml(&self.url, body)?;
        self.protocol.parse_retrieval_response(&response, id)
    }
}
