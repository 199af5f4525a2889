//! Paginated listing of record identifiers.
//!
//! [`RecordIds`] pulls one listing page at a time, and only when its
//! buffer runs dry. The server-reported match count bounds the traversal
//! after the first page, so a catalogue that shrinks mid-harvest ends the
//! iteration early instead of requesting empty pages.

use std::collections::VecDeque;

use crate::error::Result;
use crate::filter::FilterExpression;
use crate::http::Transport;
use crate::protocol::{CatalogProtocol, ListingRequest};

/// Mutable state of one traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestCursor {
    /// Identifiers yielded so far.
    pub fetched: usize,
    /// Upper bound on identifiers; `None` until a limit or match count is known.
    pub effective_limit: Option<usize>,
    pub page_size: usize,
}

impl HarvestCursor {
    /// Fresh cursor. A `limit` of 0 means unbounded.
    #[must_use]
    pub fn new(page_size: usize, limit: usize) -> Self {
        Self {
            fetched: 0,
            effective_limit: (limit > 0).then_some(limit),
            page_size,
        }
    }

    /// Identifiers still allowed before the limit is reached.
    #[must_use]
    pub fn remaining(&self) -> Option<usize> {
        self.effective_limit.map(|l| l.saturating_sub(self.fetched))
    }

    /// Number of records to request next.
    #[must_use]
    pub fn request_size(&self) -> usize {
        self.remaining()
            .map_or(self.page_size, |r| r.min(self.page_size))
    }

    /// Offset of the next unseen record; absent on the first request.
    #[must_use]
    pub fn start_position(&self) -> Option<usize> {
        (self.fetched > 0).then_some(self.fetched)
    }

    /// Lower the bound to the server-reported match count.
    pub fn narrow(&mut self, matched: usize) {
        self.effective_limit = Some(self.effective_limit.map_or(matched, |l| l.min(matched)));
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == Some(0)
    }
}

/// Lazy, single-pass sequence of record identifiers.
///
/// Each call to `next` that finds the buffer empty performs exactly one
/// listing round trip. After an error the iterator is finished.
pub struct RecordIds<'a, P: CatalogProtocol, T: Transport> {
    protocol: &'a P,
    transport: &'a T,
    url: &'a str,
    filter: Option<FilterExpression>,
    cursor: HarvestCursor,
    buffer: VecDeque<String>,
    pages: usize,
    done: bool,
}

impl<'a, P: CatalogProtocol, T: Transport> RecordIds<'a, P, T> {
    /// Prepare a traversal. Nothing is sent until the first `next`.
    ///
    /// `page_size` must already be validated.
    pub fn new(
        protocol: &'a P,
        transport: &'a T,
        url: &'a str,
        filter: Option<FilterExpression>,
        page_size: usize,
        limit: usize,
    ) -> Self {
        Self {
            protocol,
            transport,
            url,
            filter,
            cursor: HarvestCursor::new(page_size, limit),
            buffer: VecDeque::new(),
            pages: 0,
            done: false,
        }
    }

    #[must_use]
    pub fn cursor(&self) -> &HarvestCursor {
        &self.cursor
    }

    /// Listing requests issued so far.
    #[must_use]
    pub fn pages_requested(&self) -> usize {
        self.pages
    }

    fn fetch_page(&mut self) -> Result<()> {
        if self.cursor.is_exhausted() {
            self.done = true;
            return Ok(());
        }

        let request = ListingRequest {
            start_position: self.cursor.start_position(),
            max_records: self.cursor.request_size(),
            filter: self.filter.as_ref(),
        };
        tracing::debug!(
            start_position = ?request.start_position,
            max_records = request.max_records,
            "Requesting listing page"
        );
        let body = self.protocol.build_listing_request(&request)?;
        self.pages += 1;
        let response = self.transport.post_xml(self.url, body)?;
        let page = self.protocol.parse_listing_response(&response)?;

        if page.returned_count == 0 {
            tracing::debug!(matched = page.matched_count, "Empty page, listing complete");
            self.done = true;
            return Ok(());
        }

        self.cursor.narrow(page.matched_count);
        let allowed = request
            .max_records
            .min(self.cursor.remaining().unwrap_or(usize::MAX));
        let mut ids = page.record_ids;
        if ids.len() > allowed {
            tracing::warn!(
                returned = ids.len(),
                requested = request.max_records,
                kept = allowed,
                "Server returned more records than requested, truncating page"
            );
            ids.truncate(allowed);
        }

        self.cursor.fetched += ids.len();
        tracing::info!(
            page = self.pages,
            returned = page.returned_count,
            matched = page.matched_count,
            next_record = ?page.next_record,
            fetched = self.cursor.fetched,
            "Listing page received"
        );

        // A page that yields nothing cannot advance the offset.
        if ids.is_empty() || self.cursor.is_exhausted() {
            self.done = true;
        }
        self.buffer.extend(ids);
        Ok(())
    }
}

impl<P: CatalogProtocol, T: Transport> Iterator for RecordIds<'_, P, T> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(id) = self.buffer.pop_front() {
                return Some(Ok(id));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.fetch_page() {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}
