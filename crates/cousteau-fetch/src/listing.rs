//! Paginated listing of collection endpoints.

use std::collections::VecDeque;

use cousteau_types::{CousteauError, Entity, Filters, Measurement, Probe};
use futures::stream::{self, Stream, TryStreamExt};
use serde_json::Value;
use tracing::debug;

use crate::AtlasClient;
use crate::url::{build_query_url, build_split_urls, normalize_next_url};

/// Serialized length of the id filter above which it is split up.
pub const URL_LENGTH_LIMIT: usize = 5000;

/// Number of ids per split request.
pub const CHUNK_SIZE: usize = 500;

/// A collection endpoint and how its listing is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Collection path with trailing slash.
    pub path: &'static str,
    /// Filter holding an id list, split when too long.
    pub id_filter: &'static str,
    /// Ids per split request.
    pub chunk_size: usize,
    /// Id filter length that triggers splitting.
    pub url_length_limit: usize,
}

impl Endpoint {
    /// Probe listing.
    pub const PROBES: Self = Self::new("/api/v2/probes/", "id__in");
    /// Measurement listing.
    pub const MEASUREMENTS: Self = Self::new("/api/v2/measurements/", "id__in");
    /// Anchor listing.
    pub const ANCHORS: Self = Self::new("/api/v2/anchors/", "id__in");

    /// Creates an endpoint with the default chunking parameters.
    #[must_use]
    pub const fn new(path: &'static str, id_filter: &'static str) -> Self {
        Self {
            path,
            id_filter,
            chunk_size: CHUNK_SIZE,
            url_length_limit: URL_LENGTH_LIMIT,
        }
    }

    /// Overrides the number of ids per split request.
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Overrides the id filter length that triggers splitting.
    #[must_use]
    pub const fn with_url_length_limit(mut self, limit: usize) -> Self {
        self.url_length_limit = limit;
        self
    }
}

/// Lazy, forward-only listing of the records of a collection endpoint.
///
/// Pages are fetched one at a time as records are consumed. An id filter
/// longer than [`Endpoint::url_length_limit`] is split into several
/// segments, each paginated to the end before the next one starts.
///
/// # Example
///
/// ```no_run
/// use cousteau_fetch::{AtlasClient, Listing};
/// use cousteau_types::Filters;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = AtlasClient::with_defaults()?;
/// let filters = Filters::new().with("country_code", "GR").with("status", 1);
///
/// let mut probes = Listing::probes(&client, filters);
/// while let Some(probe) = probes.next().await? {
///     println!("{}", probe["id"]);
/// }
/// println!("{} probes", probes.total_count());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Listing<'a> {
    client: &'a AtlasClient,
    endpoint: Endpoint,
    current_url: Option<String>,
    split_urls: VecDeque<String>,
    current_batch: VecDeque<Value>,
    counts: Vec<u64>,
    segment_counted: bool,
}

impl<'a> Listing<'a> {
    /// Creates a listing; no request is made until the first record is read.
    #[must_use]
    pub fn new(client: &'a AtlasClient, endpoint: Endpoint, filters: Filters) -> Self {
        let mut filters = filters.normalized();
        let mut split_urls = VecDeque::new();

        let id_position = filters
            .iter()
            .position(|(name, value)| {
                name == endpoint.id_filter && value.len() > endpoint.url_length_limit
            });
        let current_url = match id_position {
            Some(position) => {
                let (_, ids) = filters.remove(position);
                split_urls.extend(build_split_urls(
                    endpoint.path,
                    endpoint.id_filter,
                    &ids,
                    &filters,
                    endpoint.chunk_size,
                ));
                debug!(
                    path = endpoint.path,
                    segments = split_urls.len(),
                    "id filter too long, splitting request"
                );
                split_urls.pop_front()
            }
            None => Some(build_query_url(endpoint.path, &filters)),
        };

        Self {
            client,
            endpoint,
            current_url,
            split_urls,
            current_batch: VecDeque::new(),
            counts: Vec::new(),
            segment_counted: false,
        }
    }

    /// Lists probes.
    #[must_use]
    pub fn probes(client: &'a AtlasClient, filters: Filters) -> Self {
        Self::new(client, Endpoint::PROBES, filters)
    }

    /// Lists measurements.
    #[must_use]
    pub fn measurements(client: &'a AtlasClient, filters: Filters) -> Self {
        Self::new(client, Endpoint::MEASUREMENTS, filters)
    }

    /// Lists anchors.
    #[must_use]
    pub fn anchors(client: &'a AtlasClient, filters: Filters) -> Self {
        Self::new(client, Endpoint::ANCHORS, filters)
    }

    /// Returns the endpoint being listed.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the URL of the next page to fetch, if any.
    #[must_use]
    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// Returns the URLs of the segments not yet started.
    pub fn pending_segments(&self) -> impl Iterator<Item = &str> {
        self.split_urls.iter().map(String::as_str)
    }

    /// Returns the sum of the counts reported so far, one per segment.
    ///
    /// Only final once the listing has been consumed.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Returns the next record, fetching pages as needed.
    ///
    /// # Errors
    ///
    /// A not-ok page ends the listing with [`CousteauError::ApiResponse`];
    /// a transport failure with [`CousteauError::Http`].
    #[allow(clippy::should_implement_trait)]
    pub async fn next(&mut self) -> Result<Option<Value>, CousteauError> {
        while self.current_batch.is_empty() {
            let Some(url) = self.current_url.take() else {
                return Ok(None);
            };
            self.next_batch(&url).await?;
        }
        Ok(self.current_batch.pop_front())
    }

    async fn next_batch(&mut self, url: &str) -> Result<(), CousteauError> {
        let page = self.client.get(url, &[]).await?.into_json();

        if let Some(count) = page.get("count").and_then(Value::as_u64) {
            self.record_count(count);
        }
        self.current_url = self.next_url(url, page.get("next").and_then(Value::as_str))?;
        self.current_batch = page
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
            .into();
        Ok(())
    }

    /// Every segment reports the size of the whole segment on each of its
    /// pages, so only its first page is counted.
    fn record_count(&mut self, count: u64) {
        if !self.segment_counted {
            self.counts.push(count);
            self.segment_counted = true;
        }
    }

    /// Picks the page after `current`: the server's `next` link, else the
    /// first page of the next id filter segment.
    fn next_url(
        &mut self,
        current: &str,
        next: Option<&str>,
    ) -> Result<Option<String>, CousteauError> {
        if let Some(next) = next.filter(|next| !next.is_empty()) {
            return normalize_next_url(current, next).map(Some).ok_or_else(|| {
                CousteauError::Generic(format!("unusable next page link <{next}>"))
            });
        }
        let Some(url) = self.split_urls.pop_front() else {
            return Ok(None);
        };
        debug!(
            remaining = self.split_urls.len(),
            "starting next id filter segment"
        );
        self.segment_counted = false;
        Ok(Some(url))
    }

    /// Converts the listing into a stream of raw records.
    pub fn into_stream(self) -> impl Stream<Item = Result<Value, CousteauError>> + 'a {
        stream::try_unfold(self, |mut listing| async move {
            Ok(listing.next().await?.map(|record| (record, listing)))
        })
    }

    /// Converts the listing into a stream of typed entities.
    pub fn into_objects<T: Entity + 'a>(self) -> impl Stream<Item = Result<T, CousteauError>> + 'a {
        self.into_stream()
            .map_ok(|meta| T::from_metadata(None, meta))
    }
}

/// Streams probes matching `filters` as [`Probe`] records.
pub fn probe_stream(
    client: &AtlasClient,
    filters: Filters,
) -> impl Stream<Item = Result<Probe, CousteauError>> + '_ {
    Listing::probes(client, filters).into_objects()
}

/// Streams measurements matching `filters` as [`Measurement`] records.
pub fn measurement_stream(
    client: &AtlasClient,
    filters: Filters,
) -> impl Stream<Item = Result<Measurement, CousteauError>> + '_ {
    Listing::measurements(client, filters).into_objects()
}
