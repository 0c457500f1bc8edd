//! Calendar aggregation: fetch every configured source, parse it, and
//! merge the resulting busy intervals.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use futures_util::future::join_all;
use tracing::{debug, warn};

use super::ical::{self, CalendarEntry, EventTime};
use crate::models::calendar::{BusyInterval, CalendarSource, SourceKind, SourceStatus};
use crate::{AppError, Result};

/// Boxed future returned by [`FeedFetcher`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>>;

/// Retrieves the raw bytes of a calendar source.
pub trait FeedFetcher: Send + Sync {
    /// Fetch the document behind `source`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Fetch` when the source cannot be read.
    fn fetch<'a>(&'a self, source: &'a CalendarSource) -> FetchFuture<'a>;
}

/// Production fetcher: HTTP(S) for `url` sources, the file system for `file`.
#[derive(Clone)]
pub struct HttpFeedFetcher {
    client: reqwest::Client,
}

impl HttpFeedFetcher {
    /// Build a fetcher whose HTTP requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client })
    }
}

impl FeedFetcher for HttpFeedFetcher {
    fn fetch<'a>(&'a self, source: &'a CalendarSource) -> FetchFuture<'a> {
        Box::pin(async move {
            match source.source_type {
                SourceKind::Url => {
                    let url = feed_url(&source.source_value);
                    debug!(%url, "fetching calendar feed");
                    let response = self.client.get(&url).send().await?.error_for_status()?;
                    Ok(response.bytes().await?.to_vec())
                }
                SourceKind::File => tokio::fs::read(&source.source_value).await.map_err(|err| {
                    AppError::Fetch(format!("cannot read '{}': {err}", source.source_value))
                }),
            }
        })
    }
}

/// Rewrite a `webcal://` subscription link to the `https://` URL serving it.
#[must_use]
pub fn feed_url(location: &str) -> String {
    let trimmed = location.trim();
    match trimmed.get(..9) {
        Some(scheme) if scheme.eq_ignore_ascii_case("webcal://") => {
            format!("https://{}", &trimmed[9..])
        }
        _ => trimmed.to_owned(),
    }
}

/// Busy intervals of every `VEVENT` carrying both `DTSTART` and `DTEND`.
///
/// Zero-length events are kept; they still split the work window.
#[must_use]
pub fn event_intervals(entries: &[CalendarEntry]) -> Vec<BusyInterval> {
    entries
        .iter()
        .filter(|entry| entry.is_event())
        .filter_map(|entry| Some(normalize(entry.start?, entry.end?)))
        .collect()
}

/// Convert event bounds to naive instants.
///
/// A whole-day start becomes `00:00` of its date and a whole-day end
/// becomes `23:59` of its own date, so `20250601..20250602` blocks both
/// June 1st and June 2nd.
#[must_use]
pub fn normalize(start: EventTime, end: EventTime) -> BusyInterval {
    let start_at = match start {
        EventTime::DateTime(ts) => ts,
        EventTime::Date(day) => day.and_time(NaiveTime::MIN),
    };
    let end_at = match end {
        EventTime::DateTime(ts) => ts,
        EventTime::Date(day) => end_of_day(day),
    };
    BusyInterval::new(start_at, end_at)
}

fn end_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN))
}

/// Fetch and parse one source, bounded by `timeout`.
///
/// # Errors
///
/// Returns `AppError::Fetch` on read failure or timeout and
/// `AppError::Parse` when the document is not iCalendar.
pub async fn read_source(
    fetcher: &dyn FeedFetcher,
    source: &CalendarSource,
    timeout: Duration,
) -> Result<Vec<BusyInterval>> {
    let bytes = tokio::time::timeout(timeout, fetcher.fetch(source))
        .await
        .map_err(|_| {
            AppError::Fetch(format!(
                "timed out after {}s reading '{}'",
                timeout.as_secs(),
                source.source_value
            ))
        })??;
    let entries = ical::parse(&bytes)?;
    Ok(event_intervals(&entries))
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    /// Busy intervals of every readable source, in source order.
    pub intervals: Vec<BusyInterval>,
    /// One status per source, in source order.
    pub statuses: Vec<SourceStatus>,
}

/// Read all sources concurrently and merge their busy intervals.
///
/// A source that fails to fetch, parse, or answer within `timeout`
/// contributes nothing; its failure is logged and recorded in its status.
/// Overlaps between sources are left to the free-slot sweep.
pub async fn fetch_busy_intervals(
    fetcher: &dyn FeedFetcher,
    sources: &[CalendarSource],
    timeout: Duration,
) -> Aggregate {
    let results = join_all(
        sources
            .iter()
            .map(|source| read_source(fetcher, source, timeout)),
    )
    .await;

    let mut aggregate = Aggregate::default();
    for (source, result) in sources.iter().zip(results) {
        match result {
            Ok(intervals) => {
                aggregate.statuses.push(SourceStatus::ok(source, intervals.len()));
                aggregate.intervals.extend(intervals);
            }
            Err(err) => {
                warn!(source_id = source.id, source = source.display_name(), %err, "skipping calendar source");
                aggregate.statuses.push(SourceStatus::failed(source, err.to_string()));
            }
        }
    }
    aggregate
}

/// Fetch and parse a single source, surfacing errors instead of skipping.
///
/// Returns the number of `VEVENT` components in the document.
///
/// # Errors
///
/// Returns `AppError::Fetch` or `AppError::Parse`.
pub async fn test_source(
    fetcher: &dyn FeedFetcher,
    source: &CalendarSource,
    timeout: Duration,
) -> Result<usize> {
    let bytes = tokio::time::timeout(timeout, fetcher.fetch(source))
        .await
        .map_err(|_| AppError::Fetch(format!("timed out after {}s", timeout.as_secs())))??;
    let entries = ical::parse(&bytes)?;
    Ok(entries.iter().filter(|e| e.is_event()).count())
}
