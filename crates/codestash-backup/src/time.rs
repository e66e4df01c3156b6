//! Timestamp resolution with a network fallback chain.
//!
//! Sources are tried once each, in priority order, every call bounded by
//! [`SOURCE_TIMEOUT`]. Failures are logged at debug level and never surface:
//! when every source fails the local clock answers with source `system`.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Source tag used when the local clock answers.
pub const SYSTEM_SOURCE: &str = "system";

/// Per-source timeout.
pub const SOURCE_TIMEOUT: Duration = Duration::from_secs(5);

/// A resolved timestamp and the source that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeResult {
    pub datetime: DateTime<Tz>,
    pub source: String,
}

impl TimeResult {
    /// Local system clock in the given timezone.
    pub fn system(tz: Tz) -> Self {
        Self {
            datetime: Utc::now().with_timezone(&tz),
            source: SYSTEM_SOURCE.to_string(),
        }
    }
}

/// A network time source.
#[async_trait]
pub trait TimeSource: Send + Sync {
    /// Tag recorded in [`TimeResult::source`] when this source answers.
    fn name(&self) -> &str;

    /// Fetch the current time converted to `tz`.
    async fn fetch(&self, tz: Tz) -> anyhow::Result<DateTime<Tz>>;
}

/// worldtimeapi.org JSON endpoint.
pub struct WorldTimeApi {
    client: reqwest::Client,
}

impl WorldTimeApi {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TimeSource for WorldTimeApi {
    fn name(&self) -> &str {
        "worldtimeapi.org"
    }

    async fn fetch(&self, tz: Tz) -> anyhow::Result<DateTime<Tz>> {
        let url = format!("https://worldtimeapi.org/api/timezone/{}", tz.name());
        debug!("Fetching time from {}", url);
        let body: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_worldtimeapi(&body, tz)
    }
}

/// timeapi.io structured JSON endpoint.
pub struct TimeApiIo {
    client: reqwest::Client,
}

impl TimeApiIo {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TimeSource for TimeApiIo {
    fn name(&self) -> &str {
        "timeapi.io"
    }

    async fn fetch(&self, tz: Tz) -> anyhow::Result<DateTime<Tz>> {
        let url = format!(
            "https://timeapi.io/api/Time/current/zone?timeZone={}",
            tz.name()
        );
        debug!("Fetching time from {}", url);
        let body: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_timeapi_io(&body, tz)
    }
}

/// `Date` header of a well-known HTTPS endpoint.
pub struct HttpDateHeader {
    client: reqwest::Client,
    url: String,
}

impl HttpDateHeader {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: "https://www.google.com".to_string(),
        }
    }
}

#[async_trait]
impl TimeSource for HttpDateHeader {
    fn name(&self) -> &str {
        "google-header"
    }

    async fn fetch(&self, tz: Tz) -> anyhow::Result<DateTime<Tz>> {
        debug!("Reading Date header from {}", self.url);
        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        let header = response
            .headers()
            .get(reqwest::header::DATE)
            .ok_or_else(|| anyhow!("response has no Date header"))?
            .to_str()
            .context("Date header is not valid ASCII")?;
        parse_http_date(header, tz)
    }
}

/// Parse the `utc_datetime` field of a worldtimeapi.org payload.
///
/// Values without an offset are taken as UTC.
pub fn parse_worldtimeapi(body: &serde_json::Value, tz: Tz) -> anyhow::Result<DateTime<Tz>> {
    let raw = body
        .get("utc_datetime")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("payload has no utc_datetime"))?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&tz));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .with_context(|| format!("unparseable utc_datetime: {}", raw))?;
    Ok(naive.and_utc().with_timezone(&tz))
}

/// Build a datetime from the broken-down fields of a timeapi.io payload.
///
/// The fields are wall-clock values already expressed in `tz`.
pub fn parse_timeapi_io(body: &serde_json::Value, tz: Tz) -> anyhow::Result<DateTime<Tz>> {
    let field = |name: &str| -> anyhow::Result<u32> {
        let value = body
            .get(name)
            .and_then(|v| v.as_u64())
            .ok_or_else(|| anyhow!("payload has no numeric '{}'", name))?;
        u32::try_from(value).with_context(|| format!("'{}' out of range", name))
    };

    let year = i32::try_from(field("year")?).context("'year' out of range")?;
    let date = NaiveDate::from_ymd_opt(year, field("month")?, field("day")?)
        .ok_or_else(|| anyhow!("payload does not describe a valid date"))?;
    let naive = date
        .and_hms_opt(field("hour")?, field("minute")?, field("seconds")?)
        .ok_or_else(|| anyhow!("payload does not describe a valid time"))?;

    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| anyhow!("local time {} does not exist in {}", naive, tz.name()))
}

/// Parse an RFC 2822 HTTP `Date` header.
pub fn parse_http_date(header: &str, tz: Tz) -> anyhow::Result<DateTime<Tz>> {
    let dt = DateTime::parse_from_rfc2822(header)
        .with_context(|| format!("unparseable Date header: {}", header))?;
    Ok(dt.with_timezone(&tz))
}

/// Prioritized chain of time sources.
#[derive(Clone)]
pub struct TimeResolver {
    sources: Vec<Arc<dyn TimeSource>>,
    timeout: Duration,
}

impl TimeResolver {
    /// Default chain: worldtimeapi.org, timeapi.io, then the Google `Date` header.
    pub fn network() -> Self {
        let client = match reqwest::Client::builder().timeout(SOURCE_TIMEOUT).build() {
            Ok(client) => client,
            Err(e) => {
                debug!("HTTP client unavailable, network time disabled: {}", e);
                return Self::with_sources(Vec::new());
            }
        };

        Self::with_sources(vec![
            Arc::new(WorldTimeApi::new(client.clone())),
            Arc::new(TimeApiIo::new(client.clone())),
            Arc::new(HttpDateHeader::new(client)),
        ])
    }

    /// Custom chain, tried in the given order.
    pub fn with_sources(sources: Vec<Arc<dyn TimeSource>>) -> Self {
        Self {
            sources,
            timeout: SOURCE_TIMEOUT,
        }
    }

    /// Override the per-source timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Names of the configured sources, in priority order.
    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Resolve the current time. Never fails.
    pub async fn resolve(&self, tz: Tz, use_network_time: bool) -> TimeResult {
        if use_network_time {
            for source in &self.sources {
                match tokio::time::timeout(self.timeout, source.fetch(tz)).await {
                    Ok(Ok(datetime)) => {
                        return TimeResult {
                            datetime,
                            source: source.name().to_string(),
                        }
                    }
                    Ok(Err(e)) => debug!("{} failed: {:#}", source.name(), e),
                    Err(_) => debug!(
                        "{} timed out after {}s",
                        source.name(),
                        self.timeout.as_secs_f64()
                    ),
                }
            }
        }

        TimeResult::system(tz)
    }
}

impl std::fmt::Debug for TimeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeResolver")
            .field("sources", &self.source_names())
            .field("timeout", &self.timeout)
            .finish()
    }
}
