//! Device position sources.
//!
//! A [`PositionSource`] answers "where is the viewer now" as a one-shot
//! future. Sources accept a staleness tolerance: a reading no older than
//! `max_age` may be returned instead of taking a new measurement.

use crate::error::GeolocationError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Default staleness tolerance for position readings.
pub const MAX_POSITION_AGE: Duration = Duration::from_millis(10_000);

/// A position reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: DateTime<Utc>,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64, observed_at: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            observed_at,
        }
    }

    /// A reading taken right now.
    pub fn now(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, Utc::now())
    }

    /// Age of the reading at `now`. Readings from the future count as fresh.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.observed_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the reading is within the staleness tolerance at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age_at(now) <= max_age
    }
}

/// Asynchronous provider of the viewer's position.
///
/// Implementations resolve exactly once per call, either with a position or
/// a [`GeolocationError`]. Callers do not retry on failure.
pub trait PositionSource: Send + Sync {
    /// Query the current position, accepting a reading up to `max_age` old.
    fn current_position(
        &self,
        max_age: Duration,
    ) -> impl Future<Output = Result<Position, GeolocationError>> + Send;
}

/// Always reports the same coordinates, stamped with the query time.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition {
    pub latitude: f64,
    pub longitude: f64,
}

impl FixedPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl PositionSource for FixedPosition {
    async fn current_position(&self, _max_age: Duration) -> Result<Position, GeolocationError> {
        Ok(Position::now(self.latitude, self.longitude))
    }
}

/// JSON fix as written by an external location daemon.
#[derive(Debug, Deserialize)]
struct PositionFix {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

/// Reads the latest fix from a JSON file kept up to date by another process.
///
/// A fix whose `timestamp` is older than `max_age` is rejected as
/// unavailable, so a dead writer cannot keep serving an old position. Fixes
/// without a timestamp are taken as current.
#[derive(Debug, Clone)]
pub struct FilePositionSource {
    path: PathBuf,
    timeout: Duration,
}

impl FilePositionSource {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }
}

impl PositionSource for FilePositionSource {
    async fn current_position(&self, max_age: Duration) -> Result<Position, GeolocationError> {
        let read = tokio::time::timeout(self.timeout, tokio::fs::read(&self.path))
            .await
            .map_err(|_| GeolocationError::Timeout)?;

        let bytes = read.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => GeolocationError::Unavailable(format!(
                "no position fix at {}",
                self.path.display()
            )),
            std::io::ErrorKind::PermissionDenied => {
                GeolocationError::PermissionDenied(format!("{}: {e}", self.path.display()))
            }
            _ => GeolocationError::Unavailable(e.to_string()),
        })?;

        let fix: PositionFix = serde_json::from_slice(&bytes)
            .map_err(|e| GeolocationError::Unavailable(format!("malformed position fix: {e}")))?;

        let now = Utc::now();
        let position = Position::new(fix.latitude, fix.longitude, fix.timestamp.unwrap_or(now));
        if !position.is_fresh(now, max_age) {
            return Err(GeolocationError::Unavailable(format!(
                "position fix is {}s old, limit is {}s",
                position.age_at(now).as_secs(),
                max_age.as_secs()
            )));
        }
        Ok(position)
    }
}

/// Remembers the last reading and serves it while it is younger than `max_age`.
#[derive(Debug)]
pub struct CachedPositionSource<S> {
    inner: S,
    last: Mutex<Option<Position>>,
}

impl<S> CachedPositionSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            last: Mutex::new(None),
        }
    }

    fn cached(&self, now: DateTime<Utc>, max_age: Duration) -> Option<Position> {
        let last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        (*last).filter(|position| position.is_fresh(now, max_age))
    }

    fn remember(&self, position: Position) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(position);
    }
}

impl<S: PositionSource> PositionSource for CachedPositionSource<S> {
    async fn current_position(&self, max_age: Duration) -> Result<Position, GeolocationError> {
        if let Some(position) = self.cached(Utc::now(), max_age) {
            debug!("serving cached position reading");
            return Ok(position);
        }

        let position = self.inner.current_position(max_age).await?;
        self.remember(position);
        Ok(position)
    }
}

/// Position source selected from configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredSource {
    Fixed(FixedPosition),
    File(FilePositionSource),
}

impl PositionSource for ConfiguredSource {
    async fn current_position(&self, max_age: Duration) -> Result<Position, GeolocationError> {
        match self {
            Self::Fixed(source) => source.current_position(max_age).await,
            Self::File(source) => source.current_position(max_age).await,
        }
    }
}

/// Parse `"lat,lon"`: two floats separated by a comma.
pub fn parse_lat_lon(input: &str) -> Option<(f64, f64)> {
    let (lat, lon) = input.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lon = lon.trim().parse::<f64>().ok()?;
    Some((lat, lon))
}
