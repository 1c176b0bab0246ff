//! Persisted model types.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Status assigned to a project that has never been probed.
pub const STATUS_PENDING: &str = "Checking...";

/// Category used when none is supplied.
pub const DEFAULT_CATEGORY: &str = "General";

/// A monitored endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(with = "timestamp", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp::option", default)]
    pub last_ping: Option<DateTime<Utc>>,
    #[serde(default = "default_status")]
    pub status: String,
}

impl Project {
    /// Build a fresh, active project that has not been probed yet.
    pub fn new(id: String, name: String, url: String, category: String) -> Self {
        Self {
            id,
            name,
            url,
            category,
            active: true,
            created_at: Utc::now(),
            last_ping: None,
            status: STATUS_PENDING.to_string(),
        }
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_active() -> bool {
    true
}

fn default_status() -> String {
    STATUS_PENDING.to_string()
}

/// Aggregate probe counters for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectStats {
    pub total_pings: u64,
    pub successful_pings: u64,
    pub failed_pings: u64,
    pub uptime_percentage: f64,
    pub last_status: String,
}

impl Default for ProjectStats {
    fn default() -> Self {
        Self {
            total_pings: 0,
            successful_pings: 0,
            failed_pings: 0,
            uptime_percentage: 0.0,
            last_status: STATUS_PENDING.to_string(),
        }
    }
}

impl ProjectStats {
    /// Count one probe outcome.
    pub fn record(&mut self, status: &str, success: bool) {
        if success {
            self.successful_pings += 1;
        } else {
            self.failed_pings += 1;
        }
        self.total_pings = self.successful_pings + self.failed_pings;
        self.uptime_percentage = uptime(self.successful_pings, self.total_pings);
        self.last_status = status.to_string();
    }

    /// Re-derive the total and the uptime from the two outcome counters.
    ///
    /// Returns true if anything changed.
    pub fn normalize(&mut self) -> bool {
        let total = self.successful_pings + self.failed_pings;
        let pct = uptime(self.successful_pings, total);
        let changed = total != self.total_pings || pct != self.uptime_percentage;
        self.total_pings = total;
        self.uptime_percentage = pct;
        changed
    }
}

/// Success ratio as a percentage rounded to two decimals; 0 when nothing was counted.
pub fn uptime(successful: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = successful as f64 / total as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

/// RFC 3339 timestamps that also accept offset-less ISO strings as host-local time.
pub(crate) mod timestamp {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    /// Parse a stored timestamp.
    ///
    /// Offset-less values were written in the host's local time and are
    /// converted to UTC. A local time skipped by a DST jump is read as UTC.
    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }

        let formats = [
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
        ];

        formats
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(|dt| match Local.from_local_datetime(&dt).earliest() {
                Some(local) => local.with_timezone(&Utc),
                None => DateTime::from_naive_utc_and_offset(dt, Utc),
            })
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            dt: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => s.serialize_some(&dt.to_rfc3339()),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(raw) => parse(&raw).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid timestamp: {raw}"))
                }),
                None => Ok(None),
            }
        }
    }
}
