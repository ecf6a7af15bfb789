//! Run configuration, resolved once at startup and passed to every component.

use std::{path::PathBuf, str::FromStr, time::Duration};

use chrono::{Days, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::{
    error::{Error, Result},
    locale::Language,
    occupation::OccupationFilter,
    person::{EventKind, EventKindBitmask},
};

pub static DEFAULT_ENDPOINT: &str = "https://query.wikidata.org/sparql";
pub static DEFAULT_TIMEZONE: &str = "Europe/Vienna";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const MAX_WINDOW_DAYS: u32 = 366;

/// Configuration as collected from flags and environment, not yet validated.
#[derive(Debug, Clone)]
pub struct RawConfig {
    pub language: String,
    pub title: Option<String>,
    pub timezone: String,
    pub output: PathBuf,
    pub occupations: PathBuf,
    /// First day of the window as `YYYY-MM-DD`; today in `timezone` when absent.
    pub date: Option<String>,
    pub days: u32,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub excluded_event_kinds: EventKindBitmask,
}

/// Consecutive calendar days whose anniversaries end up in the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    days: u32,
}

impl DateWindow {
    pub fn new(start: NaiveDate, days: u32) -> Result<Self> {
        if days == 0 || days > MAX_WINDOW_DAYS {
            return Err(Error::Configuration(format!(
                "window must span 1 to {MAX_WINDOW_DAYS} days, got {days}"
            )));
        }
        start
            .checked_add_days(Days::new(u64::from(days - 1)))
            .ok_or_else(|| Error::Configuration(format!("window starting {start} is out of range")))?;
        Ok(Self { start, days })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            days: 1,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.days as usize)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub language: Language,
    pub title: String,
    pub timezone: Tz,
    pub window: DateWindow,
    pub excluded_event_kinds: EventKindBitmask,
    pub occupations: OccupationFilter,
    pub output: PathBuf,
    pub endpoint: String,
    pub timeout: Duration,
}

impl Config {
    /// Validate everything up front so that misconfiguration never reaches the network.
    pub fn resolve(raw: RawConfig) -> Result<Self> {
        let language = Language::from_str(&raw.language)?;
        let timezone = Tz::from_str(raw.timezone.trim()).map_err(|_| {
            Error::Configuration(format!("unknown IANA timezone `{}`", raw.timezone))
        })?;
        let start = match raw.date.as_deref() {
            Some(date) => NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|err| {
                Error::Configuration(format!("invalid date `{date}`, expected YYYY-MM-DD: {err}"))
            })?,
            None => Utc::now().with_timezone(&timezone).date_naive(),
        };
        let window = DateWindow::new(start, raw.days)?;
        if raw.timeout_secs == 0 {
            return Err(Error::Configuration(String::from(
                "timeout must be at least one second",
            )));
        }
        if !raw.endpoint.starts_with("https://") && !raw.endpoint.starts_with("http://") {
            return Err(Error::Configuration(format!(
                "endpoint `{}` is not an http(s) URL",
                raw.endpoint
            )));
        }
        let occupations = OccupationFilter::load(&raw.occupations)?;
        let title = raw
            .title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| String::from(language.default_title()));
        Ok(Self {
            language,
            title,
            timezone,
            window,
            excluded_event_kinds: raw.excluded_event_kinds,
            occupations,
            output: raw.output,
            endpoint: raw.endpoint,
            timeout: Duration::from_secs(raw.timeout_secs),
        })
    }

    /// The event kinds that are not excluded, in feed order.
    pub fn event_kinds(&self) -> impl Iterator<Item = EventKind> + '_ {
        EventKind::ALL
            .into_iter()
            .filter(|kind| !self.excluded_event_kinds.contains(kind.bitmask()))
    }
}
