//! This crate generates an iCalendar feed of birthdays and death anniversaries of notable artists.
//!
//! People are read from Wikidata via SPARQL <https://query.wikidata.org/sparql>, filtered by
//! occupation, and every anniversary becomes a yearly all-day event.

pub mod aggregator;
pub mod calendar;
pub mod config;
pub mod error;
pub mod locale;
pub mod occupation;
pub mod person;
pub mod publish;
pub mod wikidata_client;

use chrono::{Datelike, Utc};
use log::{info, warn};

pub use crate::{
    calendar::CalendarFeed,
    config::{Config, RawConfig},
    error::{Error, Result},
    wikidata_client::{PersonQuery, PersonSource, WikidataClient},
};

/// Fetch every anniversary in the configured window and build the feed.
///
/// Queries run one after another; the first failing query aborts the run.
pub async fn build_feed<S: PersonSource>(config: &Config, source: &S) -> Result<CalendarFeed> {
    let mut records = vec![];
    if config.occupations.is_empty() {
        warn!("occupation list is empty, the feed will have no events");
    } else {
        for date in config.window.dates() {
            for kind in config.event_kinds() {
                let query = PersonQuery {
                    kind,
                    month: date.month(),
                    day: date.day(),
                    occupations: &config.occupations,
                    language: config.language,
                };
                records.extend(source.fetch(&query).await?);
            }
        }
    }
    info!("fetched {} rows", records.len());
    let entries = aggregator::aggregate(&records, &config.window, config.language);
    info!("{} distinct anniversaries", entries.len());
    Ok(CalendarFeed::new(config, entries, Utc::now()))
}
