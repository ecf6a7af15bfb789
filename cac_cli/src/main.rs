//! Generate the cultural anniversary calendar once and write it to disk.
//!
//! Meant to be run daily by an external scheduler; the output file is served
//! as a static resource.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cac_core::{
    build_feed,
    config::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS, DEFAULT_TIMEZONE},
    person::EventKindBitmask,
    publish::publish,
    Config, RawConfig, WikidataClient,
};
use clap::Parser;
use flexi_logger::Logger;
use log::info;

#[derive(Debug, Parser)]
#[command(version)]
pub struct Arguments {
    /// language of labels and default title (hr, de or en)
    #[arg(long, env = "CALENDAR_LANG", default_value = "hr")]
    pub lang: String,
    /// calendar title, defaults to a title in the chosen language
    #[arg(long, env = "CALENDAR_TITLE")]
    pub title: Option<String>,
    /// IANA timezone deciding what "today" is
    #[arg(long, env = "CALENDAR_TZ", default_value = DEFAULT_TIMEZONE)]
    pub tz: String,
    /// where to write the iCalendar file
    #[arg(long, env = "CALENDAR_OUT", default_value = "public/cultural_calendar.ics")]
    pub out: PathBuf,
    /// JSON file listing the Wikidata occupation ids to include
    #[arg(long, env = "CALENDAR_OCCUPATIONS", default_value = "config/occupations.json")]
    pub occupations: PathBuf,
    /// first day to generate as YYYY-MM-DD, defaults to today
    #[arg(long)]
    pub date: Option<String>,
    /// number of consecutive days to generate
    #[arg(long, default_value_t = 1)]
    pub days: u32,
    /// SPARQL endpoint to query
    #[arg(long, env = "SPARQL_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
    /// request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
    /// exclude birthdays
    #[arg(long)]
    pub exclude_births: bool,
    /// exclude death anniversaries
    #[arg(long)]
    pub exclude_deaths: bool,
}

impl From<&Arguments> for EventKindBitmask {
    fn from(value: &Arguments) -> Self {
        let mut event_kind_bitmask = EventKindBitmask::none();
        if value.exclude_births {
            event_kind_bitmask |= EventKindBitmask::Birth;
        }
        if value.exclude_deaths {
            event_kind_bitmask |= EventKindBitmask::Death;
        }
        event_kind_bitmask
    }
}

impl From<Arguments> for RawConfig {
    fn from(value: Arguments) -> Self {
        let excluded_event_kinds = EventKindBitmask::from(&value);
        RawConfig {
            language: value.lang,
            title: value.title,
            timezone: value.tz,
            output: value.out,
            occupations: value.occupations,
            date: value.date,
            days: value.days,
            endpoint: value.endpoint,
            timeout_secs: value.timeout,
            excluded_event_kinds,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _logger = Logger::try_with_env_or_str("info")
        .context("invalid log specification")?
        .start()
        .context("cannot start logger")?;
    let args = Arguments::parse();
    let config = Config::resolve(RawConfig::from(args))?;
    info!(
        "generating {} feed `{}` starting {}",
        config.language,
        config.title,
        config.window.start()
    );
    let client = WikidataClient::new(&config)?;
    let feed = build_feed(&config, &client)
        .await
        .context("no feed was published")?;
    publish(&feed, &config.output)?;
    Ok(())
}
