//! This client queries Wikidata for people born or died on a given day and parses the rows into person records.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;
use reqwest::{
    header::{ACCEPT, USER_AGENT},
    Client,
};
use serde::Deserialize;

use crate::{
    config::Config,
    error::Result,
    locale::Language,
    occupation::OccupationFilter,
    person::{AnniversaryDate, EntityId, EventKind, Occupation, PersonRecord},
};

static AGENT: &str = concat!(
    "cultural-anniversary-calendar/",
    env!("CARGO_PKG_VERSION"),
    " (https://www.wikidata.org/wiki/Wikidata:Data_access)"
);
static SPARQL_RESULTS: &str = "application/sparql-results+json";

/// Wikidata time precision for "day".
const DAY_PRECISION: u8 = 11;

/// Everything needed to ask for one kind of anniversary on one day.
#[derive(Debug, Clone, Copy)]
pub struct PersonQuery<'a> {
    pub kind: EventKind,
    pub month: u32,
    pub day: u32,
    pub occupations: &'a OccupationFilter,
    pub language: Language,
}

impl PersonQuery<'_> {
    /// Build the SPARQL text.
    ///
    /// The date is read from the full statement so that only values with at
    /// least day precision are returned; year-only dates are stored as
    /// January 1st and would otherwise flood that day.
    pub fn sparql(&self) -> String {
        let property = self.kind.property();
        let occupations = self
            .occupations
            .ids()
            .iter()
            .map(|id| format!("wd:{id}"))
            .collect::<Vec<String>>()
            .join(" ");
        format!(
            r#"SELECT ?person ?personLabel ?date ?precision ?occ ?occLabel WHERE {{
  VALUES ?occ {{ {occupations} }}
  ?person wdt:P31 wd:Q5 ;
          wdt:P106 ?occ ;
          p:{property} ?statement .
  ?statement psv:{property} ?value ;
             wikibase:rank ?rank .
  ?value wikibase:timeValue ?date ;
         wikibase:timePrecision ?precision .
  FILTER(?rank != wikibase:DeprecatedRank)
  FILTER(?precision >= {DAY_PRECISION})
  FILTER(MONTH(?date) = {month} && DAY(?date) = {day})
  SERVICE wikibase:label {{ bd:serviceParam wikibase:language "{language},en". }}
}}
ORDER BY ?personLabel"#,
            month = self.month,
            day = self.day,
            language = self.language.code(),
        )
    }
}

/// Something that can answer person queries.
///
/// The pipeline only depends on this seam, the concrete protocol lives in
/// [`WikidataClient`].
#[allow(async_fn_in_trait)]
pub trait PersonSource {
    async fn fetch(&self, query: &PersonQuery<'_>) -> Result<Vec<PersonRecord>>;
}

pub struct WikidataClient {
    client: Client,
    endpoint: String,
}

impl WikidataClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

impl PersonSource for WikidataClient {
    async fn fetch(&self, query: &PersonQuery<'_>) -> Result<Vec<PersonRecord>> {
        debug!(
            "querying {} for {:?} on {:02}-{:02}",
            self.endpoint, query.kind, query.month, query.day
        );
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("query", query.sparql())])
            .header(ACCEPT, SPARQL_RESULTS)
            .header(USER_AGENT, AGENT)
            .send()
            .await?
            .error_for_status()?;
        let records = parse(&response.text().await?, query.kind)?;
        debug!("{} rows usable", records.len());
        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    bindings: Vec<Binding>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Binding {
    person: Option<BindingValue>,
    person_label: Option<BindingValue>,
    date: Option<BindingValue>,
    precision: Option<BindingValue>,
    occ: Option<BindingValue>,
    occ_label: Option<BindingValue>,
}

#[derive(Debug, Deserialize)]
struct BindingValue {
    value: String,
}

fn value(binding: &Option<BindingValue>) -> Option<&str> {
    binding.as_ref().map(|binding| binding.value.as_str())
}

/// Parse a SPARQL JSON result into person records.
///
/// Rows without a usable person or date are skipped, only a body that is not
/// a SPARQL result at all is an error.
fn parse(json: &str, kind: EventKind) -> Result<Vec<PersonRecord>> {
    let response: SparqlResponse = serde_json::from_str(json)?;
    let records = response
        .results
        .bindings
        .iter()
        .filter_map(|binding| {
            let record = parse_binding(binding, kind);
            if record.is_none() {
                debug!("skipping row {binding:?}");
            }
            record
        })
        .collect();
    Ok(records)
}

fn parse_binding(binding: &Binding, kind: EventKind) -> Option<PersonRecord> {
    let id = EntityId::from_uri(value(&binding.person)?)?;
    let precision: u8 = value(&binding.precision)?.parse().ok()?;
    if precision < DAY_PRECISION {
        return None;
    }
    let date = parse_date(value(&binding.date)?)?;
    let name = value(&binding.person_label)
        .map(String::from)
        .unwrap_or_else(|| id.to_string());
    let occupation = value(&binding.occ)
        .and_then(EntityId::from_uri)
        .map(|occupation_id| Occupation {
            id: occupation_id,
            label: value(&binding.occ_label)
                .map(String::from)
                .unwrap_or_else(|| occupation_id.to_string()),
        });
    let (birth, death) = match kind {
        EventKind::Birth => (Some(date), None),
        EventKind::Death => (None, Some(date)),
    };
    Some(PersonRecord {
        id,
        name,
        occupation,
        birth,
        death,
        link: id.url(),
    })
}

fn date_regex() -> &'static Regex {
    static DATE_REGEX: OnceLock<Regex> = OnceLock::new();
    DATE_REGEX.get_or_init(|| {
        Regex::new(
            r"(?x)
                ^
                (?P<year>[+-]?\d{1,16}) # the year, negative before the common era
                -
                (?P<month>\d{2})
                -
                (?P<day>\d{2})
                T
            ",
        )
        .unwrap()
    })
}

/// Parse an `xsd:dateTime` such as `1879-03-14T00:00:00Z` or `-0043-03-15T00:00:00Z`.
fn parse_date(date_time: &str) -> Option<AnniversaryDate> {
    let captures = date_regex().captures(date_time)?;
    let month: u32 = captures["month"].parse().ok()?;
    let day: u32 = captures["day"].parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some(AnniversaryDate {
        month,
        day,
        year: captures["year"].parse().ok(),
    })
}
