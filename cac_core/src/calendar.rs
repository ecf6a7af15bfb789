//! Build the iCalendar document of a feed and read it back.

use std::io::{BufReader, Cursor};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use ical::{
    generator::{IcalCalendar, IcalCalendarBuilder, IcalEvent, IcalEventBuilder, Property},
    ical_param, ical_property, IcalParser,
};
use log::debug;

use crate::{
    config::Config,
    error::{Error, Result},
    locale::Language,
    person::{EntityId, EventEntry, EventKind},
};

static PROD_ID_PRODUCT: &str = "Cultural Anniversary Calendar";
static PROD_ID_VENDOR: &str = "wikidata.org";
static UID_DOMAIN: &str = "cultural-calendar.wikidata";
static FORMAT: &str = "%Y%m%d";
static STAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";
static REFRESH: &str = "P1D";
static LINE_END: &str = "\r\n";

/// Longest content line in octets, without the line break.
const LINE_OCTETS: usize = 75;

/// The complete feed of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarFeed {
    pub title: String,
    pub timezone: Tz,
    pub language: Language,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<EventEntry>,
}

impl CalendarFeed {
    pub fn new(config: &Config, entries: Vec<EventEntry>, generated_at: DateTime<Utc>) -> Self {
        Self {
            title: config.title.clone(),
            timezone: config.timezone,
            language: config.language,
            generated_at,
            entries,
        }
    }

    /// Render the feed as iCalendar text.
    pub fn generate(&self) -> Result<String> {
        emit(&self.to_ical()?)
    }

    /// Build the calendar, one yearly all-day event per entry.
    pub fn to_ical(&self) -> Result<IcalCalendar> {
        let changed = self.generated_at.format(STAMP_FORMAT).to_string();
        let mut calendar = IcalCalendarBuilder::version("2.0")
            .gregorian()
            .prodid(prod_id(self.language))
            .build();
        calendar.properties.extend([
            ical_property!("METHOD", "PUBLISH"),
            ical_property!("X-WR-CALNAME", escape(&self.title)?),
            ical_property!("X-WR-TIMEZONE", self.timezone.name()),
            ical_property!("X-WR-CALDESC", escape(self.language.description())?),
            ical_property!("REFRESH-INTERVAL", REFRESH, ical_param!("VALUE", "DURATION")),
            ical_property!("X-PUBLISHED-TTL", REFRESH),
        ]);
        for entry in &self.entries {
            calendar.events.push(get_event(entry, self.timezone, &changed)?);
        }
        Ok(calendar)
    }
}

/// Build the event of a single entry.
fn get_event(entry: &EventEntry, timezone: Tz, changed: &str) -> Result<IcalEvent> {
    Ok(IcalEventBuilder::tzid(timezone.name())
        .uid(uid(entry.person, entry.kind))
        .changed_utc(changed)
        .one_day(entry.date.format(FORMAT).to_string())
        .set(ical_property!("RRULE", "FREQ=YEARLY"))
        .set(ical_property!("SUMMARY", escape(&summary(entry))?))
        .set(ical_property!("DESCRIPTION", escape(&description(entry))?))
        .set(ical_property!("URL", entry.link.clone(), ical_param!("VALUE", "URI")))
        .set(ical_property!("TRANSP", "TRANSPARENT"))
        .build())
}

fn summary(entry: &EventEntry) -> String {
    let symbol = match entry.kind {
        EventKind::Birth => "🎉",
        EventKind::Death => "✝️",
    };
    let mut summary = format!("{symbol} {}: {}", entry.label, entry.name);
    if let Some(year) = entry.year {
        summary.push_str(&format!(" ({year})"));
    }
    if !entry.occupations.is_empty() {
        summary.push_str(&format!(" – {}", entry.occupations.join(", ")));
    }
    summary
}

fn description(entry: &EventEntry) -> String {
    let mut description = entry.name.clone();
    if !entry.occupations.is_empty() {
        description.push_str(&format!(" – {}", entry.occupations.join(", ")));
    }
    description.push_str(&format!("\nWikidata: {}", entry.link));
    description
}

fn prod_id(language: Language) -> String {
    format!(
        "-//{PROD_ID_PRODUCT}//{PROD_ID_VENDOR}//{}",
        language.code().to_ascii_uppercase()
    )
}

/// Write the calendar with CRLF line ends, folding long lines.
fn emit(calendar: &IcalCalendar) -> Result<String> {
    let mut ics = String::from("BEGIN:VCALENDAR");
    ics.push_str(LINE_END);
    for property in &calendar.properties {
        ics.push_str(&content_line(property)?);
    }
    for event in &calendar.events {
        ics.push_str("BEGIN:VEVENT");
        ics.push_str(LINE_END);
        for property in &event.properties {
            ics.push_str(&content_line(property)?);
        }
        ics.push_str("END:VEVENT");
        ics.push_str(LINE_END);
    }
    ics.push_str("END:VCALENDAR");
    ics.push_str(LINE_END);
    Ok(ics)
}

fn content_line(property: &Property) -> Result<String> {
    let mut line = property.name.clone();
    for (name, values) in property.params.iter().flatten() {
        let values = values
            .iter()
            .map(|value| param_value(value))
            .collect::<Result<Vec<String>>>()?;
        line.push_str(&format!(";{name}={}", values.join(",")));
    }
    let value = property.value.as_deref().unwrap_or_default();
    if value.chars().any(|c| c.is_control() && c != '\t') {
        return Err(Error::Serialization(format!(
            "unescaped control character in {} value `{}`",
            property.name,
            value.escape_debug()
        )));
    }
    line.push(':');
    line.push_str(value);
    Ok(fold(&line))
}

fn param_value(value: &str) -> Result<String> {
    if value.contains('"') || value.chars().any(char::is_control) {
        return Err(Error::Serialization(format!(
            "cannot write parameter value `{}`",
            value.escape_debug()
        )));
    }
    if value.contains(|c: char| matches!(c, ';' | ':' | ',')) {
        Ok(format!("\"{value}\""))
    } else {
        Ok(value.to_string())
    }
}

/// Fold a content line into chunks of at most [`LINE_OCTETS`] octets.
///
/// Chunks end on a character boundary and never in whitespace, which the
/// `ical` parser drops when it unfolds a line.
fn fold(line: &str) -> String {
    let mut folded = String::with_capacity(line.len() + line.len() / (LINE_OCTETS - 1) * 3 + 2);
    let mut rest = line;
    let mut limit = LINE_OCTETS;
    while rest.len() > limit {
        let mut split = limit;
        while !rest.is_char_boundary(split) {
            split -= 1;
        }
        let trimmed = rest[..split].trim_end().len();
        if trimmed > 0 {
            split = trimmed;
        }
        folded.push_str(&rest[..split]);
        folded.push_str(LINE_END);
        folded.push(' ');
        rest = &rest[split..];
        // the leading space counts towards the line
        limit = LINE_OCTETS - 1;
    }
    folded.push_str(rest);
    folded.push_str(LINE_END);
    folded
}

/// Get a unique id for an anniversary of a person.
///
/// Changing this function is a breaking change!
pub fn uid(person: EntityId, kind: EventKind) -> String {
    format!("{}-{person}@{UID_DOMAIN}", kind.code())
}

fn parse_uid(uid: &str) -> Option<(EntityId, EventKind)> {
    let local = uid.strip_suffix(UID_DOMAIN)?.strip_suffix('@')?;
    let (code, person) = local.split_once('-')?;
    let mut code_chars = code.chars();
    let kind = EventKind::from_code(code_chars.next()?)?;
    if code_chars.next().is_some() {
        return None;
    }
    Some((person.parse().ok()?, kind))
}

/// Escape a TEXT value.
///
/// Line breaks become `\n`; other control characters cannot be represented.
pub fn escape(text: &str) -> Result<String> {
    let mut escaped = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\r' => {
                chars.next_if_eq(&'\n');
                escaped.push_str("\\n");
            }
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push(c),
            c if c.is_control() => {
                return Err(Error::Serialization(format!(
                    "control character U+{:04X} in `{}`",
                    u32::from(c),
                    text.escape_debug()
                )))
            }
            c => escaped.push(c),
        }
    }
    Ok(escaped)
}

/// Undo [`escape`].
pub fn unescape(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => unescaped.push('\n'),
            Some(other) => unescaped.push(other),
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

fn property_value<'a>(properties: &'a [Property], name: &str) -> Option<&'a str> {
    properties
        .iter()
        .find(|property| property.name == name)
        .and_then(|property| property.value.as_deref())
}

/// An event as read back from a generated document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ParsedEvent {
    pub person: EntityId,
    pub kind: EventKind,
    pub date: NaiveDate,
    pub summary: String,
}

/// Parse an iCalendar document written by [`CalendarFeed::generate`].
///
/// Events whose UID was not issued by this crate are skipped.
pub fn parse(ics: &str) -> Result<Vec<ParsedEvent>> {
    let parser = IcalParser::new(BufReader::new(Cursor::new(ics)));
    let mut events = vec![];
    for ical_calendar_result in parser {
        let ical_calendar =
            ical_calendar_result.map_err(|err| Error::Serialization(err.to_string()))?;
        for ical_event in ical_calendar.events {
            let uid_option = property_value(&ical_event.properties, "UID").and_then(parse_uid);
            let date_option = property_value(&ical_event.properties, "DTSTART")
                .and_then(|dt_start| NaiveDate::parse_from_str(dt_start, FORMAT).ok());
            let (Some((person, kind)), Some(date)) = (uid_option, date_option) else {
                debug!("ignoring foreign event {:?}", ical_event.properties);
                continue;
            };
            let summary = property_value(&ical_event.properties, "SUMMARY")
                .map(unescape)
                .unwrap_or_default();
            events.push(ParsedEvent {
                person,
                kind,
                date,
                summary,
            });
        }
    }
    Ok(events)
}

/// Check that `ics` contains exactly the entries of `feed`.
pub fn verify(feed: &CalendarFeed, ics: &str) -> Result<()> {
    let mut parsed: Vec<(EntityId, EventKind, NaiveDate)> = parse(ics)?
        .into_iter()
        .map(|event| (event.person, event.kind, event.date))
        .collect();
    let mut expected: Vec<(EntityId, EventKind, NaiveDate)> = feed
        .entries
        .iter()
        .map(|entry| (entry.person, entry.kind, entry.date))
        .collect();
    parsed.sort();
    expected.sort();
    if parsed != expected {
        return Err(Error::Serialization(format!(
            "generated document holds {} events, expected {}",
            parsed.len(),
            expected.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn entry(person: &str, kind: EventKind, name: &str, occupations: &[&str]) -> EventEntry {
        let person: EntityId = person.parse().unwrap();
        EventEntry {
            person,
            kind,
            date: NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
            year: Some(1931),
            name: String::from(name),
            label: String::from(Language::German.label(kind)),
            occupations: occupations.iter().map(ToString::to_string).collect(),
            link: person.url(),
        }
    }

    fn feed(entries: Vec<EventEntry>) -> CalendarFeed {
        CalendarFeed {
            title: String::from("Kultur; Kalender, Wien"),
            timezone: chrono_tz::Europe::Vienna,
            language: Language::German,
            generated_at: Utc.with_ymd_and_hms(2024, 3, 3, 4, 5, 6).unwrap(),
            entries,
        }
    }

    fn find_event<'a>(calendar: &'a IcalCalendar, uid: &str) -> Option<&'a IcalEvent> {
        calendar
            .events
            .iter()
            .find(|event| property_value(&event.properties, "UID") == Some(uid))
    }

    fn get_property_value_of_event<'a>(
        calendar: &'a IcalCalendar,
        property_name: &str,
        uid: &str,
    ) -> &'a str {
        property_value(&find_event(calendar, uid).unwrap().properties, property_name).unwrap()
    }

    #[test]
    fn test_to_ical() {
        let feed = feed(vec![
            entry("Q42", EventKind::Birth, "Douglas Adams", &["writer", "screenwriter"]),
            entry("Q42", EventKind::Death, "Douglas Adams", &[]),
        ]);
        let calendar = feed.to_ical().unwrap();
        assert_eq!(calendar.events.len(), 2);
        let birth_uid = "B-Q42@cultural-calendar.wikidata";
        assert_eq!(get_property_value_of_event(&calendar, "DTSTART", birth_uid), "20240303");
        assert_eq!(get_property_value_of_event(&calendar, "RRULE", birth_uid), "FREQ=YEARLY");
        assert_eq!(
            get_property_value_of_event(&calendar, "SUMMARY", birth_uid),
            "🎉 Geburtstag: Douglas Adams (1931) – writer\\, screenwriter"
        );
        assert_eq!(
            get_property_value_of_event(&calendar, "DESCRIPTION", birth_uid),
            "Douglas Adams – writer\\, screenwriter\\nWikidata: https://www.wikidata.org/wiki/Q42"
        );
        let death_uid = "D-Q42@cultural-calendar.wikidata";
        assert_eq!(
            get_property_value_of_event(&calendar, "SUMMARY", death_uid),
            "✝️ Todestag: Douglas Adams (1931)"
        );
        assert_eq!(
            property_value(&calendar.properties, "X-WR-CALNAME"),
            Some("Kultur\\; Kalender\\, Wien")
        );
    }

    #[test]
    fn test_generate_document() {
        let ics = feed(vec![entry("Q1", EventKind::Birth, "A", &[])])
            .generate()
            .unwrap();
        assert!(ics.starts_with("BEGIN:VCALENDAR"));
        assert!(ics.trim_end().ends_with("END:VCALENDAR"));
        assert!(ics.contains("PRODID:-//Cultural Anniversary Calendar//wikidata.org//DE"));
        assert!(ics.contains("X-WR-TIMEZONE:Europe/Vienna"));
        assert!(ics.lines().any(|line| line == "DTSTAMP:20240303T040506Z"));
        assert!(!ics.contains("TZID"));
        assert!(ics.split_inclusive('\n').all(|line| line.ends_with("\r\n")));
    }

    #[test]
    fn test_empty_feed_is_valid() {
        let feed = feed(vec![]);
        let ics = feed.generate().unwrap();
        assert!(ics.contains("BEGIN:VCALENDAR"));
        assert!(!ics.contains("BEGIN:VEVENT"));
        assert!(parse(&ics).unwrap().is_empty());
        verify(&feed, &ics).unwrap();
    }

    #[test]
    fn test_round_trip() {
        let mut late = entry("Q1339", EventKind::Death, "Johann; Sebastian, Bach", &["composer"]);
        late.date = NaiveDate::from_ymd_opt(2024, 7, 28).unwrap();
        let feed = feed(vec![
            entry("Q7", EventKind::Birth, "Line\nBreak", &["poet"]),
            entry("Q8", EventKind::Birth, "Back\\slash", &[]),
            late,
        ]);
        let ics = feed.generate().unwrap();
        let mut parsed: Vec<(String, EventKind, NaiveDate)> = parse(&ics)
            .unwrap()
            .into_iter()
            .map(|event| (event.person.to_string(), event.kind, event.date))
            .collect();
        parsed.sort();
        let mut expected: Vec<(String, EventKind, NaiveDate)> = feed
            .entries
            .iter()
            .map(|entry| (entry.person.to_string(), entry.kind, entry.date))
            .collect();
        expected.sort();
        assert_eq!(parsed, expected);
        verify(&feed, &ics).unwrap();

        let bach = parse(&ics)
            .unwrap()
            .into_iter()
            .find(|event| event.person.to_string() == "Q1339")
            .unwrap();
        assert_eq!(bach.summary, "✝️ Todestag: Johann; Sebastian, Bach (1931) – composer");
    }

    #[test]
    fn test_long_croatian_lines_round_trip() {
        for pad in 0..8 {
            let name = format!("{}Miroslav Krleža Šenoa Đaković", "a".repeat(pad));
            let mut birth = entry("Q5", EventKind::Birth, &name, &["književnik", "dramatičar"]);
            birth.label = String::from(Language::Croatian.label(EventKind::Birth));
            let mut death = entry("Q6", EventKind::Death, &name, &["slikar", "kipar"]);
            death.label = String::from(Language::Croatian.label(EventKind::Death));
            let feed = feed(vec![birth.clone(), death]);
            let ics = feed.generate().unwrap();
            assert!(ics
                .split("\r\n")
                .all(|line| line.len() <= LINE_OCTETS && !line.ends_with(' ')));
            verify(&feed, &ics).unwrap();

            let mut summaries: Vec<String> =
                parse(&ics).unwrap().into_iter().map(|event| event.summary).collect();
            summaries.sort();
            let mut expected: Vec<String> = feed.entries.iter().map(summary).collect();
            expected.sort();
            assert_eq!(summaries, expected);

            let calendar = IcalParser::new(BufReader::new(Cursor::new(&ics)))
                .next()
                .unwrap()
                .unwrap();
            let birth_event = find_event(&calendar, &uid(birth.person, birth.kind)).unwrap();
            let written = property_value(&birth_event.properties, "DESCRIPTION").map(unescape);
            assert_eq!(written, Some(description(&birth)));
        }
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold("SUMMARY:short"), "SUMMARY:short\r\n");
        let line = format!("SUMMARY:{}", "ž".repeat(100));
        let folded = fold(&line);
        assert!(folded.split("\r\n").all(|chunk| chunk.len() <= LINE_OCTETS));
        assert_eq!(folded.replace("\r\n ", ""), format!("{line}\r\n"));

        let line = format!("DESCRIPTION:{} tail", "x".repeat(62));
        let folded = fold(&line);
        assert_eq!(folded, format!("DESCRIPTION:{}\r\n  tail\r\n", "x".repeat(62)));
    }

    #[test]
    fn test_param_value() {
        assert_eq!(param_value("DATE").unwrap(), "DATE");
        assert_eq!(param_value("a;b").unwrap(), "\"a;b\"");
        assert!(param_value("say \"hi\"").is_err());
    }

    #[test]
    fn test_verify_detects_missing_events() {
        let full = feed(vec![entry("Q1", EventKind::Birth, "A", &[])]);
        let ics = feed(vec![]).generate().unwrap();
        let err = verify(&full, &ics).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_uid_is_deterministic() {
        let person: EntityId = "Q42".parse().unwrap();
        assert_eq!(uid(person, EventKind::Birth), "B-Q42@cultural-calendar.wikidata");
        assert_eq!(uid(person, EventKind::Death), "D-Q42@cultural-calendar.wikidata");
        assert_eq!(
            parse_uid(&uid(person, EventKind::Death)),
            Some((person, EventKind::Death))
        );
        assert_eq!(parse_uid("D-Q42@example.org"), None);
        assert_eq!(parse_uid("BD-Q42@cultural-calendar.wikidata"), None);

        let first = feed(vec![entry("Q42", EventKind::Birth, "A", &[])]);
        let mut second = first.clone();
        second.generated_at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let uid_of = |feed: &CalendarFeed| {
            property_value(&feed.to_ical().unwrap().events[0].properties, "UID").map(String::from)
        };
        assert_eq!(uid_of(&first), uid_of(&second));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a,b;c\\d").unwrap(), "a\\,b\\;c\\\\d");
        assert_eq!(escape("one\r\ntwo\rthree\nfour").unwrap(), "one\\ntwo\\nthree\\nfour");
        assert_eq!(escape("tab\tok").unwrap(), "tab\tok");
        let err = escape("bell\u{7}").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(feed(vec![entry("Q1", EventKind::Birth, "nul\0", &[])])
            .generate()
            .is_err());
    }

    #[test]
    fn test_unescape() {
        for text in ["plain", "a,b;c\\d", "x\ny", "trailing\\"] {
            assert_eq!(unescape(&escape(text).unwrap()), text);
        }
    }
}
