//! Person records as fetched from Wikidata and the event entries derived from them.

use std::{fmt, str::FromStr};

use bitmask_enum::bitmask;
use chrono::NaiveDate;

use crate::error::{Error, Result};

static ENTITY_URL: &str = "https://www.wikidata.org/wiki/";

/// A Wikidata item id like `Q42`.
///
/// Ordered by its numeric part, so `Q9` sorts before `Q10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u64);

impl EntityId {
    pub fn new(number: u64) -> Option<Self> {
        (number > 0).then_some(Self(number))
    }

    /// Extract the id from an entity URI such as `http://www.wikidata.org/entity/Q42`.
    pub fn from_uri(uri: &str) -> Option<Self> {
        uri.rsplit('/').next()?.parse().ok()
    }

    /// The human-readable page of this item.
    pub fn url(&self) -> String {
        format!("{ENTITY_URL}{self}")
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Configuration(format!("`{s}` is not a Wikidata item id"));
        let digits = s.strip_prefix('Q').ok_or_else(invalid)?;
        if digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        digits
            .parse()
            .ok()
            .and_then(EntityId::new)
            .ok_or_else(invalid)
    }
}

/// Which anniversary an entry marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    Birth,
    Death,
}

#[bitmask]
pub enum EventKindBitmask {
    Birth,
    Death,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::Birth, EventKind::Death];

    /// The Wikidata property holding the date of this event.
    pub fn property(self) -> &'static str {
        match self {
            EventKind::Birth => "P569",
            EventKind::Death => "P570",
        }
    }

    /// Single letter used inside entry UIDs.
    ///
    /// Changing this is a breaking change for subscribed clients!
    pub fn code(self) -> char {
        match self {
            EventKind::Birth => 'B',
            EventKind::Death => 'D',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'B' => Some(EventKind::Birth),
            'D' => Some(EventKind::Death),
            _ => None,
        }
    }

    pub fn bitmask(self) -> EventKindBitmask {
        match self {
            EventKind::Birth => EventKindBitmask::Birth,
            EventKind::Death => EventKindBitmask::Death,
        }
    }
}

/// Month and day of an event, with the year when Wikidata knows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnniversaryDate {
    pub month: u32,
    pub day: u32,
    pub year: Option<i32>,
}

impl AnniversaryDate {
    pub fn matches(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        self.month == date.month() && self.day == date.day()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupation {
    pub id: EntityId,
    pub label: String,
}

/// One row of the knowledge graph, reduced to what the calendar needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    pub id: EntityId,
    pub name: String,
    pub occupation: Option<Occupation>,
    pub birth: Option<AnniversaryDate>,
    pub death: Option<AnniversaryDate>,
    pub link: String,
}

impl PersonRecord {
    pub fn date(&self, kind: EventKind) -> Option<&AnniversaryDate> {
        match kind {
            EventKind::Birth => self.birth.as_ref(),
            EventKind::Death => self.death.as_ref(),
        }
    }
}

/// A single anniversary as it ends up in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEntry {
    pub person: EntityId,
    pub kind: EventKind,
    /// The occurrence inside the queried window.
    pub date: NaiveDate,
    /// Year of the original event, informational only.
    pub year: Option<i32>,
    pub name: String,
    pub label: String,
    pub occupations: Vec<String>,
    pub link: String,
}
