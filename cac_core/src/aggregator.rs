//! Turn raw person records into the deduplicated, ordered entries of the feed.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::{
    config::DateWindow,
    locale::Language,
    person::{EntityId, EventEntry, EventKind, PersonRecord},
};

/// One record matching one day of the window, before deduplication.
struct Candidate<'a> {
    record: &'a PersonRecord,
    date: NaiveDate,
    year: Option<i32>,
}

impl Candidate<'_> {
    fn occupation_id(&self) -> Option<EntityId> {
        self.record.occupation.as_ref().map(|occupation| occupation.id)
    }
}

/// Build the entries for `window` from `records`.
///
/// Exactly one entry is produced per (person, event kind). Among duplicates
/// the one with the earliest date, then year, then occupation id is kept,
/// and the occupation labels of all of them are merged into it.
/// Entries are ordered by date, kind, collated name, name and id.
pub fn aggregate(
    records: &[PersonRecord],
    window: &DateWindow,
    language: Language,
) -> Vec<EventEntry> {
    let mut groups: BTreeMap<(EntityId, EventKind), Vec<Candidate>> = BTreeMap::new();
    for record in records {
        for kind in EventKind::ALL {
            let Some(anniversary) = record.date(kind) else {
                continue;
            };
            for date in window.dates().filter(|date| anniversary.matches(*date)) {
                groups.entry((record.id, kind)).or_default().push(Candidate {
                    record,
                    date,
                    year: anniversary.year,
                });
            }
        }
    }

    let mut entries: Vec<EventEntry> = groups
        .into_iter()
        .filter_map(|((person, kind), mut candidates)| {
            candidates.sort_by(|a, b| {
                (a.date, a.year, a.occupation_id(), &a.record.name).cmp(&(
                    b.date,
                    b.year,
                    b.occupation_id(),
                    &b.record.name,
                ))
            });
            let mut occupations: Vec<String> = candidates
                .iter()
                .filter_map(|candidate| candidate.record.occupation.as_ref())
                .map(|occupation| occupation.label.clone())
                .collect();
            occupations.sort();
            occupations.dedup();
            let kept = candidates.first()?;
            Some(EventEntry {
                person,
                kind,
                date: kept.date,
                year: kept.year,
                name: kept.record.name.clone(),
                label: String::from(language.label(kind)),
                occupations,
                link: kept.record.link.clone(),
            })
        })
        .collect();

    entries.sort_by_cached_key(|entry| {
        (
            entry.date,
            entry.kind,
            language.collation_key(&entry.name),
            entry.name.clone(),
            entry.person,
        )
    });
    entries
}
