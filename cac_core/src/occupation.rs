//! The list of occupations admitted into the feed.
//!
//! The list is a JSON file, either an object mapping a readable name to an
//! item id (`{"actor": "Q33999"}`) or a plain array of item ids.

use std::{collections::BTreeMap, fs::read_to_string, path::Path};

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    person::EntityId,
};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OccupationFile {
    Named(BTreeMap<String, String>),
    Plain(Vec<String>),
}

/// The set of occupation item ids, sorted and without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccupationFilter(Vec<EntityId>);

impl OccupationFilter {
    pub fn new(ids: impl IntoIterator<Item = EntityId>) -> Self {
        let mut ids: Vec<EntityId> = ids.into_iter().collect();
        ids.sort();
        ids.dedup();
        Self(ids)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = read_to_string(path).map_err(|err| {
            Error::Configuration(format!(
                "cannot read occupation list `{}`: {err}",
                path.display()
            ))
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: OccupationFile = serde_json::from_str(json)
            .map_err(|err| Error::Configuration(format!("malformed occupation list: {err}")))?;
        let raw_ids = match file {
            OccupationFile::Named(named) => named.into_values().collect(),
            OccupationFile::Plain(plain) => plain,
        };
        let ids = raw_ids
            .iter()
            .map(|id| id.trim().parse())
            .collect::<Result<Vec<EntityId>>>()?;
        Ok(Self::new(ids))
    }

    pub fn ids(&self) -> &[EntityId] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
