use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::DatasetError;

/// Identifier as it appears in the raw datasets: a JSON number or a numeric string.
/// The string `"None"` (and a JSON null, via `Option`) marks "no value".
/// Any other shape (floats, booleans, objects) lands in `Other` and yields no id.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawId {
    Number(u64),
    Text(String),
    Other(serde_json::Value),
}

impl RawId {
    pub(crate) fn is_none_sentinel(&self) -> bool {
        matches!(self, RawId::Text(text) if text.trim() == "None")
    }

    pub(crate) fn to_id(&self) -> Option<u32> {
        match self {
            RawId::Number(n) => u32::try_from(*n).ok(),
            RawId::Text(text) => text.trim().parse::<u32>().ok(),
            RawId::Other(_) => None,
        }
    }
}

/// An entry of the type catalog, either `"Name": 123` or
/// `"Name": { "typeID": 123, "marketGroupID": 4 }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTypeEntry {
    Record {
        #[serde(rename = "typeID")]
        type_id: RawId,
        #[serde(rename = "marketGroupID", default)]
        market_group_id: Option<RawId>,
    },
    Bare(RawId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub id: u32,
    pub name: String,
    pub market_group_id: Option<u32>,
}

/// Name <-> identifier lookup over the type catalog
#[derive(Debug, Default)]
pub struct ItemIndex {
    items: Vec<Item>,
    /// Lowercased display name -> position in `items`
    by_name: HashMap<String, usize>,
    /// Type ID -> position in `items`
    by_id: HashMap<u32, usize>,
}

impl ItemIndex {
    pub fn parse(json_str: &str) -> Result<Self, DatasetError> {
        // Sorted keys keep case-insensitive duplicate resolution deterministic
        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(json_str).map_err(|e| {
                DatasetError::unavailable("invTypes", format!("Failed to parse types: {}", e))
            })?;

        let mut items = Vec::with_capacity(raw.len());
        for (name, value) in raw {
            let entry: RawTypeEntry = match serde_json::from_value(value) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(%name, error = %e, "skipping malformed type entry");
                    continue;
                }
            };

            let (raw_id, raw_group) = match entry {
                RawTypeEntry::Record {
                    type_id,
                    market_group_id,
                } => (type_id, market_group_id),
                RawTypeEntry::Bare(type_id) => (type_id, None),
            };

            let Some(id) = raw_id.to_id() else {
                tracing::warn!(%name, "skipping type entry without a usable typeID");
                continue;
            };
            let market_group_id = raw_group
                .filter(|group| !group.is_none_sentinel())
                .and_then(|group| {
                    let id = group.to_id();
                    if id.is_none() {
                        tracing::warn!(%name, market_group = ?group, "ignoring unusable marketGroupID");
                    }
                    id
                });

            items.push(Item {
                id,
                name,
                market_group_id,
            });
        }

        Ok(Self::from_items(items))
    }

    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Self {
        let items: Vec<Item> = items.into_iter().collect();
        let mut by_name = HashMap::with_capacity(items.len());
        let mut by_id = HashMap::with_capacity(items.len());

        for (pos, item) in items.iter().enumerate() {
            by_name.entry(item.name.to_lowercase()).or_insert(pos);
            by_id.insert(item.id, pos);
        }

        Self {
            items,
            by_name,
            by_id,
        }
    }

    /// Case-insensitive exact match on the display name
    pub fn resolve_by_name(&self, name: &str) -> Option<&Item> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&pos| &self.items[pos])
    }

    pub fn get(&self, id: u32) -> Option<&Item> {
        self.by_id.get(&id).map(|&pos| &self.items[pos])
    }

    /// Display name for an identifier, or a `Type ID: <id>` placeholder for
    /// materials outside the catalog
    pub fn reverse_lookup(&self, id: u32) -> String {
        match self.get(id) {
            Some(item) => item.name.clone(),
            None => format!("Type ID: {}", id),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
