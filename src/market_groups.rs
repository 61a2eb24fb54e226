use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::DatasetError;
use crate::items::RawId;

/// Root market group of finished ship hulls ("Ships")
pub const SHIPS_ROOT_GROUP_ID: u32 = 4;

#[derive(Debug, Deserialize)]
struct RawMarketGroup {
    #[serde(rename = "parentGroupID", default)]
    parent_group_id: Option<RawId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    /// Top of the chain
    Terminal,
    Group(u32),
    /// A parent value that is not an identifier
    Malformed,
}

/// Market group forest, child -> parent
#[derive(Debug, Default)]
pub struct MarketGroups {
    parents: HashMap<u32, ParentRef>,
}

impl MarketGroups {
    pub fn parse(json_str: &str) -> Result<Self, DatasetError> {
        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(json_str).map_err(|e| {
                DatasetError::unavailable(
                    "marketGroups",
                    format!("Failed to parse market groups: {}", e),
                )
            })?;

        let mut parents = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            let Ok(group_id) = key.trim().parse::<u32>() else {
                tracing::warn!(%key, "skipping market group with a non-numeric key");
                continue;
            };

            let group: RawMarketGroup = match serde_json::from_value(value) {
                Ok(group) => group,
                Err(e) => {
                    tracing::warn!(group_id, error = %e, "malformed market group record");
                    parents.insert(group_id, ParentRef::Malformed);
                    continue;
                }
            };

            let parent = match group.parent_group_id {
                None => ParentRef::Terminal,
                Some(raw) if raw.is_none_sentinel() => ParentRef::Terminal,
                Some(raw) => match raw.to_id() {
                    Some(parent) => ParentRef::Group(parent),
                    None => {
                        tracing::warn!(group_id, parent = ?raw, "unusable parentGroupID");
                        ParentRef::Malformed
                    }
                },
            };
            parents.insert(group_id, parent);
        }

        Ok(Self { parents })
    }

    pub fn from_parents(parents: impl IntoIterator<Item = (u32, ParentRef)>) -> Self {
        Self {
            parents: parents.into_iter().collect(),
        }
    }

    /// Root of the chain starting at `group_id`, or `None` when the group is
    /// unknown or the chain is malformed (dangling parent, bad value, loop)
    pub fn root_of(&self, group_id: u32) -> Option<u32> {
        let mut current = group_id;
        let mut visited = HashSet::new();

        loop {
            if !visited.insert(current) {
                tracing::debug!(group_id, "market group chain loops");
                return None;
            }

            match self.parents.get(&current)? {
                ParentRef::Terminal => return Some(current),
                ParentRef::Group(parent) => current = *parent,
                ParentRef::Malformed => return None,
            }
        }
    }

    /// Does this group ultimately belong to the ship hull tree?
    pub fn is_hull_group(&self, group_id: u32) -> bool {
        self.root_of(group_id) == Some(SHIPS_ROOT_GROUP_ID)
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}
