use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::DatasetError;
use crate::items::RawId;

/// Industry activity ID for manufacturing jobs
pub const MANUFACTURING_ACTIVITY: u32 = 1;

#[derive(Debug, Deserialize)]
struct RawMaterial {
    #[serde(rename = "activityID")]
    activity_id: RawId,
    #[serde(rename = "materialTypeID")]
    material_type_id: RawId,
    quantity: i64,
}

#[derive(Debug, Deserialize)]
struct RawActivityEntry {
    #[serde(rename = "typeID")]
    type_id: RawId,
    /// Decoded line by line so one damaged line does not take the recipe down
    #[serde(default)]
    materials: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecipeLine {
    pub material_id: u32,
    /// As read from the dataset; non-positive lines are dropped during resolution
    pub quantity: i64,
    pub activity_id: u32,
}

impl RecipeLine {
    pub fn manufacturing(material_id: u32, quantity: i64) -> Self {
        Self {
            material_id,
            quantity,
            activity_id: MANUFACTURING_ACTIVITY,
        }
    }
}

/// Loaded activity materials, keyed by the producing type
#[derive(Debug, Default)]
pub struct RecipeStore {
    by_product: HashMap<u32, Vec<RecipeLine>>,
}

impl RecipeStore {
    pub fn parse(json_str: &str) -> Result<Self, DatasetError> {
        let entries: Vec<serde_json::Value> = serde_json::from_str(json_str).map_err(|e| {
            DatasetError::unavailable(
                "industryActivityMaterials",
                format!("Failed to parse materials: {}", e),
            )
        })?;

        let mut by_product = HashMap::with_capacity(entries.len());
        for value in entries {
            let entry: RawActivityEntry = match serde_json::from_value(value) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed materials entry");
                    continue;
                }
            };
            let Some(product_id) = entry.type_id.to_id() else {
                tracing::warn!(type_id = ?entry.type_id, "skipping materials entry without a usable typeID");
                continue;
            };

            let lines: Vec<RecipeLine> = entry
                .materials
                .into_iter()
                .filter_map(|value| parse_line(product_id, value))
                .collect();

            // Later records for the same product replace earlier ones
            by_product.insert(product_id, lines);
        }

        Ok(Self { by_product })
    }

    pub fn from_recipes(recipes: impl IntoIterator<Item = (u32, Vec<RecipeLine>)>) -> Self {
        Self {
            by_product: recipes.into_iter().collect(),
        }
    }

    /// Lines of `product_id` restricted to `activity_id`, in dataset order.
    /// Empty when the product has no lines for that activity.
    pub fn recipe_for(&self, product_id: u32, activity_id: u32) -> Vec<RecipeLine> {
        self.by_product
            .get(&product_id)
            .map(|lines| {
                lines
                    .iter()
                    .filter(|line| line.activity_id == activity_id)
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_product.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_product.is_empty()
    }
}

fn parse_line(product_id: u32, value: serde_json::Value) -> Option<RecipeLine> {
    let raw: RawMaterial = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(product_id, error = %e, "skipping malformed material line");
            return None;
        }
    };

    match (raw.material_type_id.to_id(), raw.activity_id.to_id()) {
        (Some(material_id), Some(activity_id)) => Some(RecipeLine {
            material_id,
            quantity: raw.quantity,
            activity_id,
        }),
        _ => {
            tracing::warn!(product_id, line = ?raw, "skipping material line without usable ids");
            None
        }
    }
}
