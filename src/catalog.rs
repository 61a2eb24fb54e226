use crate::error::DatasetError;
use crate::items::{Item, ItemIndex};
use crate::market_groups::MarketGroups;
use crate::recipes::RecipeStore;

/// The three lookup tables, loaded once and read-only afterwards
#[derive(Debug, Default)]
pub struct Catalog {
    pub items: ItemIndex,
    pub recipes: RecipeStore,
    pub market_groups: MarketGroups,
}

impl Catalog {
    pub fn new(items: ItemIndex, recipes: RecipeStore, market_groups: MarketGroups) -> Self {
        Self {
            items,
            recipes,
            market_groups,
        }
    }

    /// Build from the raw `invTypes`, `industryActivityMaterials` and
    /// `marketGroups` documents
    pub fn from_json(
        types_json: &str,
        materials_json: &str,
        market_groups_json: &str,
    ) -> Result<Self, DatasetError> {
        let catalog = Self::new(
            ItemIndex::parse(types_json)?,
            RecipeStore::parse(materials_json)?,
            MarketGroups::parse(market_groups_json)?,
        );

        tracing::info!(
            types = catalog.items.len(),
            recipes = catalog.recipes.len(),
            market_groups = catalog.market_groups.len(),
            "catalog loaded"
        );

        Ok(catalog)
    }

    pub fn item(&self, id: u32) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn display_name(&self, id: u32) -> String {
        self.items.reverse_lookup(id)
    }

    /// Is this item a finished ship hull? Items without a market group are not.
    pub fn is_hull(&self, id: u32) -> bool {
        self.item(id)
            .and_then(|item| item.market_group_id)
            .is_some_and(|group| self.market_groups.is_hull_group(group))
    }
}
