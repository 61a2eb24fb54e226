use crate::catalog::Catalog;
use crate::error::LookupError;
use crate::items::Item;
use crate::recipes::{RecipeLine, MANUFACTURING_ACTIVITY};

/// Suffix of the catalog entry that carries a product's manufacturing recipe
pub const BLUEPRINT_SUFFIX: &str = "Blueprint";

/// `"Rifter"` -> `"Rifter Blueprint"`
pub fn blueprint_name(name: &str) -> String {
    format!("{} {}", name, BLUEPRINT_SUFFIX)
}

fn ends_with_blueprint_suffix(name: &str) -> bool {
    name.to_lowercase()
        .ends_with(&BLUEPRINT_SUFFIX.to_lowercase())
}

impl Catalog {
    /// Manufacturing lines with a positive quantity
    fn usable_recipe(&self, id: u32) -> Vec<RecipeLine> {
        self.recipes
            .recipe_for(id, MANUFACTURING_ACTIVITY)
            .into_iter()
            .filter(|line| line.quantity > 0)
            .collect()
    }

    /// Recipe of `id`, falling back to the recipe of its `"<name> Blueprint"`
    /// entry. Empty means the material is a leaf.
    pub fn resolve(&self, id: u32) -> Vec<RecipeLine> {
        let direct = self.usable_recipe(id);
        if !direct.is_empty() {
            return direct;
        }

        let Some(item) = self.items.get(id) else {
            return Vec::new();
        };
        let surrogate_name = blueprint_name(&item.name);
        match self.items.resolve_by_name(&surrogate_name) {
            Some(blueprint) => {
                tracing::debug!(id, blueprint_id = blueprint.id, "using blueprint recipe");
                self.usable_recipe(blueprint.id)
            }
            None => Vec::new(),
        }
    }

    /// Resolve a user query to the root item and its direct materials.
    ///
    /// A query that does not match, or matches an item without a recipe, is
    /// retried as `"<query> Blueprint"` unless it already ends with the suffix.
    pub fn resolve_query(&self, query: &str) -> Result<(Item, Vec<RecipeLine>), LookupError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(LookupError::EmptyQuery);
        }

        let mut found = self.items.resolve_by_name(query);
        let mut lines = found.map(|item| self.resolve(item.id)).unwrap_or_default();

        if (found.is_none() || lines.is_empty()) && !ends_with_blueprint_suffix(query) {
            if let Some(blueprint) = self.items.resolve_by_name(&blueprint_name(query)) {
                tracing::debug!(query, blueprint = %blueprint.name, "retrying query as blueprint");
                lines = self.resolve(blueprint.id);
                found = Some(blueprint);
            }
        }

        match found {
            None => Err(LookupError::NotFound {
                query: query.to_string(),
            }),
            Some(item) if lines.is_empty() => Err(LookupError::NoRecipe {
                name: item.name.clone(),
            }),
            Some(item) => Ok((item.clone(), lines)),
        }
    }
}
