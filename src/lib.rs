use std::sync::Mutex;

pub mod aggregate;
pub mod bom_tree;
pub mod catalog;
pub mod config;
pub mod error;
pub mod items;
pub mod loader;
pub mod market_groups;
pub mod recipes;
pub mod resolution;

use aggregate::{AggregateMode, MaterialTotals};
use bom_tree::{BomTree, Breakdown};
use error::{AppError, LookupError};
use loader::CatalogLoader;

pub use catalog::Catalog;
pub use config::{Config, DatasetSource};

// State behind the calculator: the lazily loaded catalog plus the current lookup
pub struct AppState {
    loader: CatalogLoader,
    current: Mutex<Option<Breakdown>>,
    resolved: Mutex<Option<BomTree>>,
}

impl AppState {
    pub fn new(loader: CatalogLoader) -> Self {
        Self {
            loader,
            current: Mutex::new(None),
            resolved: Mutex::new(None),
        }
    }
}

// Look up an item and show its direct materials
pub async fn lookup_materials(name: &str, state: &AppState) -> Result<Breakdown, AppError> {
    if name.trim().is_empty() {
        return Err(LookupError::EmptyQuery.into());
    }

    let catalog = state.loader.get().await?;

    // A new lookup invalidates whatever was resolved before
    *state.resolved.lock().map_err(|_| AppError::StateLock)? = None;
    let mut current = state.current.lock().map_err(|_| AppError::StateLock)?;
    *current = None;

    let breakdown = bom_tree::expand(&catalog, name)?;
    *current = Some(breakdown.clone());

    Ok(breakdown)
}

// Resolve every layer below the current item's direct materials
pub async fn resolve_all_layers(state: &AppState) -> Result<BomTree, AppError> {
    let catalog = state.loader.get().await?;

    let breakdown = state
        .current
        .lock()
        .map_err(|_| AppError::StateLock)?
        .clone()
        .ok_or(AppError::NothingToResolve)?;

    let tree = bom_tree::resolve_all_layers(&catalog, &breakdown);
    *state.resolved.lock().map_err(|_| AppError::StateLock)? = Some(tree.clone());

    Ok(tree)
}

// Sum up the current tree, or just the direct materials if layers were never resolved
pub async fn copy_layers(mode: AggregateMode, state: &AppState) -> Result<MaterialTotals, AppError> {
    let catalog = state.loader.get().await?;

    let resolved = state
        .resolved
        .lock()
        .map_err(|_| AppError::StateLock)?
        .clone();
    let tree = match resolved {
        Some(tree) => tree,
        None => {
            let current = state.current.lock().map_err(|_| AppError::StateLock)?;
            let breakdown = current.as_ref().ok_or(AppError::NothingToResolve)?;
            BomTree::flat(breakdown)
        }
    };

    Ok(aggregate::aggregate(&catalog, &tree, mode))
}
