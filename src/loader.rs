use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::catalog::Catalog;
use crate::config::{Config, DatasetSource};
use crate::error::DatasetError;

/// Loads the catalog on first use and hands out the same instance afterwards.
///
/// Concurrent first callers wait on a single load. A failed load leaves
/// nothing behind, so the next caller starts over.
pub struct CatalogLoader {
    config: Config,
    catalog: OnceCell<Arc<Catalog>>,
    attempts: AtomicUsize,
}

impl CatalogLoader {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            catalog: OnceCell::new(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Loader that already holds a catalog and never touches the datasets
    pub fn from_catalog(catalog: Catalog) -> Self {
        Self {
            config: Config::default(),
            catalog: OnceCell::new_with(Some(Arc::new(catalog))),
            attempts: AtomicUsize::new(0),
        }
    }

    pub async fn get(&self) -> Result<Arc<Catalog>, DatasetError> {
        self.catalog
            .get_or_try_init(|| self.load())
            .await
            .cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.catalog.initialized()
    }

    /// Number of loads started so far
    pub fn load_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    async fn load(&self) -> Result<Arc<Catalog>, DatasetError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        tracing::info!(source = ?self.config.source, "loading datasets");

        let client = reqwest::Client::new();
        let source = &self.config.source;

        let (types, materials, market_groups) = tokio::try_join!(
            fetch_text(&client, source, &self.config.types_file),
            fetch_text(&client, source, &self.config.materials_file),
            fetch_text(&client, source, &self.config.market_groups_file),
        )?;

        let catalog = Catalog::from_json(&types, &materials, &market_groups)?;
        Ok(Arc::new(catalog))
    }
}

/// Read one dataset file from disk or over HTTP
async fn fetch_text(
    client: &reqwest::Client,
    source: &DatasetSource,
    file_name: &str,
) -> Result<String, DatasetError> {
    let location = source.locate(file_name);

    match source {
        DatasetSource::Directory(dir) => tokio::fs::read_to_string(dir.join(file_name))
            .await
            .map_err(|e| {
                DatasetError::unavailable(file_name, format!("Could not load {}: {}", location, e))
            }),
        DatasetSource::Remote(_) => {
            let response = client
                .get(&location)
                .header("User-Agent", "EVE-BOM-Calculator/1.0")
                .send()
                .await
                .map_err(|e| {
                    DatasetError::unavailable(file_name, format!("Failed to fetch {}: {}", location, e))
                })?;

            if !response.status().is_success() {
                return Err(DatasetError::unavailable(
                    file_name,
                    format!("{} returned status: {}", location, response.status()),
                ));
            }

            response
                .text()
                .await
                .map_err(|e| {
                    DatasetError::unavailable(file_name, format!("Failed to read {}: {}", location, e))
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MARKET_GROUPS_FILE, MATERIALS_FILE, TYPES_FILE};
    use std::path::Path;

    fn write_datasets(dir: &Path) {
        std::fs::write(
            dir.join(TYPES_FILE),
            r#"{ "Rifter": { "typeID": 587, "marketGroupID": 64 }, "Tritanium": 34 }"#,
        )
        .unwrap();
        std::fs::write(
            dir.join(MATERIALS_FILE),
            r#"[{ "typeID": 587, "materials": [{ "activityID": 1, "materialTypeID": 34, "quantity": 100 }] }]"#,
        )
        .unwrap();
        std::fs::write(
            dir.join(MARKET_GROUPS_FILE),
            r#"{ "4": { "parentGroupID": "None" }, "64": { "parentGroupID": "4" } }"#,
        )
        .unwrap();
    }

    fn dir_loader(dir: &Path) -> CatalogLoader {
        CatalogLoader::new(Config::new(DatasetSource::Directory(dir.to_path_buf())))
    }

    #[tokio::test]
    async fn test_loads_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_datasets(dir.path());
        let loader = dir_loader(dir.path());

        let catalog = loader.get().await.unwrap();

        assert!(loader.is_loaded());
        assert_eq!(catalog.display_name(587), "Rifter");
        assert!(catalog.is_hull(587));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_load() {
        let dir = tempfile::tempdir().unwrap();
        write_datasets(dir.path());
        let loader = dir_loader(dir.path());

        let (a, b, c) = tokio::join!(loader.get(), loader.get(), loader.get());
        let again = loader.get().await.unwrap();

        let a = a.unwrap();
        assert!(Arc::ptr_eq(&a, &b.unwrap()));
        assert!(Arc::ptr_eq(&a, &c.unwrap()));
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(loader.load_attempts(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable_and_retried() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TYPES_FILE), r#"{ "Tritanium": 34 }"#).unwrap();
        let loader = dir_loader(dir.path());

        let err = loader.get().await.unwrap_err();

        assert!(matches!(err, DatasetError::Unavailable { .. }));
        assert!(!loader.is_loaded());

        write_datasets(dir.path());
        assert!(loader.get().await.is_ok());
        assert_eq!(loader.load_attempts(), 2);
    }

    #[tokio::test]
    async fn test_unparsable_dataset_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        write_datasets(dir.path());
        std::fs::write(dir.path().join(MARKET_GROUPS_FILE), "[not json").unwrap();
        let loader = dir_loader(dir.path());

        match loader.get().await {
            Err(DatasetError::Unavailable { dataset, .. }) => assert_eq!(dataset, "marketGroups"),
            Ok(_) => panic!("expected the load to fail"),
        }
        assert!(!loader.is_loaded());
    }

    #[tokio::test]
    async fn test_unreachable_remote_is_unavailable() {
        let loader = CatalogLoader::new(Config::new(DatasetSource::Remote(
            "http://127.0.0.1:9/sde".to_string(),
        )));

        assert!(matches!(
            loader.get().await,
            Err(DatasetError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_preloaded_catalog_skips_loading() {
        let loader = CatalogLoader::from_catalog(Catalog::default());

        assert!(loader.get().await.is_ok());
        assert_eq!(loader.load_attempts(), 0);
    }
}
