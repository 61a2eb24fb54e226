use std::path::PathBuf;

pub const TYPES_FILE: &str = "invTypes.json";
pub const MATERIALS_FILE: &str = "industryActivityMaterials.json";
pub const MARKET_GROUPS_FILE: &str = "marketGroups.json";

const DATA_DIR_ENV: &str = "EVE_BOM_DATA_DIR";
const DATA_URL_ENV: &str = "EVE_BOM_DATA_URL";

/// Where the three dataset files live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    Directory(PathBuf),
    /// Base URL the file names are appended to
    Remote(String),
}

impl DatasetSource {
    pub fn locate(&self, file_name: &str) -> String {
        match self {
            DatasetSource::Directory(dir) => dir.join(file_name).display().to_string(),
            DatasetSource::Remote(base) => format!("{}/{}", base.trim_end_matches('/'), file_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source: DatasetSource,
    pub types_file: String,
    pub materials_file: String,
    pub market_groups_file: String,
}

impl Config {
    pub fn new(source: DatasetSource) -> Self {
        Self {
            source,
            types_file: TYPES_FILE.to_string(),
            materials_file: MATERIALS_FILE.to_string(),
            market_groups_file: MARKET_GROUPS_FILE.to_string(),
        }
    }

    /// `EVE_BOM_DATA_URL`, then `EVE_BOM_DATA_DIR`, then the local data directory
    pub fn from_env() -> Self {
        let url = std::env::var(DATA_URL_ENV).ok();
        let dir = std::env::var(DATA_DIR_ENV).ok();
        Self::new(Self::pick_source(url, dir))
    }

    fn pick_source(url: Option<String>, dir: Option<String>) -> DatasetSource {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            return DatasetSource::Remote(url);
        }
        if let Some(dir) = dir.filter(|d| !d.trim().is_empty()) {
            return DatasetSource::Directory(PathBuf::from(dir));
        }
        DatasetSource::Directory(default_data_dir())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DatasetSource::Directory(default_data_dir()))
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("eve-bom"))
        .unwrap_or_else(|| PathBuf::from("data"))
}
