use std::path::{Path, PathBuf};

use anyhow::Result;
use emberpot_game::{CatalogContext, CatalogData, CatalogError, CatalogSource, GameEngine};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogFileError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Catalog JSON read from disk on every load.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogSource for FileCatalog {
    type Error = CatalogFileError;

    fn load_catalog(&self) -> Result<CatalogData, Self::Error> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| CatalogFileError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(CatalogData::from_json(&raw)?)
    }
}

/// Catalog for a test run: the file at `path` when given, else the bundled one.
///
/// # Errors
///
/// Fails when an explicit file cannot be read or validated.
pub fn load_tester_catalog(path: Option<&Path>) -> Result<CatalogContext> {
    match path {
        Some(path) => {
            let catalog = GameEngine::new(FileCatalog::new(path)).load_catalog()?;
            log::info!("loaded catalog from {}", path.display());
            Ok(catalog)
        }
        None => Ok(CatalogContext::default_config()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLED: &str = include_str!("../../../emberpot-game/assets/catalog.json");

    fn temp_file(label: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "emberpot-catalog-{label}-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn loads_catalog_from_disk() {
        let path = temp_file("ok", BUNDLED);
        let catalog = load_tester_catalog(Some(&path)).unwrap();
        assert!(catalog.contains_key("egg"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let source = FileCatalog::new("/definitely/not/here.json");
        let err = source.load_catalog().unwrap_err();
        assert!(matches!(err, CatalogFileError::Io { .. }));
        assert!(err.to_string().contains("not/here.json"));
    }

    #[test]
    fn invalid_json_is_rejected_loudly() {
        let path = temp_file("bad", "{ not json");
        let err = FileCatalog::new(&path).load_catalog().unwrap_err();
        assert!(matches!(
            err,
            CatalogFileError::Catalog(CatalogError::Parse(_))
        ));
        assert!(load_tester_catalog(Some(&path)).is_err());
    }

    #[test]
    fn no_path_uses_bundled_catalog() {
        let catalog = load_tester_catalog(None).unwrap();
        assert!(catalog.contains_key("knife"));
    }
}
