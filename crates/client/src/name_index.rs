//! Static name-index asset loader.

use std::path::Path;

use tracing::debug;

use digidex_core::error::{CatalogError, CatalogResult};
use digidex_core::models::NameIndexEntry;
use digidex_core::ports::NameIndex;

/// The offline `{id, name}` directory backing search-candidate computation.
///
/// The asset is a JSON array covering the entire catalog; it is loaded once
/// at startup and never refetched.
pub struct StaticNameIndex {
    entries: Vec<NameIndexEntry>,
}

impl StaticNameIndex {
    /// Load the directory from a JSON file.
    pub fn from_path(path: &Path) -> CatalogResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::ConfigError(format!("Cannot read name index {}: {e}", path.display()))
        })?;
        let index = Self::from_json(&raw)?;
        debug!(path = %path.display(), entries = index.len(), "Name index loaded");
        Ok(index)
    }

    /// Parse the directory from raw JSON.
    pub fn from_json(raw: &str) -> CatalogResult<Self> {
        let entries: Vec<NameIndexEntry> = serde_json::from_str(raw)
            .map_err(|e| CatalogError::ConfigError(format!("Invalid name index: {e}")))?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl NameIndex for StaticNameIndex {
    fn entries(&self) -> &[NameIndexEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use digidex_core::models::CatalogId;

    #[test]
    fn parses_the_published_asset_shape() {
        let json = r#"[
            {"id": 1, "name": "Garummon"},
            {"id": 2, "name": "Gabumon"}
        ]"#;

        let index = StaticNameIndex::from_json(json).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.entries()[0].id, CatalogId(1));
        assert_eq!(index.entries()[1].name, "Gabumon");
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(StaticNameIndex::from_json("{\"not\": \"an array\"}").is_err());
    }
}
