//! Static asset manifest.
//!
//! In a production configuration assets are pre-built and minified; the
//! manifest maps each logical asset name to its versioned URL. It is loaded
//! once at startup, and a missing manifest is fatal: starting without it
//! would silently serve broken asset links.

use std::collections::HashMap;
use std::path::Path;

/// Error loading the asset manifest.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("cannot read asset manifest {path}: {source}; run the asset build before starting with mini_assets enabled")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("asset manifest {path} is not valid JSON: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Immutable mapping from logical asset name to versioned URL.
#[derive(Debug, Clone, Default)]
pub struct AssetMap {
    entries: HashMap<String, String>,
}

impl AssetMap {
    /// Empty map for configurations without pre-built assets; logical names
    /// resolve to themselves.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the manifest from disk.
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| AssetError::Read {
            path: display.clone(),
            source,
        })?;
        let entries = serde_json::from_str(&content).map_err(|source| AssetError::Parse {
            path: display,
            source,
        })?;
        Ok(Self { entries })
    }

    /// Resolve a logical asset name; unknown names pass through unchanged.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.entries.get(name).map(String::as_str).unwrap_or(name)
    }

    /// JSON view injected into the rendering locals.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_and_resolve() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{{\"index.js\": \"/public/index.min.873af2.js\"}}"
        )
        .unwrap();

        let assets = AssetMap::load(file.path()).unwrap();
        assert_eq!(assets.resolve("index.js"), "/public/index.min.873af2.js");
        assert_eq!(assets.resolve("other.css"), "other.css");
    }

    #[test]
    fn test_missing_manifest_is_an_error() {
        let err = AssetMap::load(Path::new("/nonexistent/assets.json")).unwrap_err();
        assert!(err.to_string().contains("run the asset build"));
    }

    #[test]
    fn test_empty_map_passes_names_through() {
        assert_eq!(AssetMap::empty().resolve("index.css"), "index.css");
    }
}
