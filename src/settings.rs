use crate::catalog::surface::{EVENT_TYPE, HELPER_TYPES};
use crate::catalog::{
    ActionCatalog, AssemblySurfaceProvider, BuiltinCatalogProvider, CatalogProvider,
    DirectoryCatalogProvider,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse settings {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// User-level configuration. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Extra `*.json` action definitions, merged after the bundled ones.
    pub user_catalog_dir: Option<PathBuf>,
    /// Exported surface of the mod library assembly.
    pub surface_manifest: Option<PathBuf>,
    pub helper_types: Vec<String>,
    pub event_types: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_catalog_dir: None,
            surface_manifest: None,
            helper_types: vec![HELPER_TYPES.to_string()],
            event_types: vec![EVENT_TYPE.to_string()],
        }
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("USERPROFILE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Settings {
    pub fn default_path() -> PathBuf {
        home_dir().join(".modcreator").join("settings.json")
    }

    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_slice(&data).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`Settings::load`], but a broken file only costs a warning.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|err| {
            warn!(error = %err, "settings ignored");
            Self::default()
        })
    }

    pub fn action_providers(&self) -> Vec<Box<dyn CatalogProvider>> {
        let mut providers: Vec<Box<dyn CatalogProvider>> =
            vec![Box::new(BuiltinCatalogProvider::default())];
        if let Some(dir) = &self.user_catalog_dir {
            providers.push(Box::new(DirectoryCatalogProvider::new("user", dir)));
        }
        if let Some(manifest) = &self.surface_manifest {
            providers.push(Box::new(
                AssemblySurfaceProvider::helpers(manifest).with_designated_types(self.helper_types.clone()),
            ));
        }
        providers
    }

    pub fn event_providers(&self) -> Vec<Box<dyn CatalogProvider>> {
        match &self.surface_manifest {
            Some(manifest) => vec![Box::new(
                AssemblySurfaceProvider::events(manifest).with_designated_types(self.event_types.clone()),
            )],
            None => Vec::new(),
        }
    }

    /// The shared action catalog, merged from these settings on first use.
    pub fn action_catalog(&self) -> &'static ActionCatalog {
        ActionCatalog::global_with(self.action_providers())
    }

    pub fn event_catalog(&self) -> ActionCatalog {
        ActionCatalog::load_all(&self.event_providers())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let settings = Settings::load(&dir.path().join("settings.json"))
            .expect("missing settings should not fail");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.action_providers().len(), 1);
        assert!(settings.event_providers().is_empty());
    }

    #[test]
    fn partial_file_keeps_defaults_and_ignores_unknown_keys() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"user_catalog_dir": "/opt/actions", "theme": "dark"}"#,
        )
        .expect("settings fixture should write");

        let settings = Settings::load(&path).expect("settings should parse");
        assert_eq!(settings.user_catalog_dir, Some(PathBuf::from("/opt/actions")));
        assert_eq!(settings.helper_types, vec![HELPER_TYPES.to_string()]);
        assert_eq!(settings.action_providers().len(), 2);
    }

    #[test]
    fn broken_file_is_an_error_but_load_or_default_recovers() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").expect("settings fixture should write");

        let error = Settings::load(&path).expect_err("broken settings should fail");
        assert!(matches!(error, SettingsError::Parse { .. }));
        assert_eq!(Settings::load_or_default(&path), Settings::default());
    }

    #[test]
    fn user_directory_actions_join_the_bundled_catalog() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        fs::write(
            dir.path().join("extra.json"),
            r#"[{"name": "Shout", "displayName": "Shout {0}", "code": "Shout({0})",
                 "parameters": [{"type": "String", "name": "text"}]}]"#,
        )
        .expect("catalog fixture should write");

        let settings = Settings {
            user_catalog_dir: Some(dir.path().to_path_buf()),
            ..Settings::default()
        };
        let catalog = ActionCatalog::load_all(&settings.action_providers());
        assert!(catalog.find("Shout").is_some());
        assert!(catalog.find("If").is_some());
    }
}
