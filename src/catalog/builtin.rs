use super::{
    parse_action_records, CatalogError, CatalogLoadDiagnostic, CatalogLoadOutput,
    CatalogProvider, CatalogSource, CatalogSourceKind,
};
use std::fs;
use std::path::PathBuf;

const BUILTIN_MODEVENT_ACTIONS: &str = include_str!("catalog_builtin/modevent-actions.json");

pub struct BuiltinCatalogProvider {
    source: CatalogSource,
    embedded_documents: Vec<&'static str>,
}

impl BuiltinCatalogProvider {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            source: CatalogSource {
                provider_id: provider_id.into(),
                kind: CatalogSourceKind::Builtin,
            },
            embedded_documents: vec![BUILTIN_MODEVENT_ACTIONS],
        }
    }
}

impl Default for BuiltinCatalogProvider {
    fn default() -> Self {
        Self::new("builtin-default")
    }
}

impl CatalogProvider for BuiltinCatalogProvider {
    fn source(&self) -> CatalogSource {
        self.source.clone()
    }

    fn load_actions(&self) -> Result<CatalogLoadOutput, CatalogError> {
        let mut output = CatalogLoadOutput::default();

        for (index, raw_document) in self.embedded_documents.iter().enumerate() {
            let document_ref = format!("embedded:{index}");
            match parse_action_records(raw_document, &self.source, &document_ref) {
                Ok(loaded) => {
                    output.actions.extend(loaded.actions);
                    output.diagnostics.extend(loaded.diagnostics);
                }
                Err(err) => output.diagnostics.push(CatalogLoadDiagnostic {
                    provider_id: self.source.provider_id.clone(),
                    record_ref: document_ref,
                    reason: err.to_string(),
                }),
            }
        }

        Ok(output)
    }
}

/// Loads every `*.json` action list found directly inside `root_dir`.
pub struct DirectoryCatalogProvider {
    source: CatalogSource,
    root_dir: PathBuf,
}

impl DirectoryCatalogProvider {
    pub fn new(provider_id: impl Into<String>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: CatalogSource {
                provider_id: provider_id.into(),
                kind: CatalogSourceKind::User,
            },
            root_dir: root_dir.into(),
        }
    }

    fn io_error(&self, path: PathBuf, source: std::io::Error) -> CatalogError {
        CatalogError::Io {
            provider_id: self.source.provider_id.clone(),
            path,
            source,
        }
    }
}

impl CatalogProvider for DirectoryCatalogProvider {
    fn source(&self) -> CatalogSource {
        self.source.clone()
    }

    fn load_actions(&self) -> Result<CatalogLoadOutput, CatalogError> {
        let mut output = CatalogLoadOutput::default();
        if !self.root_dir.exists() {
            return Ok(output);
        }

        let mut entries = fs::read_dir(&self.root_dir)
            .map_err(|err| self.io_error(self.root_dir.clone(), err))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next()
            .transpose()
            .map_err(|err| self.io_error(self.root_dir.clone(), err))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let document_ref = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("unknown")
                .to_string();

            let raw = fs::read_to_string(&path).map_err(|err| self.io_error(path.clone(), err))?;

            match parse_action_records(&raw, &self.source, &document_ref) {
                Ok(loaded) => {
                    output.actions.extend(loaded.actions);
                    output.diagnostics.extend(loaded.diagnostics);
                }
                Err(err) => output.diagnostics.push(CatalogLoadDiagnostic {
                    provider_id: self.source.provider_id.clone(),
                    record_ref: document_ref,
                    reason: err.to_string(),
                }),
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ActionCatalog;

    #[test]
    fn builtin_provider_loads_embedded_actions() {
        let provider = BuiltinCatalogProvider::default();
        let loaded = provider.load_actions().expect("builtin load should succeed");
        assert!(loaded.diagnostics.is_empty(), "{:?}", loaded.diagnostics);
        assert!(loaded.actions.iter().any(|action| action.name == "Not"));
        assert!(loaded.actions.iter().any(|action| action.has_body));
    }

    #[test]
    fn builtin_sub_items_resolve_inside_the_builtin_catalog() {
        let providers: Vec<Box<dyn CatalogProvider>> =
            vec![Box::new(BuiltinCatalogProvider::default())];
        let catalog = ActionCatalog::load_all(&providers);
        for action in catalog.actions() {
            for sub_item in &action.sub_items {
                assert!(
                    catalog.find(sub_item).is_some(),
                    "{} references missing sub item {sub_item}",
                    action.name
                );
            }
        }
    }

    #[test]
    fn directory_provider_reads_json_files_in_name_order() {
        let root = tempfile::tempdir().expect("temp dir should be created");
        fs::write(root.path().join("b.json"), r#"[{"name": "Second"}]"#)
            .expect("fixture should be written");
        fs::write(root.path().join("a.json"), r#"[{"name": "First"}]"#)
            .expect("fixture should be written");
        fs::write(root.path().join("notes.txt"), "ignored").expect("fixture should be written");

        let provider = DirectoryCatalogProvider::new("user-test", root.path());
        let loaded = provider.load_actions().expect("load should succeed");
        let names: Vec<&str> = loaded.actions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn directory_provider_reports_unparsable_documents() {
        let root = tempfile::tempdir().expect("temp dir should be created");
        fs::write(root.path().join("broken.json"), r#"{"name": "NotAList"}"#)
            .expect("fixture should be written");
        fs::write(root.path().join("ok.json"), r#"[{"name": "Fine"}]"#)
            .expect("fixture should be written");

        let provider = DirectoryCatalogProvider::new("user-test", root.path());
        let loaded = provider.load_actions().expect("load should succeed");
        assert_eq!(loaded.actions.len(), 1);
        assert_eq!(loaded.diagnostics.len(), 1);
        assert_eq!(loaded.diagnostics[0].record_ref, "broken.json");
    }

    #[test]
    fn missing_directory_is_an_empty_source() {
        let root = tempfile::tempdir().expect("temp dir should be created");
        let provider = DirectoryCatalogProvider::new("user-test", root.path().join("absent"));
        let loaded = provider.load_actions().expect("missing dir should not fail");
        assert!(loaded.actions.is_empty());
        assert!(loaded.diagnostics.is_empty());
    }
}
