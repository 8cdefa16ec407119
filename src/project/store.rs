use crate::catalog::ActionCatalog;
use crate::project::{Project, ProjectFile, ProjectLoad, SCHEMA_VERSION};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown schema_version in {path}: {found}")]
    UnknownSchema { path: PathBuf, found: u32 },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize project")]
    Serialize(#[source] serde_json::Error),
}

pub fn read_project_file(path: &Path) -> Result<ProjectFile, ProjectError> {
    let data = fs::read(path).map_err(|source| ProjectError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ProjectFile = serde_json::from_slice(&data).map_err(|source| ProjectError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if file.schema_version != SCHEMA_VERSION {
        return Err(ProjectError::UnknownSchema {
            path: path.to_path_buf(),
            found: file.schema_version,
        });
    }
    Ok(file)
}

/// Loads a project and rebuilds its trees against `catalog`. Problems inside
/// individual events come back as warnings.
pub fn load(path: &Path, catalog: &ActionCatalog) -> Result<ProjectLoad, ProjectError> {
    let file = read_project_file(path)?;
    let load = Project::from_file(file, catalog);
    for warning in &load.warnings {
        warn!(path = %path.display(), "{warning}");
    }
    debug!(
        path = %path.display(),
        events = load.project.events.len(),
        "project loaded"
    );
    Ok(load)
}

/// Writes through a sibling temp file and renames it over `path`.
pub fn save(path: &Path, project: &Project) -> Result<(), ProjectError> {
    let bytes = serde_json::to_vec_pretty(&project.to_file()).map_err(ProjectError::Serialize)?;
    let write_error = |source| ProjectError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, bytes).map_err(write_error)?;
    match fs::rename(&tmp_path, path) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if path.exists() {
                fs::remove_file(path).map_err(write_error)?;
                fs::rename(&tmp_path, path).map_err(write_error)
            } else {
                Err(write_error(rename_err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ActionDescriptor;
    use crate::codegen::ModEventItem;
    use crate::model::{GlobalVariable, SelectionValue};

    fn catalog() -> ActionCatalog {
        ActionCatalog::from_descriptors([ActionDescriptor::new("Wait")
            .with_code("Wait({0})")
            .with_parameter("Int32", "frames")])
    }

    #[test]
    fn save_then_load_keeps_trees_and_variables() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("nested").join("project.json");

        let mut project = Project::new("MyMod");
        project
            .global_variables
            .push(GlobalVariable::new("delay", "int", "3"));
        let mut item = ModEventItem::new("ModEvents/Wait.cs");
        let wait = item.actions.insert_detached(
            catalog().find("Wait").expect("catalog holds Wait"),
        );
        let root = item.actions.root();
        item.actions.append_child(root, wait).expect("root hosts children");
        item.actions
            .fill_slot(wait, 0, SelectionValue::variable(&project.global_variables[0]))
            .expect("slot fills");
        project.events.push(item);

        save(&path, &project).expect("project should save");
        assert!(!path.with_file_name("project.json.tmp").exists());

        let loaded = load(&path, &catalog()).expect("project should load");
        assert!(loaded.warnings.is_empty());
        assert_eq!(loaded.project.project_id, "MyMod");
        assert_eq!(loaded.project.global_variables, project.global_variables);
        let event = &loaded.project.events[0];
        let wait = event.actions.root_children()[0];
        assert_eq!(crate::resolve::resolve_code(&event.actions, wait), "Wait(delay)");
    }

    #[test]
    fn nested_actions_with_filled_slots_survive_save_and_load() {
        let catalog = ActionCatalog::from_descriptors([
            ActionDescriptor::new("Not")
                .with_display("Not {0}")
                .with_code("!{0}")
                .with_parameter("Boolean", "value"),
            ActionDescriptor::new("Equals")
                .with_display("{0} equals {1}")
                .with_code("{0} == {1}")
                .with_parameter("Object", "left")
                .with_parameter("Object", "right"),
        ]);
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("project.json");

        let mut project = Project::new("MyMod");
        let mut item = ModEventItem::new("ModEvents/Check.cs");
        let tree = &mut item.conditions;
        let not = tree.insert_detached(catalog.find("Not").expect("catalog holds Not"));
        let root = tree.root();
        tree.append_child(root, not).expect("root hosts children");
        let equals = tree.insert_detached(catalog.find("Equals").expect("catalog holds Equals"));
        tree.fill_slot(equals, 0, SelectionValue::literal("1", "Int32"))
            .expect("left slot fills");
        tree.fill_slot(not, 0, SelectionValue::EventAction(equals))
            .expect("Equals nests in Not");
        project.events.push(item);

        save(&path, &project).expect("project should save");
        let loaded = load(&path, &catalog).expect("nested project should load");

        assert!(loaded.warnings.is_empty());
        let conditions = &loaded.project.events[0].conditions;
        let not = conditions.root_children()[0];
        assert_eq!(
            crate::resolve::resolve_code(conditions, not),
            "!(1 == /* right */)"
        );
        assert_eq!(
            crate::resolve::resolve_display_name(conditions, not),
            "Not (1 equals {1})"
        );
    }

    #[test]
    fn save_replaces_an_existing_file() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("project.json");
        fs::write(&path, "stale").expect("stale fixture should write");

        save(&path, &Project::new("Fresh")).expect("project should save over stale file");
        let file = read_project_file(&path).expect("saved project should read");
        assert_eq!(file.project_id, "Fresh");
    }

    #[test]
    fn unknown_schema_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("project.json");
        fs::write(&path, r#"{"schema_version": 99, "project_id": "X"}"#)
            .expect("fixture should write");

        let error = read_project_file(&path).expect_err("unknown schema should fail");
        assert!(matches!(error, ProjectError::UnknownSchema { found: 99, .. }));
    }

    #[test]
    fn malformed_json_reports_the_path() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("broken.json");
        fs::write(&path, "{").expect("fixture should write");

        let error = load(&path, &catalog()).expect_err("broken json should fail");
        assert!(error.to_string().contains("broken.json"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let error = read_project_file(&dir.path().join("absent.json"))
            .expect_err("absent file should fail");
        assert!(matches!(error, ProjectError::Read { .. }));
    }
}
