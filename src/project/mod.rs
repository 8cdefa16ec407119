pub mod store;

pub use store::ProjectError;

use crate::catalog::ActionCatalog;
use crate::codegen::{EventMode, ModEventItem};
use crate::model::{ActionNodeDoc, ActionTree, GlobalVariable};
use crate::resolve::ConditionLogic;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const SCHEMA_VERSION: u32 = 1;

/// On-disk project layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub schema_version: u32,
    pub project_id: String,
    #[serde(default)]
    pub global_variables: Vec<GlobalVariable>,
    #[serde(default)]
    pub events: Vec<EventDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDocument {
    pub file_path: PathBuf,
    #[serde(default)]
    pub event_mode: EventMode,
    #[serde(default)]
    pub custom_event_name: String,
    #[serde(default)]
    pub cache_type: String,
    #[serde(default)]
    pub work_on: String,
    #[serde(default)]
    pub order_index: i32,
    #[serde(default)]
    pub selected_event: String,
    #[serde(default)]
    pub condition_logic: ConditionLogic,
    #[serde(default)]
    pub conditions: Vec<ActionNodeDoc>,
    #[serde(default)]
    pub actions: Vec<ActionNodeDoc>,
    #[serde(default)]
    pub is_code_mode_only: bool,
}

impl EventDocument {
    pub fn from_item(item: &ModEventItem) -> Self {
        Self {
            file_path: item.file_path.clone(),
            event_mode: item.event_mode,
            custom_event_name: item.custom_event_name.clone(),
            cache_type: item.cache_type.clone(),
            work_on: item.work_on.clone(),
            order_index: item.order_index,
            selected_event: item.selected_event.clone(),
            condition_logic: item.condition_logic,
            conditions: item.conditions.to_document(),
            actions: item.actions.to_document(),
            is_code_mode_only: item.is_code_mode_only,
        }
    }

    /// Rebuilds the event against `catalog`. The second value lists the
    /// descriptor names that could not be resolved.
    pub fn to_item(&self, catalog: &ActionCatalog) -> (ModEventItem, Vec<String>) {
        let conditions = ActionTree::from_document(&self.conditions, catalog);
        let actions = ActionTree::from_document(&self.actions, catalog);
        let mut unresolved = conditions.unresolved;
        unresolved.extend(actions.unresolved);

        let item = ModEventItem {
            file_path: self.file_path.clone(),
            event_mode: self.event_mode,
            custom_event_name: self.custom_event_name.clone(),
            cache_type: self.cache_type.clone(),
            work_on: self.work_on.clone(),
            order_index: self.order_index,
            selected_event: self.selected_event.clone(),
            condition_logic: self.condition_logic,
            conditions: conditions.tree,
            actions: actions.tree,
            is_code_mode_only: self.is_code_mode_only,
        };
        (item, unresolved)
    }
}

/// A project with its event trees materialized.
#[derive(Debug, Clone, Default)]
pub struct Project {
    pub project_id: String,
    pub global_variables: Vec<GlobalVariable>,
    pub events: Vec<ModEventItem>,
}

#[derive(Debug, Clone)]
pub struct ProjectLoad {
    pub project: Project,
    pub warnings: Vec<String>,
}

impl Project {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Self::default()
        }
    }

    pub fn from_file(file: ProjectFile, catalog: &ActionCatalog) -> ProjectLoad {
        let mut warnings = Vec::new();
        let events = file
            .events
            .iter()
            .map(|document| {
                let (item, unresolved) = document.to_item(catalog);
                warnings.extend(unresolved.into_iter().map(|name| {
                    format!(
                        "{}: action '{name}' not found in catalog",
                        document.file_path.display()
                    )
                }));
                item
            })
            .collect();

        warnings.extend(
            crate::model::variable::validate_variables(&file.global_variables)
                .iter()
                .map(ToString::to_string),
        );

        ProjectLoad {
            project: Project {
                project_id: file.project_id,
                global_variables: file.global_variables,
                events,
            },
            warnings,
        }
    }

    pub fn to_file(&self) -> ProjectFile {
        ProjectFile {
            schema_version: SCHEMA_VERSION,
            project_id: self.project_id.clone(),
            global_variables: self.global_variables.clone(),
            events: self.events.iter().map(EventDocument::from_item).collect(),
        }
    }

    pub fn event(&self, file_name: &str) -> Option<&ModEventItem> {
        self.events.iter().find(|event| {
            event.file_path.as_os_str() == file_name
                || event.file_path.file_name().is_some_and(|name| name == file_name)
                || event.class_name() == file_name
        })
    }
}
