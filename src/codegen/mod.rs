//! Event source generation: fills the project's two event templates from a
//! [`ModEventItem`] and hands the result to a [`SourceSink`]. The global
//! variables class is produced the same way by [`variables`].

pub mod sink;
pub mod variables;

pub use sink::{write_events, write_variables, FileSink, GenerateReport, SourceSink};
pub use variables::{generate_variables_source, VariableTemplates, VARIABLES_FILE};

use crate::catalog::ActionCatalog;
use crate::model::{ActionTree, VariableIssue};
use crate::resolve::{combine_conditions, condition_parts, emit_block, BlockKind, ConditionLogic};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const EVENT_TEMPLATE_FILE: &str = "EventTemplate.tmp";
pub const EVENT_CONTENT_TEMPLATE_FILE: &str = "EventTemplateContent.tmp";

/// Statement depth of the action block inside the content template.
pub const ACTION_INDENT: usize = 3;

const DEFAULT_METHOD_NAME: &str = "Run";
const DEFAULT_CACHE_TYPE: &str = "Local";
const DEFAULT_WORK_ON: &str = "All";

const BUILTIN_EVENT_TEMPLATE: &str = include_str!("templates/EventTemplate.tmp");
const BUILTIN_CONTENT_TEMPLATE: &str = include_str!("templates/EventTemplateContent.tmp");

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("event has no file path")]
    NoFilePath,

    #[error("project has no global variables")]
    NoVariables,

    #[error("{} global variable issue(s)", .0.len())]
    InvalidVariables(Vec<VariableIssue>),

    #[error("failed to read template {path}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventMode {
    /// Overrides a lifecycle method of the mod event base type.
    #[default]
    ModEvent,
    /// A plain method the mod calls itself.
    NonEvent,
}

/// One generated source file and the trees it is built from.
#[derive(Debug, Clone, Default)]
pub struct ModEventItem {
    pub file_path: PathBuf,
    pub event_mode: EventMode,
    pub custom_event_name: String,
    pub cache_type: String,
    pub work_on: String,
    pub order_index: i32,
    pub selected_event: String,
    pub condition_logic: ConditionLogic,
    pub conditions: ActionTree,
    pub actions: ActionTree,
    /// Edited as raw source; never regenerated from the trees.
    pub is_code_mode_only: bool,
}

impl ModEventItem {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Self::default()
        }
    }

    pub fn class_name(&self) -> String {
        self.file_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Method header for the content template.
    pub fn event_method(&self, events: &ActionCatalog) -> String {
        match self.event_mode {
            EventMode::ModEvent if !self.selected_event.is_empty() => {
                match events.find(&self.selected_event) {
                    Some(event) => format!("public override {}", event.code),
                    None => format!("public override void {}()", self.selected_event),
                }
            }
            _ => {
                let name = if self.custom_event_name.trim().is_empty() {
                    DEFAULT_METHOD_NAME
                } else {
                    self.custom_event_name.trim()
                };
                format!("public void {name}()")
            }
        }
    }

    pub fn condition_code(&self) -> String {
        let root = self.conditions.root();
        combine_conditions(&condition_parts(&self.conditions, &[root]), self.condition_logic)
    }

    pub fn action_code(&self) -> String {
        let root = self.actions.root();
        let code = emit_block(&self.actions, &[root], ACTION_INDENT, BlockKind::Actions);
        if code.is_empty() {
            format!("{}// No actions", crate::resolve::emit::INDENT_UNIT.repeat(ACTION_INDENT))
        } else {
            code
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTemplates {
    /// Whole file; holds `#EVENTCONTENT#`.
    pub event: String,
    /// One method; holds `#EVENTMETHOD#`, `#CONDITION#` and `#ACTION#`.
    pub content: String,
}

impl EventTemplates {
    pub fn builtin() -> Self {
        Self {
            event: BUILTIN_EVENT_TEMPLATE.to_string(),
            content: BUILTIN_CONTENT_TEMPLATE.to_string(),
        }
    }

    /// Reads both template files from a project directory.
    pub fn load(dir: &Path) -> Result<Self, GenerateError> {
        let read = |name: &str| {
            let path = dir.join(name);
            fs::read_to_string(&path).map_err(|source| GenerateError::TemplateRead { path, source })
        };
        Ok(Self {
            event: read(EVENT_TEMPLATE_FILE)?,
            content: read(EVENT_CONTENT_TEMPLATE_FILE)?,
        })
    }
}

fn qualified(prefix: &str, value: &str, default: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        format!("{prefix}.{default}")
    } else {
        format!("{prefix}.{value}")
    }
}

/// Full source text of one event file.
pub fn generate_event_source(
    item: &ModEventItem,
    templates: &EventTemplates,
    events: &ActionCatalog,
    project_id: &str,
) -> Result<String, GenerateError> {
    if item.file_path.as_os_str().is_empty() {
        return Err(GenerateError::NoFilePath);
    }

    let content = templates
        .content
        .replace("#EVENTMETHOD#", &item.event_method(events))
        .replace("#CONDITION#", &item.condition_code())
        .replace("#ACTION#", &item.action_code());

    Ok(templates
        .event
        .replace("#PROJECTID#", project_id)
        .replace("#CLASSNAME#", &item.class_name())
        .replace(
            "#CACHETYPE#",
            &qualified("CacheAttribute.CType", &item.cache_type, DEFAULT_CACHE_TYPE),
        )
        .replace(
            "#WORKON#",
            &qualified("CacheAttribute.WType", &item.work_on, DEFAULT_WORK_ON),
        )
        .replace("#ORDERINDEX#", &item.order_index.to_string())
        .replace("#EVENTCONTENT#", &content))
}
