//! Registry of the actions a user can place into a condition or action list.
//!
//! Descriptors come from one or more [`CatalogProvider`]s and are frozen into
//! an [`ActionCatalog`] once loaded.

mod builtin;
pub mod surface;

pub use builtin::{BuiltinCatalogProvider, DirectoryCatalogProvider};
pub use surface::{AssemblySurfaceProvider, SurfaceManifest, SurfaceMethod, SurfaceType};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::{debug, warn};

pub const ROOT_NAME: &str = "Root";
pub const ALL_CATEGORIES: &str = "All";
pub const VOID_TYPE: &str = "Void";

/// Return types that accept any non-void action.
pub const ANY_VALUE_TYPES: [&str; 2] = ["Object", "dynamic"];

pub fn is_any_value_type(type_name: &str) -> bool {
    ANY_VALUE_TYPES.contains(&type_name.trim())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescriptor {
    #[serde(rename = "type")]
    pub param_type: String,
    pub name: String,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub default_value: String,
}

impl ParameterDescriptor {
    pub fn new(param_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            param_type: param_type.into(),
            name: name.into(),
            is_optional: false,
            default_value: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDescriptor {
    #[serde(default)]
    pub category: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
    #[serde(default, rename = "return")]
    pub return_type: String,
    #[serde(default)]
    pub has_body: bool,
    #[serde(default = "default_can_add_child", rename = "isCanAddChild")]
    pub can_add_child: bool,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub sub_items: Vec<String>,
}

fn default_can_add_child() -> bool {
    true
}

impl ActionDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            category: String::new(),
            display_name: name.clone(),
            name,
            description: String::new(),
            code: String::new(),
            parameters: Vec::new(),
            return_type: String::new(),
            has_body: false,
            can_add_child: false,
            is_hidden: false,
            sub_items: Vec::new(),
        }
    }

    /// The sentinel heading every condition and action list.
    pub fn root() -> Self {
        Self {
            category: ROOT_NAME.to_string(),
            name: ROOT_NAME.to_string(),
            display_name: ROOT_NAME.to_string(),
            description: "The root element of event-actions.".to_string(),
            code: ROOT_NAME.to_string(),
            parameters: Vec::new(),
            return_type: String::new(),
            has_body: false,
            can_add_child: true,
            is_hidden: false,
            sub_items: Vec::new(),
        }
    }

    /// Stand-in for a name the catalog does not know. Its templates are empty,
    /// so it renders as nothing and is skipped during emission.
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            description: "unresolved catalog entry".to_string(),
            display_name: String::new(),
            ..Self::new(name)
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_display(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_parameter(mut self, param_type: &str, name: &str) -> Self {
        self.parameters.push(ParameterDescriptor::new(param_type, name));
        self
    }

    pub fn with_return(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = return_type.into();
        self
    }

    pub fn with_body(mut self) -> Self {
        self.has_body = true;
        self.can_add_child = true;
        self
    }

    pub fn with_sub_items(mut self, names: &[&str]) -> Self {
        self.sub_items = names.iter().map(|name| name.to_string()).collect();
        self
    }

    pub fn is_root(&self) -> bool {
        self.name == ROOT_NAME
    }

    pub fn is_return(&self) -> bool {
        let return_type = self.return_type.trim();
        !return_type.is_empty() && return_type != VOID_TYPE
    }

    pub fn hosts_children(&self) -> bool {
        self.can_add_child || self.has_body
    }

    pub fn display_text(&self) -> String {
        if self.category.is_empty() {
            self.display_name.clone()
        } else {
            format!("{} - {}", self.category, self.display_name)
        }
    }

    pub fn parameter(&self, index: usize) -> Option<&ParameterDescriptor> {
        self.parameters.get(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSourceKind {
    Builtin,
    User,
    Assembly,
}

impl CatalogSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::User => "user",
            Self::Assembly => "assembly",
        }
    }
}

impl fmt::Display for CatalogSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSource {
    pub provider_id: String,
    pub kind: CatalogSourceKind,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogLoadOutput {
    pub actions: Vec<ActionDescriptor>,
    pub diagnostics: Vec<CatalogLoadDiagnostic>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLoadDiagnostic {
    pub provider_id: String,
    pub record_ref: String,
    pub reason: String,
}

impl CatalogLoadDiagnostic {
    pub fn to_log_line(&self) -> String {
        format!(
            "catalog load rejected provider={} record_ref={} reason={}",
            self.provider_id, self.record_ref, self.reason
        )
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("provider {provider_id} io error at {}: {source}", path.display())]
    Io {
        provider_id: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("provider {provider_id} document is not a list of actions: {message}")]
    Document {
        provider_id: String,
        message: String,
    },
}

/// A source of action descriptors.
pub trait CatalogProvider {
    fn source(&self) -> CatalogSource;

    fn load_actions(&self) -> Result<CatalogLoadOutput, CatalogError>;
}

/// Parses a JSON array of action records. A record that fails to parse or
/// lacks a name is reported and skipped; the others are kept.
pub(crate) fn parse_action_records(
    raw: &str,
    source: &CatalogSource,
    document_ref: &str,
) -> Result<CatalogLoadOutput, CatalogError> {
    let records: Vec<Value> =
        serde_json::from_str(raw).map_err(|err| CatalogError::Document {
            provider_id: source.provider_id.clone(),
            message: format!("{document_ref}: {err}"),
        })?;

    let mut output = CatalogLoadOutput::default();
    for (index, record) in records.into_iter().enumerate() {
        let record_ref = format!("{document_ref}#{index}");
        match parse_action_record(record) {
            Ok(action) => output.actions.push(action),
            Err(reason) => output.diagnostics.push(CatalogLoadDiagnostic {
                provider_id: source.provider_id.clone(),
                record_ref,
                reason,
            }),
        }
    }
    Ok(output)
}

fn parse_action_record(record: Value) -> Result<ActionDescriptor, String> {
    let mut action: ActionDescriptor =
        serde_json::from_value(record).map_err(|err| format!("record parse failed: {err}"))?;

    action.name = action.name.trim().to_string();
    action.category = action.category.trim().to_string();
    action.return_type = action.return_type.trim().to_string();
    if action.name.is_empty() {
        return Err("name is required".to_string());
    }
    if action.display_name.trim().is_empty() {
        action.display_name = action.name.clone();
    }
    action.sub_items.retain(|name| !name.trim().is_empty());
    Ok(action)
}

/// Frozen set of descriptors. Cheap to clone; entries are shared.
#[derive(Debug, Clone, Default)]
pub struct ActionCatalog {
    actions: Vec<Arc<ActionDescriptor>>,
    diagnostics: Vec<CatalogLoadDiagnostic>,
}

static GLOBAL_CATALOG: OnceLock<ActionCatalog> = OnceLock::new();

fn memoized<F>(cell: &OnceLock<ActionCatalog>, providers: F) -> &ActionCatalog
where
    F: FnOnce() -> Vec<Box<dyn CatalogProvider>>,
{
    cell.get_or_init(|| ActionCatalog::load_all(&providers()))
}

impl ActionCatalog {
    /// Merges every provider in order. The first descriptor with a given name
    /// wins; later duplicates are reported.
    pub fn load_all(providers: &[Box<dyn CatalogProvider>]) -> Self {
        let mut actions = Vec::new();
        let mut diagnostics = Vec::new();
        let mut seen = HashSet::new();

        for provider in providers {
            let source = provider.source();
            let output = match provider.load_actions() {
                Ok(output) => output,
                Err(err) => {
                    diagnostics.push(CatalogLoadDiagnostic {
                        provider_id: source.provider_id.clone(),
                        record_ref: "provider".to_string(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            diagnostics.extend(output.diagnostics);
            for action in output.actions {
                if !seen.insert(action.name.clone()) {
                    diagnostics.push(CatalogLoadDiagnostic {
                        provider_id: source.provider_id.clone(),
                        record_ref: action.name.clone(),
                        reason: "duplicate action name".to_string(),
                    });
                    continue;
                }
                actions.push(Arc::new(action));
            }
            debug!(provider = %source.provider_id, kind = %source.kind, "catalog provider loaded");
        }

        for diagnostic in &diagnostics {
            warn!("{}", diagnostic.to_log_line());
        }

        Self {
            actions,
            diagnostics,
        }
    }

    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ActionDescriptor>) -> Self {
        Self {
            actions: descriptors.into_iter().map(Arc::new).collect(),
            diagnostics: Vec::new(),
        }
    }

    /// Process-wide catalog, built on first use. Unless
    /// [`ActionCatalog::global_with`] ran first, it holds the bundled
    /// definitions only.
    pub fn global() -> &'static ActionCatalog {
        memoized(&GLOBAL_CATALOG, || {
            let providers: Vec<Box<dyn CatalogProvider>> =
                vec![Box::new(BuiltinCatalogProvider::default())];
            providers
        })
    }

    /// Process-wide catalog merged from `providers`. Only the first call that
    /// reaches the shared catalog builds it; later calls return that one.
    pub fn global_with(providers: Vec<Box<dyn CatalogProvider>>) -> &'static ActionCatalog {
        memoized(&GLOBAL_CATALOG, || providers)
    }

    pub fn actions(&self) -> &[Arc<ActionDescriptor>] {
        &self.actions
    }

    pub fn visible(&self) -> Vec<Arc<ActionDescriptor>> {
        self.actions
            .iter()
            .filter(|action| !action.is_hidden)
            .cloned()
            .collect()
    }

    pub fn diagnostics(&self) -> &[CatalogLoadDiagnostic] {
        &self.diagnostics
    }

    pub fn find(&self, name: &str) -> Option<Arc<ActionDescriptor>> {
        self.actions
            .iter()
            .find(|action| action.name == name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Keeps the descriptors whose return type fits a slot of type `wanted`.
pub fn filter_by_return_type(
    candidates: &[Arc<ActionDescriptor>],
    wanted: &str,
) -> Vec<Arc<ActionDescriptor>> {
    let wanted = wanted.trim();
    if wanted.is_empty() {
        return candidates.to_vec();
    }

    candidates
        .iter()
        .filter(|action| {
            if is_any_value_type(wanted) {
                action.is_return()
            } else {
                action.return_type == wanted
            }
        })
        .cloned()
        .collect()
}

pub fn categories_of(candidates: &[Arc<ActionDescriptor>]) -> Vec<String> {
    let distinct: BTreeSet<&str> = candidates
        .iter()
        .map(|action| action.category.as_str())
        .filter(|category| !category.is_empty() && *category != ALL_CATEGORIES)
        .collect();

    std::iter::once(ALL_CATEGORIES.to_string())
        .chain(distinct.into_iter().map(str::to_string))
        .collect()
}

/// Picker filtering: category first, then a case-insensitive text match on
/// display name, description or name.
pub fn search(
    candidates: &[Arc<ActionDescriptor>],
    category: Option<&str>,
    text: &str,
) -> Vec<Arc<ActionDescriptor>> {
    let category = category
        .map(str::trim)
        .filter(|category| !category.is_empty() && *category != ALL_CATEGORIES);
    let needle = text.trim().to_lowercase();

    candidates
        .iter()
        .filter(|action| category.map_or(true, |category| action.category == category))
        .filter(|action| {
            needle.is_empty()
                || action.display_name.to_lowercase().contains(&needle)
                || action.description.to_lowercase().contains(&needle)
                || action.name.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}
