//! Action discovery from an exported description of the game's mod library.
//!
//! The manifest lists the public types of the module together with their
//! methods, parameters and attribute data. Only the shape is read here; no
//! code from the module is ever executed.

use super::{
    ActionDescriptor, CatalogError, CatalogLoadOutput, CatalogProvider, CatalogSource,
    CatalogSourceKind, ParameterDescriptor,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub const SURFACE_SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_CATEGORY: &str = "Others";
pub const CATEGORY_ATTRIBUTE: &str = "ModLib.Attributes.EventCatAttribute";
pub const IGNORE_ATTRIBUTE: &str = "ModLib.Attributes.IgnoreAttribute";
pub const OBSOLETE_ATTRIBUTE: &str = "System.ObsoleteAttribute";
pub const EVENT_TYPE: &str = "ModLib.Mod.ModEvent";
pub const HELPER_TYPES: &str = "ModLib.Helper.*";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceManifest {
    pub schema_version: u32,
    #[serde(default)]
    pub assembly: String,
    #[serde(default)]
    pub types: Vec<SurfaceType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceType {
    pub full_name: String,
    #[serde(default)]
    pub methods: Vec<SurfaceMethod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceMethod {
    pub name: String,
    #[serde(default = "void_type")]
    pub return_type: String,
    #[serde(default)]
    pub is_special_name: bool,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub attributes: Vec<SurfaceAttribute>,
    #[serde(default)]
    pub parameters: Vec<SurfaceParameter>,
}

fn void_type() -> String {
    super::VOID_TYPE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceAttribute {
    pub type_name: String,
    #[serde(default)]
    pub arguments: Vec<Value>,
}

impl SurfaceAttribute {
    fn is(&self, wanted: &str) -> bool {
        self.type_name == wanted || wanted.rsplit('.').next() == Some(self.type_name.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceParameter {
    #[serde(rename = "type")]
    pub param_type: String,
    pub name: String,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub default_value: Option<Value>,
}

pub struct AssemblySurfaceProvider {
    source: CatalogSource,
    manifest_path: PathBuf,
    designated_types: Vec<String>,
    require_virtual: bool,
    call_templates: bool,
}

impl AssemblySurfaceProvider {
    pub fn new(
        provider_id: impl Into<String>,
        manifest_path: impl Into<PathBuf>,
        designated_types: Vec<String>,
    ) -> Self {
        Self {
            source: CatalogSource {
                provider_id: provider_id.into(),
                kind: CatalogSourceKind::Assembly,
            },
            manifest_path: manifest_path.into(),
            designated_types,
            require_virtual: false,
            call_templates: false,
        }
    }

    /// Static helper methods usable as actions and conditions. Their code is
    /// a call such as `UnitHelper.AddMoney({0}, {1})`.
    pub fn helpers(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            call_templates: true,
            ..Self::new("assembly-helpers", manifest_path, vec![HELPER_TYPES.to_string()])
        }
    }

    /// Overridable event hooks of the mod event base type.
    pub fn events(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            require_virtual: true,
            ..Self::new("assembly-events", manifest_path, vec![EVENT_TYPE.to_string()])
        }
    }

    pub fn with_designated_types(mut self, designated_types: Vec<String>) -> Self {
        self.designated_types = designated_types;
        self
    }

    fn is_designated(&self, full_name: &str) -> bool {
        self.designated_types.iter().any(|pattern| {
            match pattern.strip_suffix(".*") {
                Some(prefix) => full_name
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('.')),
                None => pattern == full_name,
            }
        })
    }

    fn is_eligible(&self, method: &SurfaceMethod) -> bool {
        if method.is_special_name || (self.require_virtual && !method.is_virtual) {
            return false;
        }
        !method
            .attributes
            .iter()
            .any(|attribute| attribute.is(IGNORE_ATTRIBUTE) || attribute.is(OBSOLETE_ATTRIBUTE))
    }

    fn read_manifest(&self) -> Option<SurfaceManifest> {
        let raw = match fs::read_to_string(&self.manifest_path) {
            Ok(raw) => raw,
            Err(err) => {
                debug!(path = %self.manifest_path.display(), %err, "assembly surface unavailable");
                return None;
            }
        };
        let manifest: SurfaceManifest = match serde_json::from_str(&raw) {
            Ok(manifest) => manifest,
            Err(err) => {
                debug!(path = %self.manifest_path.display(), %err, "assembly surface unreadable");
                return None;
            }
        };
        if manifest.schema_version != SURFACE_SCHEMA_VERSION {
            debug!(
                path = %self.manifest_path.display(),
                schema_version = manifest.schema_version,
                "assembly surface has unsupported schema version"
            );
            return None;
        }
        Some(manifest)
    }

    pub fn discover(&self, manifest: &SurfaceManifest) -> Vec<ActionDescriptor> {
        let mut actions = Vec::new();
        for surface_type in &manifest.types {
            if !self.is_designated(&surface_type.full_name) {
                continue;
            }
            for method in &surface_type.methods {
                if self.is_eligible(method) {
                    actions.push(describe_method(&surface_type.full_name, method, self.call_templates));
                }
            }
        }
        actions
    }
}

impl CatalogProvider for AssemblySurfaceProvider {
    fn source(&self) -> CatalogSource {
        self.source.clone()
    }

    fn load_actions(&self) -> Result<CatalogLoadOutput, CatalogError> {
        let actions = self
            .read_manifest()
            .map(|manifest| self.discover(&manifest))
            .unwrap_or_default();
        Ok(CatalogLoadOutput {
            actions,
            diagnostics: Vec::new(),
        })
    }
}

/// Code is the method signature, which event headers are built from. With
/// `call_templates` it is a call with one placeholder per parameter instead.
fn describe_method(type_name: &str, method: &SurfaceMethod, call_templates: bool) -> ActionDescriptor {
    let signature = method
        .parameters
        .iter()
        .map(|parameter| format!("{} {}", parameter.param_type, parameter.name))
        .collect::<Vec<_>>()
        .join(", ");
    let arguments = (0..method.parameters.len())
        .map(|index| format!("{{{index}}}"))
        .collect::<Vec<_>>()
        .join(", ");

    let category = method
        .attributes
        .iter()
        .find(|attribute| attribute.is(CATEGORY_ATTRIBUTE))
        .and_then(|attribute| attribute.arguments.first())
        .and_then(argument_text)
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    let short_type = type_name.rsplit('.').next().unwrap_or(type_name);

    let (display_name, code) = if !call_templates {
        (
            method.name.clone(),
            format!("{} {}({signature})", method.return_type, method.name),
        )
    } else if method.parameters.is_empty() {
        (method.name.clone(), format!("{short_type}.{}()", method.name))
    } else {
        (
            format!("{}({arguments})", method.name),
            format!("{short_type}.{}({arguments})", method.name),
        )
    };

    ActionDescriptor {
        category,
        name: method.name.clone(),
        display_name,
        description: format!("{short_type} method: {}", method.name),
        code,
        parameters: method
            .parameters
            .iter()
            .map(|parameter| ParameterDescriptor {
                param_type: parameter.param_type.clone(),
                name: parameter.name.clone(),
                is_optional: parameter.is_optional,
                default_value: parameter
                    .default_value
                    .as_ref()
                    .and_then(argument_text)
                    .unwrap_or_default(),
            })
            .collect(),
        return_type: method.return_type.clone(),
        has_body: false,
        can_add_child: false,
        is_hidden: false,
        sub_items: Vec::new(),
    }
}

fn argument_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
