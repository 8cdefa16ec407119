use crate::catalog::ActionCatalog;
use crate::codegen::variables::{generate_variables_source, VariableTemplates, VARIABLES_FILE};
use crate::codegen::{generate_event_source, EventTemplates, GenerateError, ModEventItem};
use crate::model::GlobalVariable;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where generated sources go.
pub trait SourceSink {
    fn write(&mut self, path: &Path, contents: &str) -> Result<(), GenerateError>;
}

/// Writes sources under `base`; relative event paths resolve against it.
#[derive(Debug, Clone)]
pub struct FileSink {
    base: PathBuf,
}

impl FileSink {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }
}

impl SourceSink for FileSink {
    fn write(&mut self, path: &Path, contents: &str) -> Result<(), GenerateError> {
        let target = self.resolve(path);
        let wrap = |source| GenerateError::Write {
            path: target.clone(),
            source,
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(wrap)?;
        }
        fs::write(&target, contents).map_err(wrap)?;
        debug!(path = %target.display(), bytes = contents.len(), "source written");
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GenerateReport {
    pub written: Vec<PathBuf>,
    /// Code-mode-only events, left untouched.
    pub skipped: Vec<PathBuf>,
}

/// Generates and writes every event except code-mode-only ones. Stops at the
/// first failure.
pub fn write_events(
    items: &[ModEventItem],
    templates: &EventTemplates,
    events: &ActionCatalog,
    project_id: &str,
    sink: &mut dyn SourceSink,
) -> Result<GenerateReport, GenerateError> {
    let mut report = GenerateReport::default();
    for item in items {
        if item.is_code_mode_only {
            debug!(path = %item.file_path.display(), "code-mode-only event, not regenerated");
            report.skipped.push(item.file_path.clone());
            continue;
        }
        let source = generate_event_source(item, templates, events, project_id)?;
        sink.write(&item.file_path, &source)?;
        report.written.push(item.file_path.clone());
    }
    info!(
        written = report.written.len(),
        skipped = report.skipped.len(),
        "event sources generated"
    );
    Ok(report)
}

/// Generates the global variables class and writes it to [`VARIABLES_FILE`].
pub fn write_variables(
    variables: &[GlobalVariable],
    templates: &VariableTemplates,
    project_id: &str,
    sink: &mut dyn SourceSink,
) -> Result<PathBuf, GenerateError> {
    let source = generate_variables_source(variables, templates, project_id)?;
    let path = PathBuf::from(VARIABLES_FILE);
    sink.write(&path, &source)?;
    info!(variables = variables.len(), "global variables class generated");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct MemorySink {
        files: BTreeMap<PathBuf, String>,
    }

    impl SourceSink for MemorySink {
        fn write(&mut self, path: &Path, contents: &str) -> Result<(), GenerateError> {
            self.files.insert(path.to_path_buf(), contents.to_string());
            Ok(())
        }
    }

    fn templates() -> EventTemplates {
        EventTemplates {
            event: "class #CLASSNAME# { #EVENTCONTENT# }".to_string(),
            content: "#EVENTMETHOD#".to_string(),
        }
    }

    #[test]
    fn code_mode_only_events_are_never_regenerated() {
        let mut manual = ModEventItem::new("Manual.cs");
        manual.is_code_mode_only = true;
        let items = vec![ModEventItem::new("Auto.cs"), manual];
        let mut sink = MemorySink::default();

        let report = write_events(&items, &templates(), &ActionCatalog::default(), "P", &mut sink)
            .expect("generation should succeed");

        assert_eq!(report.written, vec![PathBuf::from("Auto.cs")]);
        assert_eq!(report.skipped, vec![PathBuf::from("Manual.cs")]);
        assert_eq!(
            sink.files.get(Path::new("Auto.cs")).map(String::as_str),
            Some("class Auto { public void Run() }")
        );
        assert!(!sink.files.contains_key(Path::new("Manual.cs")));
    }

    #[test]
    fn an_event_without_a_path_stops_generation() {
        let items = vec![ModEventItem::default(), ModEventItem::new("Late.cs")];
        let mut sink = MemorySink::default();
        let error = write_events(&items, &templates(), &ActionCatalog::default(), "P", &mut sink)
            .expect_err("missing path should fail");
        assert!(matches!(error, GenerateError::NoFilePath));
        assert!(sink.files.is_empty());
    }

    #[test]
    fn variables_class_lands_at_its_fixed_path() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut sink = FileSink::new(dir.path());
        let variables = vec![GlobalVariable::new("gold", "int", "5")];

        let path = write_variables(&variables, &VariableTemplates::builtin(), "MyMod", &mut sink)
            .expect("variables should write");

        assert_eq!(path, PathBuf::from(VARIABLES_FILE));
        let written = fs::read_to_string(dir.path().join(VARIABLES_FILE))
            .expect("variables class should read back");
        assert!(written.contains("public static int gold { get; set; } = 5;"));
    }

    #[test]
    fn invalid_variables_write_nothing() {
        let mut sink = MemorySink::default();
        let variables = vec![GlobalVariable::new("9lives", "int", "9")];
        let error = write_variables(&variables, &VariableTemplates::builtin(), "MyMod", &mut sink)
            .expect_err("invalid name should be refused");
        assert!(matches!(error, GenerateError::InvalidVariables(_)));
        assert!(sink.files.is_empty());
    }

    #[test]
    fn file_sink_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut sink = FileSink::new(dir.path());
        sink.write(Path::new("ModEvents/Nested/Tick.cs"), "body")
            .expect("file sink should write");

        let written = fs::read_to_string(dir.path().join("ModEvents/Nested/Tick.cs"))
            .expect("written file should read back");
        assert_eq!(written, "body");
    }
}
