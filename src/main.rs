use clap::{Parser, Subcommand};
use modcreator::catalog::{categories_of, filter_by_return_type, search, ActionCatalog};
use modcreator::codegen::{write_events, write_variables, EventTemplates, FileSink, VariableTemplates};
use modcreator::model::variable::validate_variables;
use modcreator::project::{store, ProjectLoad};
use modcreator::resolve::{outline, resolve_code};
use modcreator::settings::Settings;
use std::path::{Path, PathBuf};
use tracing::info;

/// Command line front end for mod event projects.
#[derive(Parser, Debug)]
#[command(name = "modcreator")]
#[command(about = "Browse mod actions, preview event trees and generate event sources")]
struct Args {
    /// Settings file; defaults to ~/.modcreator/settings.json
    #[arg(long, value_name = "PATH", global = true)]
    settings: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query the action catalog
    Catalog {
        #[command(subcommand)]
        query: CatalogQuery,
    },
    /// List overridable event methods
    Events,
    /// Validate the global variables of a project
    Vars { project: PathBuf },
    /// Print the condition and action trees of a project
    Preview {
        project: PathBuf,
        /// Only this event (file name or class name)
        #[arg(long)]
        event: Option<String>,
    },
    /// Write event sources and the global variables class of a project
    Generate {
        project: PathBuf,
        /// Directory holding EventTemplate.tmp and EventTemplateContent.tmp
        #[arg(long, value_name = "DIR")]
        templates: Option<PathBuf>,
        /// Output root; defaults to the project file's directory
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum CatalogQuery {
    List {
        #[arg(long, value_name = "TYPE")]
        return_type: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    Categories {
        #[arg(long, value_name = "TYPE")]
        return_type: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    setup_tracing(args.verbose);

    let settings_path = args.settings.unwrap_or_else(Settings::default_path);
    let settings = Settings::load_or_default(&settings_path);

    match args.command {
        Command::Catalog { query } => run_catalog(settings.action_catalog(), query),
        Command::Events => {
            for event in settings.event_catalog().actions() {
                println!("{:<24} {}", event.name, event.code);
            }
        }
        Command::Vars { project } => {
            let load = load_project(&project, &settings)?;
            let issues = validate_variables(&load.project.global_variables);
            for variable in &load.project.global_variables {
                println!("{} : {} = {}", variable.name, variable.var_type, variable.value);
            }
            for issue in &issues {
                println!("error: {issue}");
            }
            if !issues.is_empty() {
                return Err(format!("{} variable issue(s)", issues.len()).into());
            }
        }
        Command::Preview { project, event } => {
            let load = load_project(&project, &settings)?;
            let events: Vec<_> = match &event {
                Some(name) => load
                    .project
                    .event(name)
                    .map(|found| vec![found])
                    .ok_or_else(|| format!("no event named {name}"))?,
                None => load.project.events.iter().collect(),
            };
            for item in events {
                println!("{} [{:?}]", item.file_path.display(), item.condition_logic);
                for (title, tree) in [("conditions", &item.conditions), ("actions", &item.actions)] {
                    println!("  {title}:");
                    for line in outline(tree) {
                        println!(
                            "    {}{}    => {}",
                            "  ".repeat(line.depth),
                            line.text,
                            resolve_code(tree, line.id)
                        );
                    }
                }
            }
        }
        Command::Generate {
            project,
            templates,
            out,
        } => {
            let load = load_project(&project, &settings)?;
            let templates = match templates {
                Some(dir) => EventTemplates::load(&dir)?,
                None => EventTemplates::builtin(),
            };
            let out = out.unwrap_or_else(|| project_dir(&project));
            let mut sink = FileSink::new(out);
            let report = write_events(
                &load.project.events,
                &templates,
                &settings.event_catalog(),
                &load.project.project_id,
                &mut sink,
            )?;
            for path in &report.written {
                println!("wrote {}", sink.resolve(path).display());
            }
            for path in &report.skipped {
                println!("kept {} (code mode)", path.display());
            }
            if !load.project.global_variables.is_empty() {
                let path = write_variables(
                    &load.project.global_variables,
                    &VariableTemplates::builtin(),
                    &load.project.project_id,
                    &mut sink,
                )?;
                println!("wrote {}", sink.resolve(&path).display());
            }
        }
    }

    Ok(())
}

fn run_catalog(catalog: &ActionCatalog, query: CatalogQuery) {
    match query {
        CatalogQuery::List {
            return_type,
            category,
            search: text,
        } => {
            let candidates =
                filter_by_return_type(&catalog.visible(), return_type.as_deref().unwrap_or(""));
            let found = search(&candidates, category.as_deref(), text.as_deref().unwrap_or(""));
            for action in found {
                println!("{:<20} {:<28} {}", action.name, action.display_text(), action.code);
            }
        }
        CatalogQuery::Categories { return_type } => {
            let candidates =
                filter_by_return_type(&catalog.visible(), return_type.as_deref().unwrap_or(""));
            for category in categories_of(&candidates) {
                println!("{category}");
            }
        }
    }
}

fn load_project(path: &Path, settings: &Settings) -> Result<ProjectLoad, store::ProjectError> {
    let load = store::load(path, settings.action_catalog())?;
    info!(
        project = %load.project.project_id,
        events = load.project.events.len(),
        warnings = load.warnings.len(),
        "project opened"
    );
    Ok(load)
}

fn project_dir(project: &Path) -> PathBuf {
    project
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("MODCREATOR_LOG").unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("modcreator=debug")
        } else {
            EnvFilter::new("modcreator=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
