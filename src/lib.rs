// src/lib.rs

pub mod backend;
pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod orchestrator;
pub mod status;
pub mod types;
pub mod validate;
pub mod workspace;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::backend::{Backend, BatchAdapter, CommandJobQueue, SchedulerAdapter};
use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::{Graph, filter};
use crate::errors::DagshipError;
use crate::fs::{FileSystem, RealFileSystem};
use crate::orchestrator::{Orchestrator, RunOutcome, RunReport};
use crate::status::{FileHashStore, HashStore, MemoryHashStore, StatusProbe, StatusReport};
use crate::types::{BackendKind, HashStorageMode, SubmitMode};
use crate::validate::ValidationContext;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - staleness assessment and graph construction
/// - backend selection
/// - the orchestrator run and whatever its outcome needs written to disk
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone();
    let cfg = load_and_validate(&config_path)?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let project_root = fs
        .canonicalize(&config_root_dir(&config_path))
        .unwrap_or_else(|_| config_root_dir(&config_path));
    let workspace_root = project_root.join(&cfg.config_section().workspace);
    let mode = args.mode.unwrap_or(cfg.config_section().mode);

    debug!(project = ?project_root, workspace = ?workspace_root, %mode, "resolved run context");

    let mut store = hash_store(fs.as_ref(), &cfg, &workspace_root);
    let report = StatusProbe::new(fs.as_ref(), &project_root)
        .skip_dir(&workspace_root)
        .assess(&cfg, store.as_ref())?;

    let graph = Graph::from_config(&cfg, &report.needs_execution)?;

    let validation = ValidationContext::new(&project_root, &workspace_root)
        .require_absolute_products(cfg.config_section().require_absolute_products);

    if args.dry_run {
        print_dry_run(&cfg, &graph, mode)?;
        crate::validate::validate(&graph, &validation, fs.as_ref())?;
        println!("validation: ok");
        return Ok(());
    }

    let backend = build_backend(&cfg, &args, &project_root)?;
    let orchestrator = Orchestrator::new(backend, validation, mode, Arc::clone(&fs));

    let run_report = match orchestrator.run(&graph).await {
        Ok(run_report) => run_report,
        Err(DagshipError::Submission(failure)) => {
            for record in failure.records.iter() {
                println!("{} -> {}", record.node_name, record.backend_job_id);
            }
            // The submission failure is the error the caller sees; a store
            // error here is only logged.
            let accepted = failure.records.iter().map(|r| r.node_name.as_str());
            let _ = record_fingerprints(store.as_mut(), &report, accepted, &cfg);
            return Err(DagshipError::Submission(failure).into());
        }
        Err(err) => return Err(err.into()),
    };

    handle_outcome(fs.as_ref(), &cfg, &project_root, &workspace_root, &run_report)?;
    record_fingerprints(store.as_mut(), &report, run_report.delivered(), &cfg)?;
    Ok(())
}

/// Figure out the project root.
///
/// - If the config path has a non-empty parent (e.g. "pipelines/dagship.toml"),
///   we use that directory.
/// - If it's just a bare filename like "dagship.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn hash_store<'a>(
    fs: &'a dyn FileSystem,
    cfg: &ConfigFile,
    workspace_root: &Path,
) -> Box<dyn HashStore + 'a> {
    match cfg.config_section().hash_storage_mode {
        HashStorageMode::File => Box::new(FileHashStore::new(fs, workspace_root)),
        HashStorageMode::Memory => Box::new(MemoryHashStore::new()),
    }
}

fn build_backend(cfg: &ConfigFile, args: &CliArgs, project_root: &Path) -> Result<Backend> {
    match cfg.config_section().backend {
        BackendKind::Scheduler => Ok(Backend::Scheduler(SchedulerAdapter::new(project_name(
            cfg,
            project_root,
        )))),
        BackendKind::Batch => {
            let section = cfg.batch_section().ok_or_else(|| {
                DagshipError::ConfigError("backend = \"batch\" requires a [batch] section".into())
            })?;

            let image = args
                .image
                .clone()
                .or_else(|| section.image.clone())
                .ok_or_else(|| {
                    DagshipError::ConfigError(
                        "batch backend needs an image: pass --image or set [batch].image".into(),
                    )
                })?;

            let queue = CommandJobQueue::from_config(section)?;
            Ok(Backend::Batch(BatchAdapter::new(Arc::new(queue), image)))
        }
    }
}

fn project_name(cfg: &ConfigFile, project_root: &Path) -> String {
    cfg.scheduler_section()
        .project_name
        .clone()
        .or_else(|| {
            project_root
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "project".to_string())
}

fn handle_outcome(
    fs: &dyn FileSystem,
    cfg: &ConfigFile,
    project_root: &Path,
    workspace_root: &Path,
    run_report: &RunReport,
) -> Result<()> {
    match &run_report.outcome {
        RunOutcome::NoWork(no_work) => {
            info!("{no_work}");
            println!("{no_work}");
        }
        RunOutcome::Declared(artifact) => {
            let path = crate::backend::render::write_declaration(fs, workspace_root, artifact)?;
            println!("declared {} nodes in {}", artifact.nodes.len(), path.display());

            if cfg.scheduler_section().copy_sources {
                let dest = crate::workspace::project_copy_dir(workspace_root, &artifact.name);
                crate::workspace::copy_project(fs, project_root, workspace_root, &dest)
                    .with_context(|| format!("copying project sources into {:?}", dest))?;
            }
        }
        RunOutcome::Submitted(_) => {
            for (node, job_id) in run_report.job_ids() {
                println!("{node} -> {job_id}");
            }
        }
    }
    Ok(())
}

fn record_fingerprints<'n>(
    store: &mut dyn HashStore,
    report: &StatusReport,
    delivered: impl IntoIterator<Item = &'n str>,
    cfg: &ConfigFile,
) -> Result<()> {
    let all_tasks: Vec<&str> = cfg.tasks().iter().map(|t| t.name.as_str()).collect();
    if let Err(err) = crate::status::record_delivered(store, report, delivered, &all_tasks) {
        warn!(error = %err, "failed to record fingerprints");
        return Err(err);
    }
    Ok(())
}

/// Dry-run output: tasks, their dependencies, the order and what the
/// current mode would submit.
fn print_dry_run(cfg: &ConfigFile, graph: &Graph, mode: SubmitMode) -> Result<()> {
    println!("dagship dry-run");
    println!("  config.backend = {}", cfg.config_section().backend);
    println!("  config.workspace = {}", cfg.config_section().workspace.display());
    println!("  mode = {mode}");
    println!();

    println!("tasks ({}):", graph.len());
    for node in graph.nodes() {
        println!("  - {}", node.name);
        println!("      command: {:?}", node.command);
        if !node.upstream.is_empty() {
            println!("      after: {:?}", node.upstream);
        }
        if !node.products.is_empty() {
            println!("      products: {:?}", node.products);
        }
        println!("      needs_execution: {}", node.needs_execution);
    }
    println!();

    let order = graph.topological_order()?;
    println!("order: {}", order.join(" -> "));

    match filter(graph, mode) {
        Ok(included) => {
            let selected: Vec<&str> = order
                .iter()
                .filter(|name| included.contains(*name))
                .map(String::as_str)
                .collect();
            println!("would submit ({}): {}", selected.len(), selected.join(", "));
        }
        Err(no_work) => println!("{no_work}"),
    }

    debug!("dry-run complete (nothing delivered)");
    Ok(())
}
