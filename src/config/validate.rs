// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DagshipError, Result};
use crate::types::BackendKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DagshipError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.config,
            raw.batch,
            raw.scheduler,
            raw.task,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_backend_section(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(DagshipError::ConfigError(
            "config must contain at least one [[task]] entry".to_string(),
        ));
    }
    if let Some(task) = cfg.task.iter().find(|t| t.name.trim().is_empty()) {
        return Err(DagshipError::ConfigError(format!(
            "task names must not be empty (after = {:?})",
            task.after
        )));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.entry_command.is_empty() {
        return Err(DagshipError::ConfigError(
            "[config].entry_command must not be empty".to_string(),
        ));
    }
    if cfg.config.workspace.as_os_str().is_empty() {
        return Err(DagshipError::ConfigError(
            "[config].workspace must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_backend_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.backend != BackendKind::Batch {
        return Ok(());
    }

    let Some(batch) = cfg.batch.as_ref() else {
        return Err(DagshipError::ConfigError(
            "backend \"batch\" requires a [batch] section".to_string(),
        ));
    };

    if batch.submit_cmd.is_empty() {
        return Err(DagshipError::ConfigError(
            "[batch].submit_cmd must not be empty".to_string(),
        ));
    }

    if let Err(e) = Regex::new(&batch.job_id_pattern) {
        return Err(DagshipError::ConfigError(format!(
            "[batch].job_id_pattern is not a valid regex: {e}"
        )));
    }

    if !batch.delivers_image() {
        return Err(DagshipError::ConfigError(
            "[batch] never passes the image: use {image} in submit_cmd or image_args".to_string(),
        ));
    }

    if !batch.delivers_command() {
        return Err(DagshipError::ConfigError(
            "[batch] never passes the task command: use {command} or {command_csv} in submit_cmd or command_args"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> task. Self references are left to the graph
    // builder, which reports them by name.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for task in cfg.task.iter() {
        graph.add_node(task.name.as_str());
    }

    for task in cfg.task.iter() {
        for dep in task.after.iter().filter(|d| **d != task.name) {
            graph.add_edge(dep.as_str(), task.name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(DagshipError::DagCycle(format!(
                "cycle detected in task DAG involving task '{}'",
                node
            )))
        }
    }
}
