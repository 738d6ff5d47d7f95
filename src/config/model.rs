// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{BackendKind, HashStorageMode, SubmitMode};

/// Configuration file exactly as deserialized from TOML.
///
/// ```toml
/// [config]
/// backend = "batch"
/// workspace = "dist"
///
/// [batch]
/// image = "registry/etl:latest"
/// submit_cmd = ["aws", "batch", "submit-job", "--job-name", "{name}"]
///
/// [[task]]
/// name = "load"
/// products = ["/data/raw.csv"]
///
/// [[task]]
/// name = "clean"
/// after = ["load"]
/// ```
///
/// Tasks are an array of tables so the declared order survives parsing.
/// Use [`ConfigFile`] (via `TryFrom`) for anything beyond deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub batch: Option<BatchSection>,

    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub task: Vec<TaskConfig>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    batch: Option<BatchSection>,
    scheduler: SchedulerSection,
    task: Vec<TaskConfig>,
}

impl ConfigFile {
    /// Only `config::validate` should call this.
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        batch: Option<BatchSection>,
        scheduler: SchedulerSection,
        task: Vec<TaskConfig>,
    ) -> Self {
        Self {
            config,
            batch,
            scheduler,
            task,
        }
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn batch_section(&self) -> Option<&BatchSection> {
        self.batch.as_ref()
    }

    pub fn scheduler_section(&self) -> &SchedulerSection {
        &self.scheduler
    }

    /// Tasks in declaration order.
    pub fn tasks(&self) -> &[TaskConfig] {
        &self.task
    }

    pub fn task(&self, name: &str) -> Option<&TaskConfig> {
        self.task.iter().find(|t| t.name == name)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    /// Orchestration workspace, relative to the config file's directory
    /// unless absolute. Declarations, copied sources and fingerprints are
    /// written here; products must stay outside it.
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// Default submit mode; `--mode` overrides it.
    #[serde(default)]
    pub mode: SubmitMode,

    #[serde(default)]
    pub require_absolute_products: bool,

    /// Command each node runs; `{name}` is replaced by the task name.
    #[serde(default = "default_entry_command")]
    pub entry_command: Vec<String>,

    #[serde(default)]
    pub hash_storage_mode: HashStorageMode,
}

fn default_backend() -> BackendKind {
    BackendKind::Scheduler
}

fn default_workspace() -> PathBuf {
    PathBuf::from("dist")
}

fn default_entry_command() -> Vec<String> {
    vec!["ploomber".to_string(), "task".to_string(), "{name}".to_string()]
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            workspace: default_workspace(),
            mode: SubmitMode::default(),
            require_absolute_products: false,
            entry_command: default_entry_command(),
            hash_storage_mode: HashStorageMode::default(),
        }
    }
}

/// `[batch]` section, required when `backend = "batch"`.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSection {
    /// Container image reference from the build step; `--image` overrides.
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub job_queue: String,

    #[serde(default)]
    pub job_definition: String,

    /// Client command used to submit one job.
    pub submit_cmd: Vec<String>,

    /// Emitted once before the dependency items, if set.
    #[serde(default)]
    pub depends_on_flag: Option<String>,

    /// One argument per dependency; `{id}` is replaced by the job id.
    #[serde(default = "default_depends_on_item")]
    pub depends_on_item: String,

    /// Regex applied to the client's stdout; first capture group is the id.
    #[serde(default = "default_job_id_pattern")]
    pub job_id_pattern: String,

    /// Appended after the dependencies when `submit_cmd` has no `{image}`.
    #[serde(default = "default_image_args")]
    pub image_args: Vec<String>,

    /// Appended last when `submit_cmd` has no `{command}` or `{command_csv}`.
    #[serde(default = "default_command_args")]
    pub command_args: Vec<String>,
}

impl BatchSection {
    /// Arguments appended to `submit_cmd` for the image, if it doesn't
    /// place the image itself.
    pub fn image_suffix(&self) -> &[String] {
        if mentions(&self.submit_cmd, &[IMAGE]) {
            &[]
        } else {
            &self.image_args
        }
    }

    /// Same as [`BatchSection::image_suffix`], for the node's command.
    pub fn command_suffix(&self) -> &[String] {
        if mentions(&self.submit_cmd, COMMAND) {
            &[]
        } else {
            &self.command_args
        }
    }

    /// Whether every submission carries the image.
    pub fn delivers_image(&self) -> bool {
        mentions(&self.submit_cmd, &[IMAGE]) || mentions(&self.image_args, &[IMAGE])
    }

    /// Whether every submission carries the node's command.
    pub fn delivers_command(&self) -> bool {
        mentions(&self.submit_cmd, COMMAND) || mentions(&self.command_args, COMMAND)
    }
}

const IMAGE: &str = "{image}";
const COMMAND: &[&str] = &["{command}", "{command_csv}"];

fn mentions(args: &[String], placeholders: &[&str]) -> bool {
    args.iter()
        .any(|arg| placeholders.iter().any(|p| arg.contains(p)))
}

fn default_depends_on_item() -> String {
    "{id}".to_string()
}

fn default_job_id_pattern() -> String {
    r#""jobId":\s*"([^"]+)""#.to_string()
}

fn default_image_args() -> Vec<String> {
    vec!["--image".to_string(), "{image}".to_string()]
}

fn default_command_args() -> Vec<String> {
    vec!["--".to_string(), "{command}".to_string()]
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchedulerSection {
    /// Declaration name; defaults to the project directory name.
    #[serde(default)]
    pub project_name: Option<String>,

    /// Copy the project sources into `<workspace>/project/<name>`.
    #[serde(default)]
    pub copy_sources: bool,
}

/// One `[[task]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub name: String,

    /// Tasks this one depends on.
    #[serde(default)]
    pub after: Vec<String>,

    /// File outputs, checked by the validation pass.
    #[serde(default)]
    pub products: Vec<PathBuf>,

    /// Glob patterns (relative to the project directory) whose contents
    /// form the task's fingerprint.
    #[serde(default)]
    pub source: Vec<String>,

    /// Explicit staleness; overrides the fingerprint when set.
    #[serde(default)]
    pub needs_execution: Option<bool>,

    /// Overrides `[config].entry_command` for this task.
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

impl TaskConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            after: Vec::new(),
            products: Vec::new(),
            source: Vec::new(),
            needs_execution: None,
            command: None,
        }
    }
}
