// src/backend/command_queue.rs

//! [`JobQueue`] that submits through an external command-line client.
//!
//! The configured `submit_cmd` is expanded per node and run with
//! `tokio::process::Command`; the job id is extracted from the client's
//! stdout with `job_id_pattern` (first capture group, or the whole match).
//!
//! Placeholders substituted inside every argument:
//! `{name}`, `{image}`, `{job_queue}`, `{job_definition}`, and
//! `{command_csv}` (the node's command joined with commas). An argument
//! that is exactly `{command}` expands to the node's command, one argument
//! per element.
//!
//! After the template come the dependencies, as `depends_on_flag` (once,
//! if set) followed by one `depends_on_item` per id with `{id}`
//! substituted. Then `image_args` and `command_args`, each only when the
//! template does not already place the image or the command.
//!
//! No retries happen here; a failed call is surfaced as-is.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::backend::{JobId, JobQueue, JobRequest};
use crate::config::model::BatchSection;

#[derive(Debug, Clone)]
pub struct CommandJobQueue {
    submit_cmd: Vec<String>,
    job_queue: String,
    job_definition: String,
    depends_on_flag: Option<String>,
    depends_on_item: String,
    image_args: Vec<String>,
    command_args: Vec<String>,
    job_id_pattern: Regex,
}

impl CommandJobQueue {
    pub fn from_config(section: &BatchSection) -> Result<Self> {
        if section.submit_cmd.is_empty() {
            bail!("[batch].submit_cmd must not be empty");
        }
        if !section.delivers_image() {
            bail!("[batch] has no {{image}} in submit_cmd or image_args");
        }
        if !section.delivers_command() {
            bail!("[batch] has no {{command}} in submit_cmd or command_args");
        }

        let job_id_pattern = Regex::new(&section.job_id_pattern)
            .with_context(|| format!("invalid job_id_pattern: {}", section.job_id_pattern))?;

        Ok(Self {
            submit_cmd: section.submit_cmd.clone(),
            job_queue: section.job_queue.clone(),
            job_definition: section.job_definition.clone(),
            depends_on_flag: section.depends_on_flag.clone(),
            depends_on_item: section.depends_on_item.clone(),
            image_args: section.image_suffix().to_vec(),
            command_args: section.command_suffix().to_vec(),
            job_id_pattern,
        })
    }

    /// Full argument vector (program first) for one request.
    pub fn argv(&self, request: &JobRequest) -> Vec<String> {
        let mut argv = Vec::with_capacity(
            self.submit_cmd.len() + request.depends_on.len() + request.command.len() + 4,
        );

        for arg in self.submit_cmd.iter() {
            self.expand_into(&mut argv, arg, request);
        }

        if !request.depends_on.is_empty() {
            if let Some(flag) = &self.depends_on_flag {
                argv.push(flag.clone());
            }
            for id in request.depends_on.iter() {
                argv.push(self.depends_on_item.replace("{id}", id.as_str()));
            }
        }

        for arg in self.image_args.iter().chain(self.command_args.iter()) {
            self.expand_into(&mut argv, arg, request);
        }

        argv
    }

    fn expand_into(&self, argv: &mut Vec<String>, arg: &str, request: &JobRequest) {
        if arg == "{command}" {
            argv.extend(request.command.iter().cloned());
            return;
        }
        argv.push(
            arg.replace("{name}", &request.node)
                .replace("{image}", &request.image)
                .replace("{command_csv}", &request.command.join(","))
                .replace("{job_queue}", &self.job_queue)
                .replace("{job_definition}", &self.job_definition),
        );
    }

    /// Pull the job id out of the client's stdout.
    pub fn extract_job_id(&self, stdout: &str) -> Option<JobId> {
        let caps = self.job_id_pattern.captures(stdout)?;
        let m = caps.get(1).or_else(|| caps.get(0))?;
        let id = m.as_str().trim();
        if id.is_empty() {
            None
        } else {
            Some(JobId::new(id))
        }
    }

    async fn run(&self, request: JobRequest) -> Result<JobId> {
        let argv = self.argv(&request);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("empty submit command"))?;

        debug!(node = %request.node, ?argv, "running submit command");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("spawning submit command for node '{}'", request.node))?;

        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "submit command exited with code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            );
        }

        self.extract_job_id(&stdout).ok_or_else(|| {
            anyhow!(
                "no job id matching {:?} in submit output: {}",
                self.job_id_pattern.as_str(),
                stdout.trim()
            )
        })
    }
}

impl JobQueue for CommandJobQueue {
    fn submit_job(
        &self,
        request: JobRequest,
    ) -> Pin<Box<dyn Future<Output = Result<JobId>> + Send + '_>> {
        Box::pin(self.run(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section() -> BatchSection {
        BatchSection {
            image: Some("registry/etl:latest".to_string()),
            job_queue: "main".to_string(),
            job_definition: "etl".to_string(),
            submit_cmd: vec![
                "aws".into(),
                "batch".into(),
                "submit-job".into(),
                "--job-name".into(),
                "{name}".into(),
                "--job-queue".into(),
                "{job_queue}".into(),
                "--job-definition".into(),
                "{job_definition}".into(),
            ],
            depends_on_flag: Some("--depends-on".to_string()),
            depends_on_item: "jobId={id}".to_string(),
            job_id_pattern: r#""jobId":\s*"([^"]+)""#.to_string(),
            image_args: vec!["--image".into(), "{image}".into()],
            command_args: vec!["--".into(), "{command}".into()],
        }
    }

    const DOCUMENTED_BATCH: &str = r#"
image = "registry/project:latest"
job_queue = "queue"
job_definition = "project"
submit_cmd = ["aws", "batch", "submit-job", "--job-name", "{name}",
              "--job-queue", "{job_queue}", "--job-definition", "{job_definition}"]
depends_on_flag = "--depends-on"
depends_on_item = "jobId={id}"
job_id_pattern = '"jobId":\s*"([^"]+)"'
image_args = ["--parameters", "image={image}"]
command_args = ["--container-overrides", "command={command_csv}"]
"#;

    fn load_request() -> JobRequest {
        JobRequest {
            node: "load".to_string(),
            command: vec!["ploomber".into(), "task".into(), "load".into()],
            image: "registry/project:latest".to_string(),
            depends_on: vec![JobId::from("j0")],
        }
    }

    fn request(depends_on: &[&str]) -> JobRequest {
        JobRequest {
            node: "clean".to_string(),
            command: vec!["run".to_string(), "clean".to_string()],
            image: "registry/etl:latest".to_string(),
            depends_on: depends_on.iter().map(|id| JobId::from(*id)).collect(),
        }
    }

    #[test]
    fn argv_substitutes_placeholders_and_appends_dependencies() {
        let queue = CommandJobQueue::from_config(&section()).unwrap();
        let argv = queue.argv(&request(&["id-1", "id-2"]));

        assert_eq!(
            argv,
            vec![
                "aws",
                "batch",
                "submit-job",
                "--job-name",
                "clean",
                "--job-queue",
                "main",
                "--job-definition",
                "etl",
                "--depends-on",
                "jobId=id-1",
                "jobId=id-2",
                "--image",
                "registry/etl:latest",
                "--",
                "run",
                "clean",
            ]
        );
    }

    #[test]
    fn documented_batch_config_carries_image_and_command() {
        let section: BatchSection = toml::from_str(DOCUMENTED_BATCH).unwrap();
        let queue = CommandJobQueue::from_config(&section).unwrap();

        assert_eq!(
            queue.argv(&load_request()),
            vec![
                "aws",
                "batch",
                "submit-job",
                "--job-name",
                "load",
                "--job-queue",
                "queue",
                "--job-definition",
                "project",
                "--depends-on",
                "jobId=j0",
                "--parameters",
                "image=registry/project:latest",
                "--container-overrides",
                "command=ploomber,task,load",
            ]
        );
    }

    #[test]
    fn default_suffixes_apply_when_template_omits_image_and_command() {
        let trimmed: String = DOCUMENTED_BATCH
            .lines()
            .filter(|l| !l.starts_with("image_args") && !l.starts_with("command_args"))
            .map(|l| format!("{l}\n"))
            .collect();
        let section: BatchSection = toml::from_str(&trimmed).unwrap();
        let argv = CommandJobQueue::from_config(&section)
            .unwrap()
            .argv(&load_request());

        let tail: Vec<&str> = argv.iter().rev().take(6).rev().map(String::as_str).collect();
        assert_eq!(
            tail,
            vec!["--image", "registry/project:latest", "--", "ploomber", "task", "load"]
        );
    }

    #[test]
    fn suffixes_are_skipped_when_template_places_them() {
        let mut cfg = section();
        cfg.submit_cmd = vec!["submit".into(), "--image={image}".into(), "{command}".into()];
        let argv = CommandJobQueue::from_config(&cfg)
            .unwrap()
            .argv(&request(&[]));

        assert_eq!(argv, vec!["submit", "--image=registry/etl:latest", "run", "clean"]);
    }

    #[test]
    fn config_that_drops_the_image_or_command_is_rejected() {
        let mut no_image = section();
        no_image.image_args.clear();
        let err = CommandJobQueue::from_config(&no_image).unwrap_err();
        assert!(err.to_string().contains("{image}"), "{err}");

        let mut no_command = section();
        no_command.command_args = vec!["--verbose".into()];
        let err = CommandJobQueue::from_config(&no_command).unwrap_err();
        assert!(err.to_string().contains("{command}"), "{err}");
    }

    #[test]
    fn argv_omits_dependency_flag_without_dependencies() {
        let queue = CommandJobQueue::from_config(&section()).unwrap();
        let argv = queue.argv(&request(&[]));
        assert!(!argv.iter().any(|a| a == "--depends-on"));
    }

    #[test]
    fn command_placeholder_expands_to_node_command() {
        let mut cfg = section();
        cfg.submit_cmd = vec!["submit".into(), "{image}".into(), "{command}".into()];
        let queue = CommandJobQueue::from_config(&cfg).unwrap();

        assert_eq!(
            queue.argv(&request(&[])),
            vec!["submit", "registry/etl:latest", "run", "clean"]
        );
    }

    #[test]
    fn job_id_is_taken_from_first_capture_group() {
        let queue = CommandJobQueue::from_config(&section()).unwrap();
        let out = r#"{"jobArn": "arn:x", "jobName": "clean", "jobId": "8f2c-11"}"#;
        assert_eq!(queue.extract_job_id(out), Some(JobId::from("8f2c-11")));
        assert_eq!(queue.extract_job_id("nothing here"), None);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let mut cfg = section();
        cfg.job_id_pattern = "(".to_string();
        assert!(CommandJobQueue::from_config(&cfg).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn submits_through_shell_command() {
        let mut cfg = section();
        cfg.submit_cmd = vec![
            "sh".into(),
            "-c".into(),
            "echo '{\"jobId\": \"job-{name}\"}'".into(),
        ];
        let queue = CommandJobQueue::from_config(&cfg).unwrap();

        let id = queue.submit_job(request(&[])).await.unwrap();
        assert_eq!(id, JobId::from("job-clean"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_reports_stderr() {
        let mut cfg = section();
        cfg.submit_cmd = vec!["sh".into(), "-c".into(), "echo queue is full >&2; exit 3".into()];
        let queue = CommandJobQueue::from_config(&cfg).unwrap();

        let err = queue.submit_job(request(&[])).await.unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("code 3"), "{msg}");
        assert!(msg.contains("queue is full"), "{msg}");
    }
}
