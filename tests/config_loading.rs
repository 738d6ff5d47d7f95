// tests/config_loading.rs

use std::collections::HashMap;
use std::io::Write;

use dagship::config::load_and_validate;
use dagship::dag::Graph;
use dagship::errors::{DagshipError, GraphError};
use dagship::types::{BackendKind, SubmitMode};
use dagship_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn loads_tasks_in_declared_order() {
    let file = write_config(
        r#"
[config]
workspace = "build"
mode = "force"

[[task]]
name = "train"
after = ["clean"]
products = ["/data/model.pkl"]

[[task]]
name = "load"

[[task]]
name = "clean"
after = ["load"]
command = ["python", "clean.py"]
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.config_section().mode, SubmitMode::All);
    assert_eq!(cfg.config_section().backend, BackendKind::Scheduler);
    let names: Vec<_> = cfg.tasks().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["train", "load", "clean"]);

    let g = Graph::from_config(&cfg, &HashMap::new()).unwrap();
    assert_eq!(g.topological_order().unwrap(), vec!["load", "clean", "train"]);
    assert_eq!(g.get("load").unwrap().command, vec!["ploomber", "task", "load"]);
    assert_eq!(g.get("clean").unwrap().command, vec!["python", "clean.py"]);
}

#[test]
fn cycle_returns_structured_error() {
    let file = write_config(
        r#"
[[task]]
name = "A"
after = ["B"]

[[task]]
name = "B"
after = ["A"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(DagshipError::DagCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains("A") || msg.contains("B"));
        }
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn batch_backend_requires_batch_section() {
    let file = write_config(
        r#"
[config]
backend = "batch"

[[task]]
name = "A"
"#,
    );

    match load_and_validate(file.path()) {
        Err(DagshipError::ConfigError(msg)) => assert!(msg.contains("[batch]")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn batch_section_is_parsed() {
    let file = write_config(
        r#"
[config]
backend = "batch"

[batch]
image = "registry/etl:7"
job_queue = "main"
job_definition = "etl"
submit_cmd = ["aws", "batch", "submit-job", "--job-name", "{name}"]
depends_on_flag = "--depends-on"
depends_on_item = "jobId={id}"

[[task]]
name = "A"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    let batch = cfg.batch_section().unwrap();
    assert_eq!(batch.image.as_deref(), Some("registry/etl:7"));
    assert_eq!(batch.depends_on_item, "jobId={id}");
    assert!(batch.job_id_pattern.contains("jobId"));
    assert_eq!(batch.image_suffix(), ["--image", "{image}"]);
    assert_eq!(batch.command_suffix(), ["--", "{command}"]);
}

#[test]
fn batch_section_that_drops_the_image_is_rejected() {
    let file = write_config(
        r#"
[config]
backend = "batch"

[batch]
submit_cmd = ["submit", "--job-name", "{name}", "{command}"]
image_args = []

[[task]]
name = "A"
"#,
    );

    match load_and_validate(file.path()) {
        Err(DagshipError::ConfigError(msg)) => assert!(msg.contains("image"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn batch_section_that_drops_the_command_is_rejected() {
    let file = write_config(
        r#"
[config]
backend = "batch"

[batch]
submit_cmd = ["submit", "{image}"]
command_args = ["--verbose"]

[[task]]
name = "A"
"#,
    );

    match load_and_validate(file.path()) {
        Err(DagshipError::ConfigError(msg)) => assert!(msg.contains("command"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn empty_config_is_rejected() {
    let file = write_config("[config]\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(DagshipError::ConfigError(_))
    ));
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = write_config("[[task]\nname = ");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(DagshipError::TomlError(_))
    ));
}

#[test]
fn unknown_dependency_surfaces_when_building_graph() {
    let cfg = ConfigFileBuilder::new()
        .with_task(TaskConfigBuilder::new("A").after("ghost").build())
        .build();

    let err = Graph::from_config(&cfg, &HashMap::new()).unwrap_err();
    assert_eq!(
        err,
        GraphError::UnknownUpstream {
            node: "A".into(),
            upstream: "ghost".into()
        }
    );
}

#[test]
fn staleness_map_drives_needs_execution() {
    let cfg = ConfigFileBuilder::new()
        .with_task(TaskConfigBuilder::new("A").build())
        .with_task(TaskConfigBuilder::new("B").after("A").build())
        .build();

    let flags = HashMap::from([("A".to_string(), false)]);
    let g = Graph::from_config(&cfg, &flags).unwrap();

    assert!(!g.get("A").unwrap().needs_execution);
    // Missing from the map means stale.
    assert!(g.get("B").unwrap().needs_execution);
}
