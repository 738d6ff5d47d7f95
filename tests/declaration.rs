// tests/declaration.rs

use dagship::backend::render::{declaration_path, render, write_declaration};
use dagship::backend::{Backend, Delivery, SchedulerAdapter};
use dagship::dag::Node;
use dagship::fs::FileSystem;
use dagship::fs::mock::MockFileSystem;
use dagship_test_utils::builders::GraphBuilder;
use std::path::Path;

#[test]
fn declares_every_node_and_edge() {
    let g = GraphBuilder::new()
        .node("a", &[])
        .node("b", &["a"])
        .node("c", &["a", "b"])
        .build();

    let artifact = SchedulerAdapter::new("etl").declare(&g);

    assert_eq!(artifact.name, "etl");
    assert_eq!(artifact.nodes.len(), 3);
    assert_eq!(artifact.edges.len(), 3);
    assert!(artifact.has_edge("a", "b"));
    assert!(artifact.has_edge("a", "c"));
    assert!(artifact.has_edge("b", "c"));
    assert!(!artifact.has_edge("b", "a"));
}

#[test]
fn declared_nodes_carry_commands() {
    let g = GraphBuilder::new()
        .push(Node::new("load").with_command(["ploomber", "task", "load"]))
        .build();

    let artifact = SchedulerAdapter::new("etl").declare(&g);
    assert_eq!(
        artifact.node("load").unwrap().command,
        vec!["ploomber", "task", "load"]
    );
}

#[tokio::test]
async fn scheduler_backend_delivers_a_declaration() {
    let g = GraphBuilder::new().node("a", &[]).node("b", &["a"]).build();
    let order = g.topological_order().unwrap();

    let backend = Backend::Scheduler(SchedulerAdapter::new("etl"));
    match backend.deliver(&g, &order).await.unwrap() {
        Delivery::Declared(artifact) => {
            assert_eq!(artifact.nodes.len(), 2);
            assert!(artifact.has_edge("a", "b"));
        }
        other => panic!("expected a declaration, got {other:?}"),
    }
}

#[test]
fn rendered_declaration_is_written_under_workspace() {
    let g = GraphBuilder::new().node("a", &[]).node("b", &["a"]).build();
    let artifact = SchedulerAdapter::new("etl").declare(&g);
    let fs = MockFileSystem::new();

    let path = write_declaration(&fs, Path::new("/p/dist"), &artifact).unwrap();

    assert_eq!(path, declaration_path(Path::new("/p/dist"), "etl"));
    let written = fs.read_to_string(&path).unwrap();
    assert_eq!(written, render(&artifact).unwrap());
    assert!(written.contains("upstream = \"a\""));
    assert!(written.contains("downstream = \"b\""));
}
