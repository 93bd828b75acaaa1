//! JSON program format shared by compiling and executing processes

mod helpers;

use cinder::core::{Config, RunContext, Spec};
use cinder::tree::{DeferNode, ErrorNode, ListNode, Node, ParallelNode, RecoverNode, RunNode};
use cinder::{Chain, Compiler};
use helpers::*;
use std::sync::Arc;

fn composite() -> Node {
    ListNode::new()
        .append(RunNode::new("db").with_detach(true).with_silent(true))
        .append(
            ParallelNode::new()
                .with_limit(2)
                .append(RunNode::new("lint"))
                .append(RecoverNode::new(RunNode::new("flaky"))),
        )
        .append(DeferNode::new(
            ErrorNode::new(RunNode::new("test"), ListNode::new().append(RunNode::new("notify"))),
            RunNode::new("cleanup"),
        ))
        .into()
}

#[test]
fn test_nested_tree_round_trips() {
    let tree = composite();
    let json = tree.to_json().unwrap();
    let decoded = Node::from_json(&json).unwrap();
    assert_eq!(decoded, tree);
    assert!(decoded.validate().is_ok());
}

#[test]
fn test_spec_wire_shape() {
    let spec = Compiler::new(Chain::standard(&Config::default(), &RunContext::new()))
        .compile("script:\n  test: {image: golang, commands: [go test]}\n")
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&spec.to_json().unwrap()).unwrap();

    for key in ["containers", "volumes", "networks", "program"] {
        assert!(value.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(value["program"]["type"], "list");
    assert_eq!(value["program"]["body"][1]["name"], "test");
    assert_eq!(value["containers"][1]["image"], "golang:latest");

    assert_eq!(Spec::from_json(&spec.to_json_pretty().unwrap()).unwrap(), spec);
}

#[test]
fn test_unknown_node_type_rejected() {
    let json = r#"{"containers":[],"program":{"type":"list","body":[{"type":"goto","name":"x"}]}}"#;
    assert!(Spec::from_json(json).is_err());
}

#[test]
fn test_decoded_program_validates_names() {
    let json = r#"{"containers":[{"name":"a","image":"alpine"}],"program":{"type":"list","body":[{"type":"run","name":"b"}]}}"#;
    let spec = Spec::from_json(json).unwrap();
    assert!(spec.validate().is_err());
}

#[tokio::test]
async fn test_decoded_program_runs() {
    let json = r#"{
        "containers": [
            {"name": "build", "image": "golang:latest"},
            {"name": "cleanup", "image": "alpine:latest"}
        ],
        "program": {"type": "list", "body": [
            {"type": "defer", "body": {"type": "run", "name": "build"}, "defer": {"type": "run", "name": "cleanup"}}
        ]}
    }"#;
    let spec = Spec::from_json(json).unwrap();
    let engine = Arc::new(MockEngine::new());
    let (result, _) = run(spec, engine.clone()).await;
    assert!(result.is_ok());
    assert_eq!(engine.started(), vec!["build", "cleanup"]);
}
