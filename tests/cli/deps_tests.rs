//! Tests for the `deps` CLI command

use crate::common::{assert_contains, assert_valid_json, dependency_names, TestProject};

const PROJECT: &str = r#"
[[configurations]]
id = "debug"
arguments = ["-Iinclude"]

[[configurations]]
id = "plain"

[[files]]
path = "src/main.cpp"
configuration = "debug"

[[files]]
path = "src/main.cpp"
configuration = "plain"
"#;

fn project() -> TestProject {
    let project = TestProject::new();
    project
        .add_file("src/main.cpp", "#include \"local.h\"\n#include <lib/api.h>\n")
        .add_file("src/local.h", "int local;\n")
        .add_file("include/lib/api.h", "int api();\n");
    project.add_project_file(PROJECT);
    project
}

#[test]
fn test_deps_follows_configuration_include_dirs() {
    let project = project();

    let output = project.run_cli_success(&["deps", "src/main.cpp", "-c", "debug", "-f", "json"]);
    let json = assert_valid_json(&output, "deps debug");

    assert_eq!(
        dependency_names(&json["documents"][0]),
        vec!["api.h", "local.h", "main.cpp"]
    );
}

#[test]
fn test_deps_reports_every_configuration() {
    let project = project();

    let output = project.run_cli_success(&["deps", "src/main.cpp", "-f", "json"]);
    let json = assert_valid_json(&output, "deps all");

    let documents = json["documents"].as_array().unwrap();
    assert_eq!(documents.len(), 2);
    let plain = documents
        .iter()
        .find(|document| document["configuration"] == "plain")
        .unwrap();
    assert_eq!(dependency_names(plain), vec!["local.h", "main.cpp"]);
}

#[test]
fn test_deps_text_lists_paths() {
    let project = project();

    let output = project.run_cli_success(&["deps", "src/main.cpp", "-c", "debug"]);

    assert_contains(&output, "(debug)");
    assert_contains(&output, "local.h");
}

#[test]
fn test_deps_unknown_file() {
    let project = project();

    let (code, stderr) = project.run_cli_failure(&["deps", "src/other.cpp"]);

    assert_eq!(code, 2);
    assert_contains(&stderr, "No document for file");
}

#[test]
fn test_deps_unknown_configuration() {
    let project = project();

    let (code, stderr) = project.run_cli_failure(&["deps", "src/main.cpp", "-c", "release"]);

    assert_eq!(code, 2);
    assert_contains(&stderr, "Document does not exist");
}
