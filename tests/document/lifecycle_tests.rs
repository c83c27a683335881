//! Document state transitions against real sources and the tree-sitter engine

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tu_tracker::{
    ConfigurationContainer, Configurations, Document, FileContainer, FileExistsCheck, SyntaxUnit,
    TrackerError, UpdateResult,
};

use crate::common::{ScriptedEngine, TestProject};

fn cfg1() -> Vec<ConfigurationContainer> {
    vec![ConfigurationContainer::with_arguments("cfg1", ["-std=c++17"])]
}

fn parsed_main(project: &TestProject) -> Document {
    parsed_main_with_configurations(project).0
}

/// Also returns the configuration registry the document resolves against.
fn parsed_main_with_configurations(project: &TestProject) -> (Document, Configurations) {
    project.with_main_and_util();
    let context = project.context(&cfg1());
    let configurations = context.configurations.clone();
    let document = Document::new(
        project.file_path("main.cpp"),
        "cfg1",
        context,
        FileExistsCheck::Check,
    )
    .unwrap();
    document.parse().unwrap();
    (document, configurations)
}

// ============================================================================
// NULL AND CONSTRUCTION
// ============================================================================

#[test]
fn test_null_document_rejects_queries() {
    let document = Document::default();

    assert!(document.is_null());
    assert!(!document.is_intact());
    assert!(matches!(document.file_path(), Err(TrackerError::DocumentIsNull)));
    assert!(matches!(
        document.with_translation_unit(|unit| unit.file_path().to_path_buf()),
        Err(TrackerError::DocumentIsNull)
    ));
    assert!(matches!(
        document.depended_file_paths(),
        Err(TrackerError::DocumentIsNull)
    ));
}

#[test]
fn test_missing_file_with_existence_check_fails() {
    let project = TestProject::new();

    let result = Document::new(
        project.file_path("absent.cpp"),
        "cfg1",
        project.context(&cfg1()),
        FileExistsCheck::Check,
    );

    assert!(matches!(
        result,
        Err(TrackerError::FileDoesNotExist { path }) if path == project.file_path("absent.cpp")
    ));
}

#[test]
fn test_missing_file_without_existence_check_succeeds() {
    let project = TestProject::new();

    let document = Document::new(
        project.file_path("absent.cpp"),
        "cfg1",
        project.context(&cfg1()),
        FileExistsCheck::DoNotCheck,
    )
    .unwrap();

    assert!(!document.is_null());
    assert_eq!(document.file_path().unwrap(), project.file_path("absent.cpp"));
}

#[test]
fn test_first_parse_rechecks_existence() {
    let project = TestProject::new();
    project.with_main_and_util();
    let document = Document::new(
        project.file_path("main.cpp"),
        "cfg1",
        project.context(&cfg1()),
        FileExistsCheck::Check,
    )
    .unwrap();
    project.remove_file("main.cpp");

    assert!(matches!(
        document.parse(),
        Err(TrackerError::FileDoesNotExist { .. })
    ));
    assert!(!document.is_analysis_in_flight());
}

#[test]
fn test_unchecked_missing_file_is_discovered_by_engine() {
    let project = TestProject::new();
    let document = Document::new(
        project.file_path("absent.cpp"),
        "cfg1",
        project.context(&cfg1()),
        FileExistsCheck::DoNotCheck,
    )
    .unwrap();

    document.parse().unwrap();

    assert!(document.is_deleted());
    assert!(!document.is_intact());
    assert!(!document.is_needing_reparse());
}

// ============================================================================
// PARSE AND DEPENDENCIES
// ============================================================================

#[test]
fn test_parse_makes_existing_file_intact() {
    let project = TestProject::new();
    let document = parsed_main(&project);

    assert!(document.is_intact());
    assert!(!document.is_needing_reparse());
    assert!(document.last_analysis_time_point().unwrap().is_some());
}

#[test]
fn test_dependencies_include_file_and_headers() {
    let project = TestProject::new();
    let document = parsed_main(&project);

    assert_eq!(
        document.depended_file_paths().unwrap(),
        HashSet::from([project.file_path("main.cpp"), project.file_path("util.h")])
    );
}

#[test]
fn test_unit_payload_is_syntax_unit() {
    let project = TestProject::new();
    let document = parsed_main(&project);

    let spellings = document
        .with_translation_unit(|unit| {
            unit.payload::<SyntaxUnit>()
                .map(|syntax| {
                    syntax
                        .includes
                        .iter()
                        .map(|include| include.spelling.clone())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        })
        .unwrap();

    assert_eq!(spellings, vec!["util.h"]);
}

#[test]
fn test_every_dependency_marks_dirty() {
    let project = TestProject::new();
    let document = parsed_main(&project);

    for path in document.depended_file_paths().unwrap() {
        document.reparse().unwrap();
        assert!(!document.is_needing_reparse());

        assert!(document.set_dirty_if_dependency_is_met(&path));

        assert!(document.is_needing_reparse(), "{:?} should dirty", path);
    }
}

#[test]
fn test_non_dependency_does_not_mark_dirty() {
    let project = TestProject::new();
    let document = parsed_main(&project);
    project.add_file("other.h", "int other;\n");

    assert!(!document.set_dirty_if_dependency_is_met(&project.file_path("other.h")));

    assert!(!document.is_needing_reparse());
}

#[test]
fn test_reparse_picks_up_new_include() {
    let project = TestProject::new();
    let document = parsed_main(&project);
    project.add_file("extra.h", "int extra;\n");
    project.add_file(
        "util.h",
        "#pragma once\n#include \"extra.h\"\ninline int util() { return extra; }\n",
    );

    document.set_dirty_if_dependency_is_met(&project.file_path("util.h"));
    document.reparse().unwrap();

    assert!(document
        .depended_file_paths()
        .unwrap()
        .contains(&project.file_path("extra.h")));
    assert!(!document.is_needing_reparse());
}

#[test]
fn test_include_directories_come_from_configuration() {
    let project = TestProject::new();
    project
        .add_file("src/main.cpp", "#include <lib/api.h>\n")
        .add_file("include/lib/api.h", "int api();\n");
    let include = format!("-I{}", project.file_path("include").display());
    let configurations = vec![ConfigurationContainer::with_arguments("cfg1", [include])];
    let document = Document::new(
        project.file_path("src/main.cpp"),
        "cfg1",
        project.context(&configurations),
        FileExistsCheck::Check,
    )
    .unwrap();

    document.parse().unwrap();

    assert!(document
        .depended_file_paths()
        .unwrap()
        .contains(&project.file_path("include/lib/api.h")));
}

// ============================================================================
// DIRTY TRACKING
// ============================================================================

#[test]
fn test_dirty_then_reparse_clears_flag() {
    let project = TestProject::new();
    let document = parsed_main(&project);

    document.set_dirty_if_dependency_is_met(&project.file_path("util.h"));
    document.reparse().unwrap();

    assert!(!document.is_needing_reparse());
}

#[test]
fn test_stale_result_keeps_dirty_flag() {
    let project = TestProject::new();
    let document = parsed_main(&project);
    let token_at_start = document.needs_reparse_change_time_point().unwrap();

    document.set_dirty_if_dependency_is_met(&project.file_path("util.h"));
    document
        .incorporate_updater_result(UpdateResult::observed_at(token_at_start))
        .unwrap();

    assert!(document.is_needing_reparse());
}

#[test]
fn test_stale_result_from_real_updater_keeps_new_unit() {
    let project = TestProject::new();
    let document = parsed_main(&project);
    let updater = document.create_updater().unwrap();
    let result = updater.execute().unwrap();
    let completed = result.parse_time_point;

    document.set_dirty_if_dependency_is_met(&project.file_path("main.cpp"));
    document.incorporate_updater_result(result).unwrap();

    assert!(document.is_needing_reparse());
    assert!(document.is_intact());
    assert_eq!(document.last_analysis_time_point().unwrap(), Some(completed));
}

#[test]
fn test_configuration_outdated_then_parse() {
    let project = TestProject::new();
    let (document, configurations) = parsed_main_with_configurations(&project);

    configurations.create_or_update(&[ConfigurationContainer::with_arguments(
        "cfg1",
        ["-std=c++20"],
    )]);

    assert!(document.set_dirty_if_configuration_is_outdated());
    assert!(document.is_needing_reparse());

    document.parse().unwrap();
    assert!(!document.set_dirty_if_configuration_is_outdated());
    assert!(!document.is_needing_reparse());
}

#[test]
fn test_updater_sees_live_configuration() {
    let project = TestProject::new();
    let (document, configurations) = parsed_main_with_configurations(&project);
    configurations.create_or_update(&[ConfigurationContainer::with_arguments(
        "cfg1",
        ["-std=c++20", "-DFEATURE"],
    )]);

    let updater = document.create_updater().unwrap();

    assert_eq!(
        updater.input().configuration_arguments(),
        &["-std=c++20", "-DFEATURE"]
    );
}

// ============================================================================
// DELETED FILES
// ============================================================================

#[test]
fn test_deleted_before_first_parse_needs_no_reparse() {
    let project = TestProject::new();
    project.with_main_and_util();
    let document = Document::new(
        project.file_path("main.cpp"),
        "cfg1",
        project.context(&cfg1()),
        FileExistsCheck::Check,
    )
    .unwrap();
    project.remove_file("main.cpp");

    assert!(!document.set_dirty_if_dependency_is_met(&project.file_path("main.cpp")));

    assert!(!document.is_needing_reparse());
}

#[test]
fn test_deleted_after_parse_stops_tracking() {
    let project = TestProject::new();
    let document = parsed_main(&project);
    project.remove_file("main.cpp");

    document.set_dirty_if_dependency_is_met(&project.file_path("main.cpp"));
    document.reparse().unwrap();

    assert!(document.is_deleted());
    assert!(!document.is_intact());
    assert!(document.depended_file_paths().unwrap().is_empty());
    assert!(!document.set_dirty_if_dependency_is_met(&project.file_path("util.h")));
    assert!(!document.is_needing_reparse());
}

#[test]
fn test_restored_file_becomes_intact_again() {
    let project = TestProject::new();
    let document = parsed_main(&project);
    project.remove_file("main.cpp");
    document.reparse().unwrap();

    project.add_file("main.cpp", "int main() { return 0; }\n");
    document.reparse().unwrap();

    assert!(!document.is_deleted());
    assert!(document.is_intact());
    assert_eq!(
        document.depended_file_paths().unwrap(),
        HashSet::from([project.file_path("main.cpp")])
    );
}

// ============================================================================
// ENGINE FAILURES
// ============================================================================

#[test]
fn test_engine_failure_keeps_previous_unit() {
    let project = TestProject::new();
    let engine = ScriptedEngine::new();
    let main = PathBuf::from("/virtual/main.cpp");
    engine.set_dependencies(&main, &[Path::new("/virtual/util.h")]);
    let document = Document::new(
        &main,
        "cfg1",
        project.context_with_engine(&cfg1(), engine.clone()),
        FileExistsCheck::DoNotCheck,
    )
    .unwrap();
    document.parse().unwrap();
    engine.set_failing(&main, true);

    let result = document.reparse();

    assert!(matches!(result, Err(TrackerError::AnalysisFailed { .. })));
    assert!(document.is_parsed());
    assert!(document.is_needing_reparse());
    assert!(!document.is_intact());
    assert!(document
        .depended_file_paths()
        .unwrap()
        .contains(Path::new("/virtual/util.h")));

    engine.set_failing(&main, false);
    document.reparse().unwrap();
    assert!(document.is_intact());
    assert_eq!(engine.analyses(), 3);
}

#[test]
fn test_command_line_reaches_engine_with_file_last() {
    let project = TestProject::new();
    let engine = ScriptedEngine::new();
    let main = PathBuf::from("/virtual/main.cpp");
    let document = Document::new(
        &main,
        "cfg1",
        project.context_with_engine(&cfg1(), engine),
        FileExistsCheck::DoNotCheck,
    )
    .unwrap();
    document.parse().unwrap();

    let arguments = document
        .with_translation_unit(|unit| unit.payload::<Vec<String>>().cloned())
        .unwrap()
        .unwrap();

    assert_eq!(arguments.len(), 2);
    assert_eq!(arguments[0], "-std=c++17");
    assert!(arguments[1].ends_with("main.cpp"));
}

// ============================================================================
// END TO END
// ============================================================================

#[test]
fn test_end_to_end_main_and_util() {
    let project = TestProject::new();
    project.with_main_and_util();
    let mut documents = project.documents(&cfg1());

    let created = documents
        .create(&[FileContainer::new(project.file_path("main.cpp"), "cfg1")])
        .unwrap();
    let document = &created[0];
    document.parse().unwrap();

    let dependencies = document.depended_file_paths().unwrap();
    assert!(dependencies.contains(&project.file_path("main.cpp")));
    assert!(dependencies.contains(&project.file_path("util.h")));

    document.set_dirty_if_dependency_is_met(&project.file_path("util.h"));
    assert!(document.is_needing_reparse());

    document.reparse().unwrap();
    assert!(!document.is_needing_reparse());
}
