//! Dirty events that arrive while an analysis is running on another thread

use std::path::{Path, PathBuf};
use std::thread;

use tu_tracker::{
    ConfigurationContainer, Document, DocumentKey, Documents, FileContainer, FileExistsCheck,
    JobStatus, Jobs, TrackerError,
};

use crate::common::{Gate, GatedEngine, TestProject};

const MAIN: &str = "/virtual/main.cpp";

fn gated_document(project: &TestProject) -> (Document, std::sync::Arc<GatedEngine>, Gate) {
    let (engine, gate) = GatedEngine::new();
    let context = project.context_with_engine(
        &[ConfigurationContainer::new("cfg1")],
        engine.clone(),
    );
    let document = Document::new(MAIN, "cfg1", context, FileExistsCheck::DoNotCheck).unwrap();
    document.parse().unwrap();
    engine.arm(true);
    (document, engine, gate)
}

#[test]
fn test_dirty_event_during_analysis_survives() {
    let project = TestProject::new();
    let (document, _engine, gate) = gated_document(&project);

    let worker = {
        let document = document.clone();
        thread::spawn(move || document.reparse())
    };
    assert_eq!(gate.wait_started(), PathBuf::from(MAIN));

    assert!(document.is_analysis_in_flight());
    assert!(document.set_dirty_if_dependency_is_met(Path::new(MAIN)));
    gate.release();
    worker.join().unwrap().unwrap();

    assert!(document.is_needing_reparse());
    assert!(document.is_intact());
    assert!(!document.is_analysis_in_flight());
}

#[test]
fn test_analysis_without_interference_clears_dirty() {
    let project = TestProject::new();
    let (document, _engine, gate) = gated_document(&project);
    document.set_dirty_if_dependency_is_met(Path::new(MAIN));

    let worker = {
        let document = document.clone();
        thread::spawn(move || document.reparse())
    };
    gate.wait_started();
    gate.release();
    worker.join().unwrap().unwrap();

    assert!(!document.is_needing_reparse());
}

#[test]
fn test_buffer_opened_while_file_goes_missing_keeps_document_dirty() {
    let project = TestProject::new();
    let (document, engine, gate) = gated_document(&project);
    engine.set_missing(true);

    let worker = {
        let document = document.clone();
        thread::spawn(move || document.reparse())
    };
    gate.wait_started();
    assert!(document.set_dirty_if_dependency_is_met(Path::new(MAIN)));
    gate.release();
    worker.join().unwrap().unwrap();

    assert!(document.is_deleted());
    assert!(document.is_needing_reparse());

    engine.arm(false);
    engine.set_missing(false);
    document.reparse().unwrap();
    assert!(!document.is_deleted());
    assert!(!document.is_needing_reparse());
}

#[test]
fn test_second_analysis_is_rejected_while_in_flight() {
    let project = TestProject::new();
    let (document, _engine, gate) = gated_document(&project);

    let worker = {
        let document = document.clone();
        thread::spawn(move || document.reparse())
    };
    gate.wait_started();

    assert!(matches!(
        document.reparse(),
        Err(TrackerError::AnalysisInFlight { .. })
    ));
    gate.release();
    worker.join().unwrap().unwrap();

    assert!(!document.is_analysis_in_flight());
}

#[test]
fn test_queue_requeues_document_in_flight() {
    let project = TestProject::new();
    let (engine, gate) = GatedEngine::new();
    let context =
        project.context_with_engine(&[ConfigurationContainer::new("cfg1")], engine.clone());
    let mut documents = Documents::with_options(context, FileExistsCheck::DoNotCheck);
    let created = documents.create(&[FileContainer::new(MAIN, "cfg1")]).unwrap();
    created[0].parse().unwrap();
    engine.arm(true);

    let worker = {
        let document = created[0].clone();
        thread::spawn(move || document.reparse())
    };
    gate.wait_started();

    let mut jobs = Jobs::new();
    jobs.add(DocumentKey::new(Path::new(MAIN), "cfg1"));
    let outcomes = jobs.process(&documents);

    assert_eq!(outcomes[0].status, JobStatus::Requeued);
    assert_eq!(jobs.len(), 1);

    gate.release();
    worker.join().unwrap().unwrap();
    engine.arm(false);

    let outcomes = jobs.process(&documents);
    assert_eq!(outcomes[0].status, JobStatus::Completed);
    assert!(jobs.is_empty());
}

#[test]
fn test_configuration_change_during_analysis_survives() {
    let project = TestProject::new();
    let (engine, gate) = GatedEngine::new();
    let context =
        project.context_with_engine(&[ConfigurationContainer::new("cfg1")], engine.clone());
    let configurations = context.configurations.clone();
    let document = Document::new(MAIN, "cfg1", context, FileExistsCheck::DoNotCheck).unwrap();
    document.parse().unwrap();
    engine.arm(true);

    let worker = {
        let document = document.clone();
        thread::spawn(move || document.reparse())
    };
    gate.wait_started();
    configurations.create_or_update(&[ConfigurationContainer::with_arguments("cfg1", ["-DNEW"])]);
    gate.release();
    worker.join().unwrap().unwrap();

    assert!(document.is_needing_reparse());

    engine.arm(false);
    document.reparse().unwrap();
    assert!(!document.is_needing_reparse());
    assert!(!document.set_dirty_if_configuration_is_outdated());
}
