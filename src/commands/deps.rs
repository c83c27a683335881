//! Deps command handler - dependency set of one file

use crate::cli::{DepsArgs, OutputFormat};
use crate::commands::{
    failures, push_failures, reports, to_json, CommandContext, Project,
};
use crate::document::Document;
use crate::error::{Result, TrackerError};
use crate::fs_utils::normalize_path;

/// Run the deps command
pub fn run_deps(args: &DepsArgs, ctx: &CommandContext) -> Result<String> {
    let mut project = Project::open(&args.project)?;
    let file_path = normalize_path(&args.file);

    let selected: Vec<Document> = project
        .documents
        .documents_for_file(&file_path)
        .into_iter()
        .filter(|document| match &args.configuration {
            Some(id) => document.configuration_id().map_or(false, |own| &own == id),
            None => true,
        })
        .collect();
    if selected.is_empty() {
        return Err(match &args.configuration {
            Some(id) => TrackerError::DocumentDoesNotExist {
                path: file_path,
                configuration_id: id.clone(),
            },
            None => TrackerError::NoDocumentForFile { path: file_path },
        });
    }

    for document in &selected {
        project.jobs.add(document.key()?);
    }
    let outcomes = project.jobs.process(&project.documents);
    let documents = reports(&selected)?;

    match ctx.format {
        OutputFormat::Json => to_json(&serde_json::json!({
            "_type": "dependencies",
            "documents": documents,
            "failures": failures(&outcomes),
        })),
        OutputFormat::Text => {
            let mut output = String::new();
            for report in &documents {
                report.render_text(&mut output, true);
            }
            push_failures(&mut output, &outcomes);
            Ok(output)
        }
    }
}
