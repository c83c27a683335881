//! Affected command handler - documents invalidated by changed files

use crate::cli::{AffectedArgs, OutputFormat};
use crate::commands::{
    display_path, failures, push_failures, push_header, reports, to_json, CommandContext,
    Project,
};
use crate::error::Result;

/// Run the affected command
pub fn run_affected(args: &AffectedArgs, ctx: &CommandContext) -> Result<String> {
    let mut project = Project::open(&args.project)?;
    let outcomes = project.analyze_dirty();

    let changes: Vec<(String, usize)> = args
        .changed
        .iter()
        .map(|path| {
            (
                display_path(path),
                project.documents.notify_file_changed(path),
            )
        })
        .collect();
    let affected = reports(&project.documents.dirty_documents())?;

    match ctx.format {
        OutputFormat::Json => {
            let changes: Vec<serde_json::Value> = changes
                .iter()
                .map(|(path, count)| serde_json::json!({ "path": path, "affected": count }))
                .collect();
            to_json(&serde_json::json!({
                "_type": "affected",
                "changes": changes,
                "documents": affected,
                "failures": failures(&outcomes),
            }))
        }
        OutputFormat::Text => {
            let mut output = String::new();
            push_header(&mut output, "TU-TRACKER AFFECTED");
            for (path, count) in &changes {
                output.push_str(&format!("changed: {} -> {} documents\n", path, count));
            }
            output.push_str(&format!("\nneeds reparse: {}\n", affected.len()));
            for report in &affected {
                report.render_text(&mut output, ctx.verbose);
            }
            push_failures(&mut output, &outcomes);
            Ok(output)
        }
    }
}
