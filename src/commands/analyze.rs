//! Analyze command handler - parse every file of a project

use crate::cli::{AnalyzeArgs, OutputFormat};
use crate::commands::{
    failures, push_failures, push_header, reports, to_json, CommandContext, Project,
};
use crate::error::Result;

/// Run the analyze command
pub fn run_analyze(args: &AnalyzeArgs, ctx: &CommandContext) -> Result<String> {
    let mut project = Project::open(&args.project)?;
    let outcomes = project.analyze_dirty();
    let documents = reports(&project.documents.documents())?;

    let intact = documents.iter().filter(|report| report.intact).count();

    match ctx.format {
        OutputFormat::Json => to_json(&serde_json::json!({
            "_type": "analysis",
            "documents": documents,
            "intact": intact,
            "failures": failures(&outcomes),
        })),
        OutputFormat::Text => {
            let mut output = String::new();
            push_header(&mut output, "TU-TRACKER ANALYSIS");
            output.push_str(&format!("documents: {}\n", documents.len()));
            output.push_str(&format!("intact: {}\n\n", intact));
            for report in &documents {
                report.render_text(&mut output, true);
            }
            push_failures(&mut output, &outcomes);
            Ok(output)
        }
    }
}
