use std::path::Path;

use cuttermap::cuttermap_core::{Severity, validate};
use cuttermap::ExtractOptions;

use crate::cli::OutputFormat;
use crate::shared::load_result;

pub fn run(file: &Path, format: OutputFormat, options: &ExtractOptions) -> Result<(), i32> {
    let result = load_result(file, options)?;
    let report = validate(&result.summary, &result.blades);

    let errors = report.issues.iter().filter(|i| i.severity == Severity::Error).count();
    let warnings = report.issues.iter().filter(|i| i.severity == Severity::Warning).count();

    match format {
        OutputFormat::Text => {
            if report.issues.is_empty() {
                println!("No issues found.");
            } else {
                for issue in &report.issues {
                    println!(
                        "[{}] {}: {}",
                        issue.severity.to_string().to_uppercase(),
                        issue.code,
                        issue.message
                    );
                }
                println!();
            }
            println!(
                "Summary: {} BOM index(es), {} layout group(s), {errors} error(s), {warnings} warning(s), valid: {}",
                report.bom_indices.len(),
                report.cl_groups.len(),
                report.is_valid
            );
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report).map_err(|e| {
                eprintln!("Error: failed to serialize report: {e}");
                1
            })?;
            println!("{json}");
        }
    }
    Ok(())
}
