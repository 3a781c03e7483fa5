use std::fmt::Write as _;
use std::path::Path;

use cuttermap::{ExtractOptions, ExtractionResult, extract, to_json};

use crate::cli::OutputFormat;
use crate::shared::{read_file, report, write_output};

pub fn run(
    file: &Path,
    format: OutputFormat,
    output: Option<&Path>,
    options: &ExtractOptions,
) -> Result<(), i32> {
    let bytes = read_file(file)?;
    let result = extract(&bytes, options).map_err(|e| report(&e))?;
    let text = match format {
        OutputFormat::Json => {
            let mut json = to_json(&result).map_err(|e| report(&e))?;
            json.push('\n');
            json
        }
        OutputFormat::Text => summary(&result),
    };
    write_output(output, text.as_bytes())
}

/// Human-readable overview of an extraction.
fn summary(result: &ExtractionResult) -> String {
    let mut out = String::new();
    let h = &result.header;
    for (label, value) in [
        ("Serial number", &h.serial_number),
        ("Material number", &h.material_number),
        ("Created", &h.creation_date),
        ("Revision", &h.revision_level),
        ("Software version", &h.software_version),
    ] {
        let _ = writeln!(out, "{label}: {value}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "index\tsize\tchamfer\ttype\tcount\tmaterial\tcolor");
    for row in &result.summary {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.index,
            row.size,
            row.chamfer,
            row.cutter_type,
            row.count,
            row.material_number,
            row.fill_color.as_deref().unwrap_or("")
        );
    }
    let _ = writeln!(out);
    for blade in &result.blades {
        let _ = writeln!(out, "{}:", blade.name);
        for (row_id, positions) in &blade.rows {
            let cells: Vec<String> = positions
                .iter()
                .map(|(position, cells)| {
                    let groups: Vec<String> = cells.iter().map(|c| c.group.to_string()).collect();
                    format!("{position} {}", groups.join(","))
                })
                .collect();
            let _ = writeln!(out, "  {}: {}", row_id.as_str(), cells.join("  "));
        }
    }
    let v = &result.validation;
    let _ = writeln!(
        out,
        "\nValid: {} ({} issue(s))",
        if v.is_valid { "yes" } else { "no" },
        v.issues.len()
    );
    out
}

#[cfg(test)]
mod tests {
    use cuttermap::BomRow;

    use super::*;

    #[test]
    fn summary_lists_rows() {
        let mut result = ExtractionResult::default();
        result.header.serial_number = "1234".into();
        result.summary.push(BomRow {
            index: 1,
            cutter_type: "CT9".into(),
            count: 3,
            ..Default::default()
        });
        let text = summary(&result);
        assert!(text.contains("Serial number: 1234"));
        assert!(text.contains("1\t\t\tCT9\t3\t\t"));
        assert!(text.contains("Valid: yes"));
    }
}
