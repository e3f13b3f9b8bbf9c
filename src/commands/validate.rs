use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tracing::info;

use crate::cli::ValidateArgs;
use crate::model::{
    BAKE_METHODS, BULK_END_STATES, LoafRecord, QualityRating, RecordError, REQUIRED_FIELDS,
    ValidationReport, total_flour,
};
use crate::util::load_record;

const QUALITY_WARNING: &str =
    "quality_overall not filled - this is the most important field for analysis";

#[derive(Debug, Serialize)]
struct ValidationResponse<'a> {
    path: String,
    errors: &'a [String],
    warnings: &'a [String],
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let record = load_record(&args.path)?;
    let report = validate(&record);

    info!(
        path = %args.path.display(),
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "validation complete"
    );

    if args.json {
        write_json_response(&args.path, &report)?;
    } else {
        write_text_response(&args.path, &report)?;
    }

    if report.has_errors() {
        bail!(
            "validation failed for {} with {} error(s)",
            args.path.display(),
            report.errors.len()
        );
    }

    Ok(())
}

/// Runs every check against the record and collects the findings. Checks do
/// not short-circuit: a record with several problems reports all of them in
/// evaluation order.
pub fn validate(record: &LoafRecord) -> ValidationReport {
    let mut report = ValidationReport::default();

    for field in REQUIRED_FIELDS {
        if record.get(field).is_none() {
            report.errors.push(format!("Missing required field: {field}"));
        }
    }

    match record.section("bake") {
        Ok(Some(bake)) => {
            check_enum(bake, "method", "bake method", &BAKE_METHODS, &mut report.errors)
        }
        Ok(None) => {}
        Err(err) => report.errors.push(err.to_string()),
    }

    match record.section("process") {
        Ok(Some(process)) => check_enum(
            process,
            "bulk_end_state",
            "bulk_end_state",
            &BULK_END_STATES,
            &mut report.errors,
        ),
        Ok(None) => {}
        Err(err) => report.errors.push(err.to_string()),
    }

    match record.section("results") {
        Ok(Some(results)) => {
            if QualityRating::from_results(results) == QualityRating::Unrated {
                report.warnings.push(QUALITY_WARNING.to_string());
            }
        }
        Ok(None) => {}
        Err(err) => report.errors.push(err.to_string()),
    }

    match record.section("ingredients") {
        Ok(Some(ingredients)) => {
            if total_flour(ingredients) == 0.0 {
                report.errors.push(RecordError::NoFlour.to_string());
            }
        }
        Ok(None) => {}
        Err(err) => report.errors.push(err.to_string()),
    }

    report
}

/// Values that read as false (null, `false`, `0`, empty string, sequence or
/// mapping) mean "not recorded yet" and pass.
fn check_enum(
    section: &Mapping,
    key: &str,
    label: &str,
    allowed: &[&str],
    errors: &mut Vec<String>,
) {
    let value = match section.get(key) {
        None => return,
        Some(value) if is_unrecorded(value) => return,
        Some(Value::String(value)) => value.clone(),
        Some(other) => render_scalar(other),
    };

    if !allowed.contains(&value.as_str()) {
        errors.push(format!(
            "Invalid {label}: '{value}'. Must be one of: {}",
            format_allowed(allowed)
        ));
    }
}

fn is_unrecorded(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Sequence(items) => items.is_empty(),
        Value::Mapping(entries) => entries.is_empty(),
        Value::Tagged(tagged) => is_unrecorded(&tagged.value),
    }
}

fn format_allowed(allowed: &[&str]) -> String {
    let quoted: Vec<String> = allowed.iter().map(|value| format!("'{value}'")).collect();
    format!("[{}]", quoted.join(", "))
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other => serde_yaml::to_string(other)
            .map(|text| text.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn write_json_response(path: &Path, report: &ValidationReport) -> Result<()> {
    let response = ValidationResponse {
        path: path.display().to_string(),
        errors: &report.errors,
        warnings: &report.warnings,
    };

    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, &response)
        .context("failed to serialize validation json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn write_text_response(path: &Path, report: &ValidationReport) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    if report.has_errors() {
        writeln!(output, "✗ Validation failed for {}", path.display())?;
        for error in &report.errors {
            writeln!(output, "  ERROR: {error}")?;
        }
    } else if report.is_clean() {
        writeln!(output, "✓ Validation passed for {}", path.display())?;
    } else {
        writeln!(output, "⚠ Validation passed with warnings for {}", path.display())?;
    }

    for warning in &report.warnings {
        writeln!(output, "  WARNING: {warning}")?;
    }

    output.flush()?;
    Ok(())
}
