//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use nbops_deploy::{PermissionCheck, Tally};
use serde_json::{Value, json};

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

fn print_json(value: &Value) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn tally_json(operation: &str, tally: Tally) -> Value {
    json!({
        "operation": operation,
        "ok": tally.ok,
        "skipped": tally.skipped,
        "failed": tally.failed,
    })
}

pub(crate) fn render_tally(operation: &str, tally: Tally, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&tally_json(operation, tally)),
        OutputFormat::Table => {
            println!("{operation}: {tally}");
            Ok(())
        }
    }
}

/// One line per collection: name then title.
pub(crate) fn collection_rows(collections: &[Value]) -> Vec<String> {
    collections
        .iter()
        .map(|collection| {
            let name = collection.get("name").and_then(Value::as_str).unwrap_or("?");
            let title = collection.get("title").and_then(Value::as_str).unwrap_or("");
            format!("{name:<32} {title}")
        })
        .collect()
}

pub(crate) fn render_collections(collections: &[Value], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&Value::Array(collections.to_vec())),
        OutputFormat::Table => {
            println!("{:<32} TITLE", "NAME");
            for row in collection_rows(collections) {
                println!("{row}");
            }
            println!("{} collection(s)", collections.len());
            Ok(())
        }
    }
}

pub(crate) fn render_count(collection: &str, count: u64, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({ "collection": collection, "count": count })),
        OutputFormat::Table => {
            println!("{collection}: {count}");
            Ok(())
        }
    }
}

pub(crate) fn permission_line(check: &PermissionCheck) -> String {
    let verdict = if check.allowed() { "ALLOWED" } else { "DENIED" };
    let via = check
        .via()
        .map(|path| format!(" (via {path})"))
        .unwrap_or_default();
    format!(
        "{}: {} on {} {verdict}{via}",
        check.role, check.action, check.collection
    )
}

pub(crate) fn render_permission(check: &PermissionCheck, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "role": check.role,
            "collection": check.collection,
            "action": check.action,
            "allowed": check.allowed(),
            "via": check.via(),
        })),
        OutputFormat::Table => {
            println!("{}", permission_line(check));
            Ok(())
        }
    }
}
