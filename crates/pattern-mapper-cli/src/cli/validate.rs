//! `validate` - check a pattern document's invariants.

use serde::Serialize;

use pattern_mapper::{diagnose, validate};

use super::common::{fail, read_document};

#[derive(Debug, Serialize)]
struct ValidationReport {
    valid: bool,
    shapes: usize,
    groups: usize,
    errors: Vec<String>,
}

/// Execute the validate command.
pub fn cmd_validate(args: &[String]) {
    let mut doc_path: Option<&str> = None;
    let mut all = false;
    let mut json_output = false;

    for arg in args {
        match arg.as_str() {
            "--all" => all = true,
            "--json" => json_output = true,
            "-h" | "--help" => {
                print_usage();
                return;
            }
            "-" => {
                if doc_path.is_none() {
                    doc_path = Some("-");
                }
            }
            path if !path.starts_with('-') => {
                if doc_path.is_none() {
                    doc_path = Some(path);
                }
            }
            other => {
                eprintln!("Warning: Unknown option '{}'", other);
            }
        }
    }

    let doc_path = match doc_path {
        Some(p) => p,
        None => {
            eprintln!("Error: pattern document required (use '-' for stdin)");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    let doc = read_document(doc_path);
    let (shapes, groups) = (doc.shapes.len(), doc.groups.len());
    let errors = if all {
        diagnose(&doc)
    } else {
        validate(doc).err().into_iter().collect()
    };

    if json_output {
        let report = ValidationReport {
            valid: errors.is_empty(),
            shapes,
            groups,
            errors: errors.iter().map(|e| e.to_string()).collect(),
        };
        let json = serde_json::to_string_pretty(&report).unwrap_or_else(|e| fail(e));
        println!("{}", json);
        if !report.valid {
            std::process::exit(1);
        }
        return;
    }

    match errors.as_slice() {
        [] => println!("OK: {} shapes, {} groups", shapes, groups),
        [only] => fail(format!("'{}' is invalid: {}", doc_path, only)),
        many => {
            eprintln!("Error: '{}' has {} problems:", doc_path, many.len());
            for e in many {
                eprintln!("  - {}", e);
            }
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("Usage: pattern-mapper validate <pattern.json> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --all    Report every problem instead of the first");
    eprintln!("  --json   Output a JSON report");
}
