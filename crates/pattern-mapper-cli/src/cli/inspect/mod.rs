//! `inspect` - summarize a validated pattern document.
//!
//! # Examples
//!
//! ```bash
//! # Counts only
//! pattern-mapper inspect flower.json
//!
//! # Hierarchy, two levels deep
//! pattern-mapper inspect flower.json --tree --depth 2
//!
//! # Groups with their sequence steps, as JSON
//! pattern-mapper inspect flower.json --groups --steps --json
//! ```

mod tree;
mod types;

use pattern_mapper::ValidatedPattern;

use super::common::{fail, option_value, read_validated};
use types::{GroupSummary, InspectResult, PatternSummary, StepSummary};

/// Execute the inspect command.
pub fn cmd_inspect(args: &[String]) {
    let mut doc_path: Option<&str> = None;
    let mut json_output = false;
    let mut show_tree = false;
    let mut compact = false;
    let mut tree_depth: Option<usize> = None;
    let mut show_groups = false;
    let mut show_steps = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--json" => json_output = true,
            "--tree" => show_tree = true,
            "--compact" => compact = true,
            "--depth" => {
                let value = option_value(args, &mut i, "--depth");
                tree_depth = Some(
                    value
                        .parse()
                        .unwrap_or_else(|_| fail(format!("invalid depth '{}'", value))),
                );
            }
            "--groups" => show_groups = true,
            "--steps" => {
                show_groups = true;
                show_steps = true;
            }
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
        i += 1;
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

    let pattern = read_validated(doc_path);
    let result = InspectResult {
        summary: summarize(&pattern),
        tree: show_tree.then(|| tree::build_tree(&pattern, tree_depth)),
        groups: if show_groups {
            group_summaries(&pattern, show_steps)
        } else {
            Vec::new()
        },
    };

    if json_output {
        let json = serde_json::to_string_pretty(&result).unwrap_or_else(|e| fail(e));
        println!("{}", json);
    } else {
        print_human_readable(&result, compact);
    }
}

fn summarize(pattern: &ValidatedPattern) -> PatternSummary {
    let doc = pattern.document();
    let tree = pattern.tree();
    let root = tree.root();
    PatternSummary {
        name: doc.name.clone(),
        width: doc.width,
        height: doc.height,
        shape_count: doc.shapes.len(),
        point_count: doc.shapes.iter().map(|s| s.points.len()).sum(),
        group_count: doc.groups.len(),
        sequenced_groups: doc.groups.iter().filter(|g| g.is_sequenced()).count(),
        temporary_groups: doc.groups.iter().filter(|g| g.is_temporary()).count(),
        max_depth: pattern.groups().map(|(id, _)| tree.depth(id)).max(),
        root_shapes: tree
            .children(root)
            .iter()
            .filter(|&&id| pattern.shape(id).is_some())
            .count(),
    }
}

fn group_summaries(pattern: &ValidatedPattern, with_steps: bool) -> Vec<GroupSummary> {
    pattern
        .groups()
        .map(|(id, group)| GroupSummary {
            name: group.groupname.clone(),
            path: pattern.tree().node(id).path.clone(),
            depth: pattern.tree().depth(id),
            shape_count: group.shapeindices.len(),
            inference: group.inferencetype.clone(),
            sequenced: group.is_sequenced(),
            steps: if with_steps {
                let mut steps: Vec<StepSummary> = group
                    .sequencesteps
                    .iter()
                    .map(|step| StepSummary {
                        index: step.sequenceindex,
                        shapes: step.shapeindices.clone(),
                        value: step.inferredfromvalue.as_ref().map(|v| v.to_string()),
                    })
                    .collect();
                steps.sort_by_key(|s| s.index);
                steps
            } else {
                Vec::new()
            },
        })
        .collect()
}

fn print_human_readable(result: &InspectResult, compact: bool) {
    let s = &result.summary;

    println!("Pattern: {}", s.name.as_deref().unwrap_or("(unnamed)"));
    if let (Some(w), Some(h)) = (s.width, s.height) {
        println!("Size: {} x {}", w, h);
    }
    println!();
    println!("Shapes: {} ({} points, {} at root)", s.shape_count, s.point_count, s.root_shapes);
    println!("Groups: {}", s.group_count);
    if s.group_count > 0 {
        println!("  sequenced: {}", s.sequenced_groups);
        if s.temporary_groups > 0 {
            println!("  temporary: {}", s.temporary_groups);
        }
        if let Some(depth) = s.max_depth {
            println!("  max depth: {}", depth);
        }
    }

    if let Some(tree) = &result.tree {
        println!();
        println!("Hierarchy:");
        if compact {
            print!("{}", tree::render_tree_compact(tree, 0));
        } else {
            print!("{}", tree::render_tree_text(tree, 0, true, ""));
        }
    }

    if !result.groups.is_empty() {
        println!();
        println!("Groups:");
        for g in &result.groups {
            let inference = g
                .inference
                .as_deref()
                .map(|t| format!(" [{}]", t))
                .unwrap_or_default();
            println!(
                "  {} {} depth={} shapes={}{}{}",
                g.name,
                g.path,
                g.depth,
                g.shape_count,
                inference,
                if g.sequenced { " sequenced" } else { "" }
            );
            for step in &g.steps {
                let shapes: Vec<String> = step.shapes.iter().map(|i| i.to_string()).collect();
                let value = step
                    .value
                    .as_deref()
                    .map(|v| format!(" (value {})", v))
                    .unwrap_or_default();
                println!("    step {}: [{}]{}", step.index, shapes.join(", "), value);
            }
        }
    }
}

fn print_usage() {
    eprintln!("Usage: pattern-mapper inspect <pattern.json> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --tree          Show the group/shape hierarchy");
    eprintln!("  --depth <n>     Limit hierarchy depth");
    eprintln!("  --compact       Plain indentation instead of box drawing");
    eprintln!("  --groups        List groups");
    eprintln!("  --steps         List groups with their sequence steps");
    eprintln!("  --json          Output as JSON");
}
