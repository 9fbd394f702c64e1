//! `load` - build a pattern document from an SVG drawing.

use log::info;
use pattern_mapper::{load_svg, resolve_shape_states, validate, LoadOptions, PatternSettings};

use super::common::{document_name, fail, load_config, option_value, read_input, write_output};

/// Execute the load command.
pub fn cmd_load(args: &[String]) {
    let mut svg_path: Option<&str> = None;
    let mut output_path: Option<&str> = None;
    let mut settings_path: Option<&str> = None;
    let mut config_path: Option<&str> = None;
    let mut states_path: Option<&str> = None;
    let mut name: Option<String> = None;
    let mut compact = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--output" => output_path = Some(option_value(args, &mut i, "--output")),
            "-s" | "--settings" => settings_path = Some(option_value(args, &mut i, "--settings")),
            "--config" => config_path = Some(option_value(args, &mut i, "--config")),
            "--states" => states_path = Some(option_value(args, &mut i, "--states")),
            "--name" => name = Some(option_value(args, &mut i, "--name").to_string()),
            "--compact" => compact = true,
            "-h" | "--help" => {
                print_usage();
                return;
            }
            "-" => {
                if svg_path.is_none() {
                    svg_path = Some("-");
                }
            }
            path if !path.starts_with('-') => {
                if svg_path.is_none() {
                    svg_path = Some(path);
                }
            }
            other => {
                eprintln!("Warning: Unknown option '{}'", other);
            }
        }
        i += 1;
    }

    let svg_path = match svg_path {
        Some(p) => p,
        None => {
            eprintln!("Error: SVG file required (use '-' for stdin)");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    let config = load_config(config_path);
    let settings_file = settings_path
        .map(std::path::PathBuf::from)
        .or(config.settings);
    let settings = match settings_file {
        Some(path) => PatternSettings::load(&path)
            .unwrap_or_else(|e| fail(format!("'{}': {}", path.display(), e))),
        None => PatternSettings::default(),
    };

    let mut options = LoadOptions::from_settings(&settings);
    if let Some(name) = name.or_else(|| document_name(svg_path)) {
        options = options.with_name(name);
    }

    let content = read_input(svg_path).unwrap_or_else(|e| fail(e));
    let doc = load_svg(&content, &options).unwrap_or_else(|e| fail(e));
    info!(
        "loaded '{}': {} shapes, {} groups",
        svg_path,
        doc.shapes.len(),
        doc.groups.len()
    );

    // States see temporary groups; the written document does not.
    if let Some(states_path) = states_path {
        let states = resolve_shape_states(&doc, &settings);
        let json = serde_json::to_string_pretty(&states).unwrap_or_else(|e| fail(e));
        write_output(Some(states_path), &json).unwrap_or_else(|e| fail(e));
    }

    // Loader output should always validate; refuse to write it otherwise.
    let doc = match validate(doc.without_temporary_groups()) {
        Ok(validated) => validated.into_inner(),
        Err(e) => fail(format!("loaded pattern is invalid: {}", e)),
    };

    let json = if compact {
        serde_json::to_string(&doc).unwrap_or_else(|e| fail(e))
    } else {
        doc.to_json_pretty().unwrap_or_else(|e| fail(e))
    };
    write_output(output_path, &json).unwrap_or_else(|e| fail(e));
}

fn print_usage() {
    eprintln!("Usage: pattern-mapper load <svg> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -o, --output <file>     Output file (- for stdout, default: stdout)");
    eprintln!("  -s, --settings <file>   Pattern settings (YAML, or JSON by extension)");
    eprintln!("  --config <file>         Config file (default: ./pattern-mapper.yaml)");
    eprintln!("  --states <file>         Also write the resolved per-shape states (JSON)");
    eprintln!("  --name <name>           Document name (default: file stem)");
    eprintln!("  --compact               Single-line JSON");
}
