//! Common utilities shared across CLI commands.

use std::env;
use std::fmt::Display;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use log::debug;
use pattern_mapper::config::{API_URL_ENV, CONFIG_FILE_NAME};
use pattern_mapper::{ApiBase, Config, PatternData, ValidatedPattern};

/// Print `Error: <message>` and exit with status 1.
pub fn fail(message: impl Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

/// Read a whole input file; `-` reads stdin.
pub fn read_input(path: &str) -> Result<String, String> {
    if path == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("Failed to read from stdin: {}", e))?;
        Ok(buffer)
    } else {
        fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))
    }
}

/// Write output to a file, or stdout for `None` / `-`.
pub fn write_output(path: Option<&str>, content: &str) -> Result<(), String> {
    match path {
        None | Some("-") => {
            println!("{}", content);
            Ok(())
        }
        Some(p) => {
            fs::write(p, content).map_err(|e| format!("Failed to write '{}': {}", p, e))?;
            eprintln!("Wrote {}", p);
            Ok(())
        }
    }
}

/// Document name from an input path (`flower.svg` → `flower`).
pub fn document_name(path: &str) -> Option<String> {
    if path == "-" {
        return None;
    }
    Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

/// Parse a pattern document from a file or stdin, exiting on failure.
pub fn read_document(path: &str) -> PatternData {
    let text = read_input(path).unwrap_or_else(|e| fail(e));
    PatternData::from_json_str(&text).unwrap_or_else(|e| fail(format!("'{}': {}", path, e)))
}

/// Parse and validate a pattern document, exiting on the first defect.
pub fn read_validated(path: &str) -> ValidatedPattern {
    let doc = read_document(path);
    pattern_mapper::validate(doc).unwrap_or_else(|e| fail(format!("'{}' is invalid: {}", path, e)))
}

/// Config from `--config`, or `pattern-mapper.yaml` in the working
/// directory when present.
pub fn load_config(explicit: Option<&str>) -> Config {
    let result = match explicit {
        Some(path) => Config::load(path),
        None => Config::load_or_default(CONFIG_FILE_NAME),
    };
    result.unwrap_or_else(|e| fail(e))
}

/// Backend URL with command line, environment and file precedence.
pub fn resolve_api_base(config: &Config, cli_value: Option<&str>) -> ApiBase {
    let env_value = env::var(API_URL_ENV).ok();
    debug!("{} = {:?}", API_URL_ENV, env_value);
    config
        .resolve_api_url(env_value.as_deref(), cli_value)
        .unwrap_or_else(|e| fail(e))
}

/// Value following an option flag, or exit with a message naming it.
pub fn option_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> &'a str {
    *i += 1;
    match args.get(*i) {
        Some(value) => value.as_str(),
        None => fail(format!("{} requires a value", flag)),
    }
}
