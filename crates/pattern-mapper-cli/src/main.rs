//! pattern-mapper - load, validate and inspect shape patterns
//!
//! Usage:
//!   pattern-mapper load <svg> [-s settings] [-o out]   Build a pattern document from SVG
//!   pattern-mapper validate <json> [--all]             Check document invariants
//!   pattern-mapper inspect <json> [--tree] [--groups]  Summarize a document
//!   pattern-mapper endpoints [--api-url <url>]         List backend URLs

mod cli;

use std::env;

use cli::{cmd_endpoints, cmd_inspect, cmd_load, cmd_validate};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let prog = args.first().map(String::as_str).unwrap_or("pattern-mapper");

    let Some(command) = args.get(1) else {
        print_usage(prog);
        std::process::exit(1);
    };

    match command.as_str() {
        "load" => cmd_load(&args[2..]),
        "validate" => cmd_validate(&args[2..]),
        "inspect" => cmd_inspect(&args[2..]),
        "endpoints" => cmd_endpoints(&args[2..]),
        "help" | "--help" | "-h" => print_usage(prog),
        other => {
            eprintln!("Error: Unknown command '{}'", other);
            eprintln!();
            print_usage(prog);
            std::process::exit(1);
        }
    }
}

fn print_usage(prog: &str) {
    eprintln!("pattern-mapper - shape pattern documents");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {} load <svg> [options]          Build a pattern document from SVG", prog);
    eprintln!("  {} validate <json> [options]     Check document invariants", prog);
    eprintln!("  {} inspect <json> [options]      Summarize hierarchy and sequences", prog);
    eprintln!("  {} endpoints [options]           List backend URLs", prog);
    eprintln!("  {} help                          Show this message", prog);
    eprintln!();
    eprintln!("Run '{} <command> --help' for command options.", prog);
    eprintln!();
    eprintln!("Stdin support:");
    eprintln!("  Use '-' as input file to read from stdin:");
    eprintln!("  cat drawing.svg | {} load - -o pattern.json", prog);
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PATTERN_MAPPER_API_URL   Backend URL (overrides pattern-mapper.yaml)");
    eprintln!("  RUST_LOG                 Log filter (default: warn)");
}
