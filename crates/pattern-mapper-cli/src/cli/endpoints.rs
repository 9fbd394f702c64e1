//! `endpoints` - show where the pattern backend serves each resource.

use serde::Serialize;

use pattern_mapper::{check_preview_response, Endpoint};

use super::common::{fail, load_config, option_value, resolve_api_base};

#[derive(Debug, Serialize)]
struct EndpointInfo {
    name: &'static str,
    url: String,
    content_type: &'static str,
}

/// Execute the endpoints command.
pub fn cmd_endpoints(args: &[String]) {
    let mut api_url: Option<&str> = None;
    let mut config_path: Option<&str> = None;
    let mut resolve: Option<&str> = None;
    let mut check: Option<(&str, &str)> = None;
    let mut json_output = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--api-url" => api_url = Some(option_value(args, &mut i, "--api-url")),
            "--config" => config_path = Some(option_value(args, &mut i, "--config")),
            "--resolve" => resolve = Some(option_value(args, &mut i, "--resolve")),
            "--check-preview" => {
                let status = option_value(args, &mut i, "--check-preview");
                let content_type = option_value(args, &mut i, "--check-preview");
                check = Some((status, content_type));
            }
            "--json" => json_output = true,
            "-h" | "--help" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("Warning: Unknown option '{}'", other);
            }
        }
        i += 1;
    }

    if let Some(uri) = resolve {
        match Endpoint::from_uri(uri) {
            Some(endpoint) => println!("{} {}", name(endpoint), endpoint.content_type()),
            None => fail(format!("no endpoint serves '{}'", uri)),
        }
        return;
    }

    if let Some((status, content_type)) = check {
        let status: u16 = status
            .parse()
            .unwrap_or_else(|_| fail(format!("invalid HTTP status '{}'", status)));
        let content_type = (!content_type.is_empty()).then_some(content_type);
        match check_preview_response(status, content_type) {
            Ok(()) => println!("OK: preview response accepted"),
            Err(e) => fail(e),
        }
        return;
    }

    let config = load_config(config_path);
    let base = resolve_api_base(&config, api_url);
    let infos: Vec<EndpointInfo> = Endpoint::ALL
        .into_iter()
        .map(|endpoint| EndpointInfo {
            name: name(endpoint),
            url: base.url_for(endpoint),
            content_type: endpoint.content_type(),
        })
        .collect();

    if json_output {
        let json = serde_json::to_string_pretty(&infos).unwrap_or_else(|e| fail(e));
        println!("{}", json);
    } else {
        println!("API: {}", base);
        for info in &infos {
            println!("  {:<16} {}  ({})", info.name, info.url, info.content_type);
        }
    }
}

fn name(endpoint: Endpoint) -> &'static str {
    match endpoint {
        Endpoint::PatternSvg => "pattern-svg",
        Endpoint::PatternData => "pattern-data",
        Endpoint::PatternSettings => "pattern-settings",
        Endpoint::Catalog => "catalog",
    }
}

fn print_usage() {
    eprintln!("Usage: pattern-mapper endpoints [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --api-url <url>                  Backend URL (overrides config and environment)");
    eprintln!("  --config <file>                  Config file (default: ./pattern-mapper.yaml)");
    eprintln!("  --resolve <uri>                  Show which endpoint serves a request URI");
    eprintln!("  --check-preview <status> <type>  Check a preview response status and content type");
    eprintln!("  --json                           Output as JSON");
}
