use clap::Parser;
use observable_cli::{CLIError, OutputFormat, Result};
use serde_json::{Map, Value as JsonValue};
use std::path::PathBuf;

/// Observe - follow an observable query route from the terminal
#[derive(Parser, Debug)]
#[command(name = "observe")]
#[command(version)]
#[command(about = "Mount an observable query and print every state change", long_about = None)]
pub struct Cli {
    /// Server base URL (e.g., http://localhost:5000)
    #[arg(short = 'u', long = "url", env = "OBSERVABLE_URL")]
    pub url: Option<String>,

    /// Route template (e.g., /api/accounts/{{accountId}})
    #[arg(short = 'r', long = "route")]
    pub route: String,

    /// Query argument as KEY=VALUE; VALUE is parsed as JSON when possible
    #[arg(short = 'a', long = "arg", value_name = "KEY=VALUE")]
    pub args: Vec<String>,

    /// Argument names sent to the server (default: every --arg key)
    #[arg(long = "request-arg", value_name = "NAME")]
    pub request_args: Vec<String>,

    /// Configuration file path
    #[arg(long = "config", default_value = observable_cli::config::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "compact")]
    pub format: OutputFormat,

    /// Log level or filter directive (overrides [logging] level)
    #[arg(long = "log-level")]
    pub log_level: Option<String>,

    /// Log format: compact or json (overrides [logging] format)
    #[arg(long = "log-format")]
    pub log_format: Option<String>,

    /// Use fast timeout preset (optimized for local development)
    #[arg(long = "fast-timeouts")]
    pub fast_timeouts: bool,

    /// Exit after the first received result
    #[arg(long = "once")]
    pub once: bool,
}

impl Cli {
    /// Collect `--arg` pairs into an argument object.
    pub fn query_arguments(&self) -> Result<Map<String, JsonValue>> {
        let mut map = Map::new();
        for raw in &self.args {
            let (key, value) = parse_key_value(raw)?;
            map.insert(key, value);
        }
        Ok(map)
    }

    /// Names declared to the query; falls back to the `--arg` keys.
    pub fn request_argument_names(&self, arguments: &Map<String, JsonValue>) -> Vec<String> {
        if self.request_args.is_empty() {
            arguments.keys().cloned().collect()
        } else {
            self.request_args.clone()
        }
    }
}

fn parse_key_value(raw: &str) -> Result<(String, JsonValue)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| CLIError::ParseError(format!("expected KEY=VALUE, got '{}'", raw)))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(CLIError::ParseError(format!("empty argument name in '{}'", raw)));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| JsonValue::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("accountId=42").unwrap(), ("accountId".into(), json!(42)));
        assert_eq!(parse_key_value("name=alice").unwrap(), ("name".into(), json!("alice")));
        assert_eq!(parse_key_value("flag=true").unwrap(), ("flag".into(), json!(true)));
        assert_eq!(parse_key_value("q=a=b").unwrap(), ("q".into(), json!("a=b")));
        assert_eq!(parse_key_value("empty=").unwrap(), ("empty".into(), json!("")));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=1").is_err());
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "observe",
            "--url",
            "http://localhost:5000",
            "--route",
            "/api/accounts/{{accountId}}",
            "--arg",
            "accountId=42",
            "-a",
            "page=2",
            "--format",
            "json",
            "--once",
        ])
        .unwrap();

        assert_eq!(cli.url.as_deref(), Some("http://localhost:5000"));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.once);

        let arguments = cli.query_arguments().unwrap();
        assert_eq!(arguments["accountId"], json!(42));
        assert_eq!(arguments["page"], json!(2));

        let mut names = cli.request_argument_names(&arguments);
        names.sort();
        assert_eq!(names, vec!["accountId".to_string(), "page".to_string()]);
    }

    #[test]
    fn test_explicit_request_args_win() {
        let cli = Cli::try_parse_from([
            "observe",
            "--route",
            "/api/items/{{id}}",
            "--arg",
            "id=7",
            "--arg",
            "debug=true",
            "--request-arg",
            "id",
        ])
        .unwrap();

        let arguments = cli.query_arguments().unwrap();
        assert_eq!(cli.request_argument_names(&arguments), vec!["id".to_string()]);
        assert_eq!(cli.format, OutputFormat::Compact);
    }

    #[test]
    fn test_route_is_required() {
        assert!(Cli::try_parse_from(["observe", "--url", "http://localhost"]).is_err());
    }
}
