//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// How turn events are written to stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Conversation transcript (`USER:` / `AGENT:` / `[SYSTEM: ...]`)
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Decision engine selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EngineArg {
    /// Replay a script (built-in demo when --script is not given)
    Script,
    /// Gemini API (requires the `gemini` feature)
    Gemini,
}

/// CLI arguments for toolrelay
#[derive(Parser, Debug)]
#[command(name = "toolrelay")]
#[command(author, version, about = "Answer a request by calling tools in an MCP stdio server")]
#[command(long_about = r#"
toolrelay launches a tool server as a child process, reads its tool catalog
over MCP (JSON-RPC 2.0 on stdio) and lets a decision engine answer the query,
calling tools as often as it needs to.

Configuration files are loaded from (in priority order):
1. --config <path>        Explicit config file
2. ./toolrelay.toml       Project-level config
3. ~/.config/toolrelay/config.toml   Global config

Example:
  toolrelay "Calculate 100 + 55, give the current time, then echo the result."
  toolrelay --server-cmd filesystem-server --script demos/list_files.toml "What is in /tmp?"
  toolrelay --engine gemini --model gemini-2.5-flash-lite "What time is it?"
  toolrelay --list-tools --server-cmd time-math-server
"#)]
pub struct Cli {
    /// The request to answer
    pub query: Option<String>,

    /// Tool server executable
    #[arg(long, value_name = "CMD")]
    pub server_cmd: Option<String>,

    /// Argument for the tool server (can be specified multiple times)
    #[arg(long = "server-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub server_args: Vec<String>,

    /// Environment variable for the tool server (can be specified multiple times)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Decision engine
    #[arg(long, value_enum)]
    pub engine: Option<EngineArg>,

    /// Script file for the script engine (.toml or .json)
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Model for the gemini engine
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Per-request deadline for the tool server in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Maximum tool-call rounds per turn
    #[arg(long, value_name = "N")]
    pub max_tool_rounds: Option<usize>,

    /// Continue even if the server advertises no tools
    #[arg(long)]
    pub allow_empty_catalog: bool,

    /// Print the tool catalog and exit
    #[arg(long)]
    pub list_tools: bool,

    /// Print successful tool results as they arrive
    #[arg(long)]
    pub show_results: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Append a JSONL transcript of the conversation to this file
    #[arg(long, value_name = "PATH")]
    pub conversation_log: Option<PathBuf>,

    /// User identity of the session
    #[arg(long, value_name = "ID", default_value = "mcp_user")]
    pub user_id: String,

    /// Session identity
    #[arg(long, value_name = "ID", default_value = "session_01")]
    pub session_id: String,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}
