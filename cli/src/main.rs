//! CLI entrypoint for toolrelay
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use toolrelay_application::{
    ConversationLogger, DecisionEngine, Dispatcher, NoConversationLogger, RegistryError,
    RunTurnUseCase, ToolRegistry, ToolTransport,
};
use toolrelay_domain::{OutputEvent, Session};
use toolrelay_infrastructure::{
    ConfigLoader, EngineKind, FileConfig, JsonlConversationLogger, McpTransport, Script,
    ScriptedEngine,
};
use toolrelay_presentation::{
    Cli, ConsoleFormatter, EngineArg, EventFormatter, JsonFormatter, OutputFormat,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level; stdout carries the conversation
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose >= 2)
        .with_writer(std::io::stderr)
        .init();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(ExitCode::SUCCESS);
    }

    info!("Starting toolrelay");

    // === Configuration ===
    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow!("{}", e))?
    };
    apply_overrides(&cli, &mut config);
    config.validate()?;

    let formatter: Box<dyn EventFormatter> = match cli.output {
        OutputFormat::Text => Box::new(ConsoleFormatter::new().with_results(cli.show_results)),
        OutputFormat::Json => Box::new(JsonFormatter),
    };

    // Query is checked before anything is spawned
    let query = match (&cli.query, cli.list_tools) {
        (Some(q), _) => Some(q.clone()),
        (None, true) => None,
        (None, false) => bail!("A query is required. Use --list-tools to only show the catalog."),
    };

    // === Dependency Injection ===
    let engine = build_engine(&config)?;

    let transport = Arc::new(
        McpTransport::connect(
            &config.server.command,
            &config.server.args,
            &config.server.env,
            config.transport_config(),
        )
        .await?,
    );

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling the running turn");
                cancel.cancel();
            }
        })
    };

    let outcome = run_session(
        &cli,
        &config,
        query,
        engine,
        Arc::clone(&transport) as Arc<dyn ToolTransport>,
        formatter.as_ref(),
        cancel,
    )
    .await;

    // The connection is closed on every exit path
    if let Some(text) = formatter.format_closing() {
        print_flush(&text);
    }
    transport.close().await;
    ctrl_c.abort();

    outcome
}

/// CLI flags take priority over every configuration file.
fn apply_overrides(cli: &Cli, config: &mut FileConfig) {
    if let Some(command) = &cli.server_cmd {
        config.server.command = command.clone();
        // Arguments from files belong to the configured command
        config.server.args.clear();
    }
    if !cli.server_args.is_empty() {
        config.server.args = cli.server_args.clone();
    }
    for (key, value) in &cli.env {
        config.server.env.insert(key.clone(), value.clone());
    }
    if let Some(engine) = cli.engine {
        config.engine.kind = match engine {
            EngineArg::Script => EngineKind::Script,
            EngineArg::Gemini => EngineKind::Gemini,
        };
    }
    if let Some(script) = &cli.script {
        config.engine.script = Some(script.clone());
    }
    if let Some(model) = &cli.model {
        config.engine.model = model.clone();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.runner.timeout_ms = timeout_ms;
    }
    if let Some(max_tool_rounds) = cli.max_tool_rounds {
        config.runner.max_tool_rounds = max_tool_rounds;
    }
    if cli.allow_empty_catalog {
        config.runner.catalog_required = false;
    }
    if let Some(path) = &cli.conversation_log {
        config.logging.conversation_log = Some(path.display().to_string());
    }
}

fn build_engine(config: &FileConfig) -> Result<Arc<dyn DecisionEngine>> {
    match config.engine.kind {
        EngineKind::Script => {
            let engine = match &config.engine.script {
                Some(path) => ScriptedEngine::from_path(path)?,
                None => {
                    info!("No script configured, using the built-in demo script");
                    ScriptedEngine::new(Script::demo())
                }
            };
            Ok(Arc::new(engine))
        }
        #[cfg(feature = "gemini")]
        EngineKind::Gemini => {
            let engine =
                toolrelay_infrastructure::GeminiEngine::new(config.engine.to_engine_config())?;
            Ok(Arc::new(engine))
        }
        #[cfg(not(feature = "gemini"))]
        EngineKind::Gemini => {
            bail!("This build has no Gemini support. Rebuild with `--features gemini`.")
        }
    }
}

fn build_conversation_logger(config: &FileConfig) -> Arc<dyn ConversationLogger> {
    match &config.logging.conversation_log {
        Some(path) => match JsonlConversationLogger::open(path) {
            Some(logger) => {
                info!("Conversation log: {}", logger.path().display());
                Arc::new(logger)
            }
            None => Arc::new(NoConversationLogger),
        },
        None => Arc::new(NoConversationLogger),
    }
}

async fn run_session(
    cli: &Cli,
    config: &FileConfig,
    query: Option<String>,
    engine: Arc<dyn DecisionEngine>,
    transport: Arc<dyn ToolTransport>,
    formatter: &dyn EventFormatter,
    cancel: CancellationToken,
) -> Result<ExitCode> {
    let registry = match ToolRegistry::load_with_cancel(transport.as_ref(), &cancel).await {
        Ok(registry) => registry,
        Err(RegistryError::EmptyCatalog) if !config.runner.catalog_required => {
            warn!("Tool server advertises no tools; continuing without a catalog");
            ToolRegistry::empty()
        }
        Err(e) => return Err(e).context("Failed to load the tool catalog"),
    };
    info!("Loaded {} tool(s): {}", registry.len(), registry.names().collect::<Vec<_>>().join(", "));

    if cli.list_tools {
        print_flush(&formatter.format_catalog(registry.describe()));
        return Ok(ExitCode::SUCCESS);
    }
    let Some(query) = query else {
        return Ok(ExitCode::SUCCESS);
    };

    let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry), transport));
    let use_case = Arc::new(
        RunTurnUseCase::new(engine, dispatcher)
            .with_params(config.runner_params())
            .with_conversation_logger(build_conversation_logger(config)),
    );

    let session = Session::new(&cli.user_id, &cli.session_id);

    if let Some(text) = formatter.format_user(&query) {
        print_flush(&text);
    }
    if let Some(text) = formatter.format_turn_start() {
        print_flush(&text);
    }

    let mut handle = use_case.start_turn(session, query, cancel);
    let mut succeeded = false;
    while let Some(event) = handle.next_event().await {
        if let Some(text) = formatter.format_event(&event) {
            print_flush(&text);
        }
        if let OutputEvent::Completed { rounds } = event {
            info!("Turn completed after {} tool round(s)", rounds);
            succeeded = true;
        }
    }
    let session = handle.finish().await?;
    info!(
        session_id = session.session_id(),
        messages = session.history().len(),
        "Session finished"
    );

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_flush(text: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(text.as_bytes());
    let _ = stdout.flush();
}
