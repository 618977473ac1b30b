use agent_runtime_core::config::Settings;
use agent_runtime_core::handler::{ExecuteRequest, Handler};
use agent_runtime_core::llm::LlmClient;
use agent_runtime_core::manager::{Manager, ManagerConfig};
use agent_runtime_core::ptc::PtcGenerator;
use agent_runtime_core::sandbox::LocalSandboxAdapter;
use agent_runtime_core::skills::{SkillExecutor, SkillRegistry};
use std::io::{self, Read, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const SKILL_EXEC_SUBCOMMAND: &str = "__skill-exec";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    if args.next().as_deref() == Some(SKILL_EXEC_SUBCOMMAND) {
        let name = args.next().ok_or("missing skill name argument")?;
        return run_skill_exec(&name).await;
    }

    init_logging();
    info!("starting agent runtime core");

    let settings = init_settings();
    let registry = Arc::new(SkillRegistry::from_env());
    if let Err(e) = registry.scan().await {
        error!("initial skill scan failed: {e}");
    }

    let llm_client = LlmClient::new(&settings);
    let sandbox = Arc::new(LocalSandboxAdapter::from_env());
    if !sandbox.health_check().await {
        error!("sandbox interpreter health check failed; continuing anyway");
    }
    let ptc = Arc::new(PtcGenerator::new(Arc::clone(&registry), llm_client));

    let manager = Manager::start_with_components(ManagerConfig::default(), ptc, sandbox);
    let handler = Arc::new(Handler::new(Arc::clone(&manager), Arc::clone(&registry)));

    let repl = tokio::spawn(run_repl(Arc::clone(&handler)));

    tokio::select! {
        result = repl => {
            if let Err(e) = result {
                error!("REPL task failed: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
        _ = wait_for_sigterm() => {
            info!("received SIGTERM");
        }
    }

    info!("shutting down");
    handler.shutdown().await;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("failed to install SIGTERM handler");
    term.recv().await;
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await;
}

/// A minimal interactive `Execute` loop: one task per line, state kept
/// under a fixed session id unless `--session <id>` was passed.
async fn run_repl(handler: Arc<Handler>) {
    let session_id = parse_session_flag();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print!("> ");
    let _ = io::stdout().flush();
    while let Ok(Some(line)) = lines.next_line().await {
        let task = line.trim();
        if task.is_empty() {
            print!("> ");
            let _ = io::stdout().flush();
            continue;
        }
        if task == ":quit" {
            break;
        }

        let response = handler
            .execute(ExecuteRequest {
                task: task.to_string(),
                session_id: Some(session_id.clone()),
                r#continue: true,
                available_skills: None,
            })
            .await;

        match serde_json::to_string_pretty(&response) {
            Ok(json) => println!("{json}"),
            Err(e) => error!("failed to serialize response: {e}"),
        }
        print!("> ");
        let _ = io::stdout().flush();
    }
}

fn parse_session_flag() -> String {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--session" {
            if let Some(id) = args.next() {
                return id;
            }
        }
    }
    uuid::Uuid::new_v4().to_string()
}

/// The hidden counterpart the embedded Python `SkillExecutor` shim shells
/// out to (spec.md §9; see `sandbox::wrap::wrap_code`). Reads a JSON input
/// value from stdin, runs the real executor, and prints the full
/// `{success, output, error, execution_time_ms}` result to stdout. Always
/// exits zero: skill-level failures (`SkillNotFound`, `Validation`, ...)
/// are a normal return value, not a process failure, so synthesized code
/// that never wraps `executor.execute` in a try/except still observes the
/// structured error (spec.md §8 scenario 5).
async fn run_skill_exec(name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut input_buf = String::new();
    io::stdin().lock().read_to_string(&mut input_buf)?;
    let input: serde_json::Value = if input_buf.trim().is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(&input_buf)?
    };

    let registry = Arc::new(SkillRegistry::from_env());
    let executor = SkillExecutor::new(registry);
    let outcome = executor.execute(name, input).await;
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn init_settings() -> Settings {
    match Settings::load() {
        Ok(s) => {
            info!("configuration loaded");
            s
        }
        Err(e) => {
            error!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    }
}
