mod commands;
mod config;

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use engine_command::console::DEFAULT_LOG_CAPACITY;
use engine_command::{Argument, Console, ConsoleLog};
use engine_protocol::{Protocol, Schema};
use tracing::{error, info, warn};

use commands::{Session, build_console};
use config::ConsoleConfig;

#[derive(Parser)]
#[command(
    name = "engine-console",
    about = "Game console with packet codec tooling and an entity sandbox"
)]
struct Args {
    /// Directory searched recursively for .proto descriptor files
    #[arg(short, long)]
    schema_dir: Option<std::path::PathBuf>,

    /// Config script run at startup; may be repeated
    #[arg(long)]
    script: Vec<std::path::PathBuf>,

    /// Number of lines kept in the console log
    #[arg(long, default_value_t = DEFAULT_LOG_CAPACITY)]
    log_capacity: usize,

    /// Run a single command and exit
    #[arg(short, long)]
    command: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();
    engine_command::install_panic_hook();

    let args = Args::parse();
    let mut config = ConsoleConfig::new().with_log_capacity(args.log_capacity);
    if let Some(dir) = args.schema_dir {
        config = config.with_schema_dir(dir);
    }
    for script in args.script {
        config = config.with_script(script);
    }

    let protocol = load_protocol(&config)?;
    let log = Arc::new(ConsoleLog::new(config.log_capacity));
    let (console, session) = build_console(protocol, log)?;

    for path in &config.scripts {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        let report = console.run_script(&[Argument::from("script")], &source);
        flush(&session);
        info!(
            script = %path.display(),
            executed = report.executed,
            failed = report.failures.len(),
            "ran script"
        );
    }

    if let Some(line) = args.command {
        let result = console.run_line(&[Argument::from("argv")], &line);
        flush(&session);
        return result.map_err(Into::into);
    }

    repl(&console, &session)
}

fn repl(console: &Console, session: &Session) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => return Ok(()),
            _ => {}
        }

        if let Err(e) = console.run_line(&[Argument::from("stdin")], line) {
            eprintln!("error: {e}");
        }
        flush(session);
    }
}

fn flush(session: &Session) {
    for line in session.take_output() {
        println!("{line}");
    }
}

fn load_protocol(config: &ConsoleConfig) -> anyhow::Result<Protocol> {
    let mut schema = Schema::new();
    if let Some(dir) = &config.schema_dir {
        if !dir.exists() {
            anyhow::bail!("schema directory not found: {}", dir.display());
        }
        info!(dir = %dir.display(), "loading descriptor files");
        load_schema_recursive(&mut schema, dir)?;
    }

    if schema.struct_names().is_empty() {
        warn!("no structs found in descriptor files");
    }

    let protocol = Protocol::compile(&schema).inspect_err(|e| error!(%e, "schema invalid"))?;
    info!(structs = protocol.struct_names().count(), "protocol compiled");
    Ok(protocol)
}

fn load_schema_recursive(schema: &mut Schema, dir: &Path) -> anyhow::Result<()> {
    let mut paths = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.sort();

    for path in paths {
        if path.is_dir() {
            load_schema_recursive(schema, &path)?;
        } else if path.extension().is_some_and(|e| e == "proto") {
            schema
                .load_file(&path)
                .with_context(|| format!("failed to load {}", path.display()))?;
        }
    }
    Ok(())
}
