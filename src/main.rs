use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use skillchain_config::CompositeSkill;
use skillchain_engine::{ChannelNotifier, ExecutionEvent, SkillExecutor, validate_composite_skill};
use skillchain_tool_process::{ProcessInvokerConfig, ProcessToolInvoker};

/// Skillchain - run composite skills built from chained tool calls
#[derive(Parser)]
#[command(name = "skillchain")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.skillchain)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Increase log verbosity (-v info, -vv debug)
  #[arg(short, long, global = true, action = clap::ArgAction::Count)]
  verbose: u8,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Check a skill definition without running it
  Validate {
    /// Path to the skill file (JSON)
    skill_file: PathBuf,
  },

  /// Run a skill with the input object read from stdin
  Run {
    /// Path to the skill file (JSON)
    skill_file: PathBuf,

    /// Directory of tool executables (default: <data-dir>/tools)
    #[arg(long)]
    tools_dir: Option<PathBuf>,

    /// Kill a tool that runs longer than this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Stream execution events to stderr as JSON lines
    #[arg(long)]
    events: bool,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".skillchain"),
  };

  match cli.command {
    Some(Commands::Validate { skill_file }) => validate_skill(&skill_file),
    Some(Commands::Run {
      skill_file,
      tools_dir,
      timeout_ms,
      events,
    }) => {
      let config = ProcessInvokerConfig {
        tools_dir: tools_dir.unwrap_or_else(|| data_dir.join("tools")),
        timeout_ms,
      };
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { run_skill(&skill_file, config, events).await })
    }
    None => {
      println!("skillchain - use --help to see available commands");
      Ok(())
    }
  }
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` wins over
/// `-v` when set.
fn init_tracing(verbose: u8) {
  let default = match verbose {
    0 => "warn",
    1 => "info",
    _ => "debug",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(io::stderr)
    .init();
}

fn load_skill(skill_file: &Path) -> Result<CompositeSkill> {
  let content = std::fs::read_to_string(skill_file)
    .with_context(|| format!("failed to read skill file: {}", skill_file.display()))?;

  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse skill file: {}", skill_file.display()))
}

fn validate_skill(skill_file: &Path) -> Result<()> {
  let skill = load_skill(skill_file)?;
  let result = validate_composite_skill(&skill);

  println!("{}", serde_json::to_string_pretty(&result)?);

  if !result.valid {
    bail!("skill '{}' is invalid", skill.id);
  }
  Ok(())
}

async fn run_skill(skill_file: &Path, config: ProcessInvokerConfig, events: bool) -> Result<()> {
  let skill = load_skill(skill_file)?;

  let validation = validate_composite_skill(&skill);
  for warning in &validation.warnings {
    warn!(skill_id = %skill.id, warning = %warning, "skill_validation_warning");
  }
  validation
    .into_result()
    .with_context(|| format!("refusing to run skill file: {}", skill_file.display()))?;

  let input = read_input_from_stdin()?;
  let invoker = Arc::new(ProcessToolInvoker::new(config));

  let cancel = CancellationToken::new();
  tokio::spawn({
    let cancel = cancel.clone();
    async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupt received, cancelling after the current step");
        cancel.cancel();
      }
    }
  });

  let result = if events {
    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(rx));

    let executor = SkillExecutor::with_notifier(invoker, ChannelNotifier::new(tx));
    let result = executor.execute(&skill, input, cancel).await;

    // Closing the channel lets the printer drain and finish.
    drop(executor);
    printer.await.context("event printer failed")?;
    result
  } else {
    SkillExecutor::new(invoker)
      .execute(&skill, input, cancel)
      .await
  };

  println!("{}", serde_json::to_string_pretty(&result)?);

  if !result.success {
    bail!(
      "skill '{}' did not complete: {}",
      skill.id,
      result.error.as_deref().unwrap_or("unknown error")
    );
  }
  Ok(())
}

async fn print_events(mut rx: mpsc::UnboundedReceiver<ExecutionEvent>) {
  while let Some(event) = rx.recv().await {
    match serde_json::to_string(&event) {
      Ok(line) => eprintln!("{line}"),
      Err(e) => warn!(error = %e, "failed to serialize execution event"),
    }
  }
}

fn read_input_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    return Ok(serde_json::json!({}));
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read input from stdin")?;

  if input.trim().is_empty() {
    Ok(serde_json::json!({}))
  } else {
    serde_json::from_str(&input).context("failed to parse input JSON from stdin")
  }
}
