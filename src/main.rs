use std::{fs, os::unix::process::CommandExt, path::PathBuf, process::{exit, Command}};
use anyhow::{Context, Result};
use clap::Parser;
use nix::unistd::{fork, ForkResult};
use pwnbox::{error::{FAILURE_EXIT_CODE, VIOLATION_EXIT_CODE}, ptrace, server, state::{State, DEFAULT_LOG_DIR, DEFAULT_PREFIX}, Error};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(version, about = "Run a command under a ptrace syscall sandbox", long_about = None)]
struct Cli {
  /// Directory receiving the capture and syscall log files
  #[arg(short='d', long, value_name="DIR", env="PWNBOX_LOG_DIR", default_value=DEFAULT_LOG_DIR)]
  log_dir: PathBuf,

  /// File name prefix of every capture file
  #[arg(short, long, env="PWNBOX_PREFIX", default_value=DEFAULT_PREFIX)]
  prefix: String,

  /// Log every syscall entry and exit
  #[arg(short, long)]
  verbose: bool,

  #[arg(last = true, required = true)]
  command: Vec<String>
}

fn main() {
  let args = Cli::parse();

  let log_level = if args.verbose { "debug" } else { "info" };
  tracing_subscriber::registry()
    .with(tracing_subscriber::EnvFilter::new(
      std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
    ))
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  match sandbox(args) {
    Ok(code) => exit(code),
    Err(err) => {
      let code = err.downcast_ref::<Error>().map_or(FAILURE_EXIT_CODE, Error::exit_code);
      if code != VIOLATION_EXIT_CODE {
        error!("{:#}", err);
      }
      exit(code);
    }
  }
}

fn sandbox(args: Cli) -> Result<i32> {
  fs::create_dir_all(&args.log_dir)
    .with_context(|| format!("failed to create log directory {}", args.log_dir.display()))?;
  let state = State::new(&args.log_dir, args.prefix.as_str());

  match unsafe { fork().context("fork failed")? } {
    ForkResult::Child => {
      if let Err(err) = ptrace::traceme() {
        eprintln!("PTRACE_TRACEME failed: {}", err);
        exit(127);
      }
      let mut cmd = Command::new(&args.command[0]);
      if args.command.len() > 1 {
        cmd.args(&args.command[1..]);
      }
      let err = cmd.exec();
      eprintln!("failed to execute {}: {}", args.command[0], err);
      exit(127);
    }

    ForkResult::Parent { child } => {
      info!(pid = %child, command = ?args.command, log_dir = %args.log_dir.display(), "tracing");
      Ok(server::run(&state, child)?)
    }
  }
}
