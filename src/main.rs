mod analysis;
mod bulk;
mod commands;
mod core;
mod graph;
mod safety;
mod ui;

use clap::{Parser, Subcommand};
use crate::core::error::{WardenError, print_error};
use std::path::PathBuf;

/// Local static analysis with transaction-safe automatic fixes
#[derive(Parser)]
#[command(name = "warden")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct WardenCli {
  /// Project root (default: current directory)
  #[arg(long, global = true)]
  path: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Analyze the project and report issues
  Analyze {
    /// Run the full analyzer set, not just the core pass
    #[arg(short, long)]
    comprehensive: bool,
    /// Minimum severity to report: low, medium, high, critical
    #[arg(long, default_value = "low")]
    threshold: String,
    /// Output the report in JSON format
    #[arg(long)]
    json: bool,
    /// Exit non-zero when any issue is reported
    #[arg(long)]
    strict: bool,
  },

  /// Apply automatic fixes (default: dry-run preview)
  Fix {
    /// Actually write the fixes (default: dry-run mode showing the diff)
    #[arg(long)]
    apply: bool,
    /// Skip the test gate
    #[arg(long)]
    no_verify: bool,
  },

  /// Show the import graph and circular dependencies
  Graph {
    /// Output in JSON format
    #[arg(long)]
    json: bool,
    /// Exit non-zero when cycles exist
    #[arg(long)]
    strict: bool,
  },

  /// Restore an operation's files from its backup
  Rollback {
    /// Operation id (printed when the operation started)
    operation_id: String,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let cli = WardenCli::parse();

  let root = match cli.path {
    Some(path) => path,
    None => match std::env::current_dir() {
      Ok(dir) => dir,
      Err(e) => {
        eprintln!("Error: Failed to get current directory: {}", e);
        std::process::exit(1);
      }
    },
  };

  let result = match cli.command {
    Commands::Analyze {
      comprehensive,
      threshold,
      json,
      strict,
    } => commands::run_analyze(&root, comprehensive, &threshold, json, strict),
    Commands::Fix { apply, no_verify } => commands::run_fix(&root, apply, no_verify),
    Commands::Graph { json, strict } => commands::run_graph(&root, json, strict),
    Commands::Rollback { operation_id } => commands::run_rollback(&root, &operation_id),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: WardenError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
