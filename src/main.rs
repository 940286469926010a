use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use numcc::{Emit, selftest};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmitKind {
  Asm,
  Tokens,
  Ast,
}

impl From<EmitKind> for Emit {
  fn from(kind: EmitKind) -> Self {
    match kind {
      EmitKind::Asm => Emit::Asm,
      EmitKind::Tokens => Emit::Tokens,
      EmitKind::Ast => Emit::Ast,
    }
  }
}

#[derive(Parser, Debug)]
#[command(name = "numcc")]
#[command(version, about = "Compile arithmetic statements to x86-64 assembly", long_about = None)]
struct Cli {
  /// Source file. Without INPUT and OUTPUT the built-in self-tests run.
  #[arg(value_name = "INPUT", requires = "output")]
  input: Option<PathBuf>,

  /// Where to write the generated assembly.
  #[arg(value_name = "OUTPUT")]
  output: Option<PathBuf>,

  #[arg(long, value_enum, default_value = "asm")]
  emit: EmitKind,

  /// Log pipeline progress to stderr (RUST_LOG takes precedence).
  #[arg(short, long)]
  verbose: bool,
}

fn init_tracing(verbose: bool) {
  let default_level = if verbose { "debug" } else { "warn" };
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  match (cli.input, cli.output) {
    (Some(input), Some(output)) => {
      match numcc::compile_file(&input, &output, cli.emit.into()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.offset().is_some() => {
          eprintln!("{}:{err}", input.display());
          ExitCode::FAILURE
        }
        Err(err) => {
          eprintln!("{err}");
          ExitCode::FAILURE
        }
      }
    }
    _ => match selftest::run() {
      Ok(passed) => {
        println!("{passed} self-tests passed");
        ExitCode::SUCCESS
      }
      Err(err) => {
        eprintln!("{err}");
        ExitCode::FAILURE
      }
    },
  }
}
