use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use classvm::{classfile, disasm, heap::Heap, run_entry};

/// A minimal interpreter for a stack-based bytecode subset.
#[derive(Debug, Parser)]
#[command(name = "classvm", about = "Run a class file on the toy bytecode VM")]
struct Cli {
    /// Path to the class file to execute.
    path: PathBuf,

    /// Raise logging verbosity (repeatable: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print a mnemonic disassembly of the entry method instead of running it.
    #[arg(long)]
    disassemble: bool,

    /// The method name to treat as the entry point.
    #[arg(long, default_value = "main")]
    entry: String,
}

fn main() -> ExitCode {
    // A wrong argument count must exit 1 with a usage message on stderr;
    // clap's own arg-parsing errors (including a missing or surplus
    // positional) default to exit 2, so they're intercepted here and
    // remapped instead.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{err}");
            return ExitCode::SUCCESS;
        }
        Err(_) => {
            eprintln!("usage: classvm <path-to-class-file>");
            return ExitCode::from(1);
        }
    };
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("classvm: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<(), classvm::error::ClassFileError> {
    let class = classfile::read_file(&cli.path)?;

    if cli.disassemble {
        let method = class
            .find_method(&cli.entry, classvm::ENTRY_DESCRIPTOR)
            .ok_or_else(|| classvm::error::ClassFileError::MethodNotFound {
                name: cli.entry.clone(),
                descriptor: classvm::ENTRY_DESCRIPTOR.to_string(),
            })?;
        print!("{}", disasm::disassemble(method));
        return Ok(());
    }

    let mut heap = Heap::new();
    run_entry(&class, &mut heap, &cli.entry)?;
    heap.free();
    Ok(())
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
