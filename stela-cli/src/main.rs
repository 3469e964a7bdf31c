//! Command-line front end: load an image, run it, report diagnostics.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use stela_asm::Image;
use stela_vm::error::VmError;
use stela_vm::interpreter::Interpreter;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "stela", about = "Execute a compiled stela bytecode image.")]
struct Args {
    /// Path to the bytecode file.
    file: PathBuf,
}

fn run(args: Args) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("cannot read {}", args.file.display()))?;

    let image = Image::parse(&bytes).map_err(VmError::from)?;

    debug!(
        globals = image.global_area_size(),
        publics = image.publics().len(),
        code_bytes = image.code().len(),
        "image loaded"
    );
    for entry in image.publics() {
        let name = image.public_name(entry).unwrap_or(b"?");
        debug!(
            name = %String::from_utf8_lossy(name),
            offset = entry.code_offset,
            "public symbol"
        );
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut vm = Interpreter::new(image, stdin.lock(), stdout.lock()).map_err(VmError::from)?;
    vm.run().map_err(VmError::from)?;

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
