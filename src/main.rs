//! `sgtu-build`: compile a template project in place.
//!
//! Usage: `sgtu-build [build|transform|connection|check] [DIR]`

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::time::Instant;
use tracing::error;
use tracing_subscriber::EnvFilter;

use sgt_compiler::{
    build_connection, build_transform, check_conflicting_context_definitions, OxcCompressor,
    ProjectLayout,
};

#[derive(Parser, Debug)]
#[command(name = "sgtu-build")]
#[command(about = "Compile transform and connection functions into the template JSON")]
struct Args {
    /// Defaults to `build .`
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(ClapArgs, Debug, Clone)]
struct ProjectArgs {
    /// Template project directory
    #[arg(default_value = ".")]
    dir: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Check context definitions, then build transform and connection
    Build(ProjectArgs),
    /// Build transform/transform.js only
    Transform(ProjectArgs),
    /// Build connection/connection.js only
    Connection(ProjectArgs),
    /// Check that shared context variables are defined the same way
    Check(ProjectArgs),
}

impl Command {
    fn dir(&self) -> &PathBuf {
        match self {
            Command::Build(args)
            | Command::Transform(args)
            | Command::Connection(args)
            | Command::Check(args) => &args.dir,
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: &Command) -> anyhow::Result<()> {
    let start = Instant::now();
    let dir = command.dir();
    let project = ProjectLayout::new(dir.clone())
        .with_context(|| format!("cannot open project {}", dir.display()))?;
    let compressor = OxcCompressor;

    if matches!(command, Command::Build(_) | Command::Check(_)) {
        check_conflicting_context_definitions(&project)?;
    }
    if matches!(command, Command::Build(_) | Command::Transform(_)) {
        build_transform(&project, &compressor)?;
        println!(
            "Done building transform ({}ms)",
            start.elapsed().as_millis()
        );
    }
    if matches!(command, Command::Build(_) | Command::Connection(_)) {
        build_connection(&project, &compressor)?;
        println!(
            "Done building connection ({}ms)",
            start.elapsed().as_millis()
        );
    }
    if matches!(command, Command::Check(_)) {
        println!("Context definitions are consistent");
    }
    Ok(())
}

fn main() {
    init_logging();

    let args = Args::parse();
    let command = args.command.unwrap_or(Command::Build(ProjectArgs {
        dir: PathBuf::from("."),
    }));

    if let Err(err) = run(&command) {
        match err.downcast_ref::<sgt_compiler::CompileError>() {
            Some(compile_err) => error!(code = compile_err.code(), "{}", compile_err),
            None => error!("{:#}", err),
        }
        process::exit(1);
    }
}
