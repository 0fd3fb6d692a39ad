//! rudder-typer CLI
//!
//! Commands:
//! - `rudder-typer generate` - Generate typed analytics bindings from a tracking plan
//! - `rudder-typer options` - List the options a platform accepts

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rudder_typer::{
    available_options, load_tracking_plan, parse_option_pairs, FileTrackingPlanSource,
    GenerateOptions, JsonSchemaPlanProvider, RudderTyper, TyperError,
};

#[derive(Parser)]
#[command(name = "rudder-typer")]
#[command(author, version, about = "Generate typed analytics code from a tracking plan", long_about = None)]
struct Cli {
    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate code for a tracking plan
    Generate {
        /// Tracking plan payload (JSON, as served by the catalog API)
        #[arg(short = 'p', long)]
        plan: PathBuf,

        /// Target platform
        #[arg(long, default_value = "kotlin")]
        platform: String,

        /// Output directory for generated code
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Platform option as key=value (repeatable)
        #[arg(long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,

        /// Print the parsed tracking plan as JSON instead of generating
        #[arg(long)]
        dump_plan: bool,
    },

    /// List the options a platform accepts
    Options {
        /// Target platform
        platform: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "rudder_typer=debug" } else { "rudder_typer=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> Result<(), TyperError> {
    match command {
        Commands::Generate {
            plan,
            platform,
            output,
            options,
            dump_plan,
        } => {
            if dump_plan {
                let parsed = load_tracking_plan(&plan)?;
                println!("{}", serde_json::to_string_pretty(&parsed)?);
                return Ok(());
            }

            let mut generate_options = GenerateOptions::new(platform);
            generate_options.platform_options = parse_option_pairs(&options)?;

            let provider = JsonSchemaPlanProvider::new(FileTrackingPlanSource::new(&plan));
            let written = RudderTyper::new(provider).generate_and_write(&generate_options, &output)?;
            for path in &written {
                eprintln!("wrote: {}", path.display());
            }
            Ok(())
        }
        Commands::Options { platform } => {
            for option in available_options(&platform)? {
                match option.default {
                    Some(default) => println!(
                        "{}\t{} (default: {default})",
                        option.name, option.description
                    ),
                    None => println!("{}\t{}", option.name, option.description),
                }
            }
            Ok(())
        }
    }
}
