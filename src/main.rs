//! `livecfg`: inspect and watch live configuration.
//!
//! ```text
//! livecfg check [--engine toml] app.toml        parse one document
//! livecfg show  --settings livecfg.toml [path]  resolve values now
//! livecfg watch --settings livecfg.toml [path]  print changes until Ctrl-C
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use livecfg::loader::Encoding;
use livecfg::observability::logging;
use livecfg::resource::Environment;
use livecfg::settings::{self, Assembly};
use livecfg::{ConfigurationError, Engine, Shutdown, Value, ValueDefinition, ValueDefinitionGroup};

#[derive(Parser)]
#[command(name = "livecfg")]
#[command(about = "Inspect and watch live configuration snapshots", long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a configuration document and list its keys
    Check {
        /// Document format; inferred from the file extension when omitted
        #[arg(short, long)]
        engine: Option<Engine>,

        /// Character encoding override (utf-8, latin1)
        #[arg(long)]
        encoding: Option<Encoding>,

        file: PathBuf,
    },
    /// Resolve values through the configured fallback chain
    Show {
        #[arg(short, long)]
        settings: PathBuf,

        /// Paths to resolve; all paths when omitted
        paths: Vec<String>,
    },
    /// Print value changes as the configuration is reloaded
    Watch {
        #[arg(short, long)]
        settings: PathBuf,

        /// Paths to watch; all paths known at startup when omitted
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    match cli.command {
        Commands::Check {
            engine,
            encoding,
            file,
        } => check(engine, encoding, &file)?,
        Commands::Show { settings, paths } => {
            let assembly = assemble(&settings)?;
            let paths = if paths.is_empty() {
                assembly.service.paths()
            } else {
                paths
            };
            for path in paths {
                match assembly.service.resolve_optional::<Value>(&path)? {
                    Some(value) => println!("{} = {}", path, value),
                    None => println!("{} is not set", path),
                }
            }
        }
        Commands::Watch { settings, paths } => {
            let assembly = assemble(&settings)?;
            watch(assembly, paths).await?;
        }
    }

    Ok(())
}

fn check(
    engine: Option<Engine>,
    encoding: Option<Encoding>,
    file: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let extension = file.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let engine = match engine.or_else(|| Engine::for_extension(extension)) {
        Some(engine) => engine,
        None => return Err(ConfigurationError::UnknownEngine(extension.to_string()).into()),
    };

    let mut reader = File::open(file)?;
    let source = engine
        .loader()
        .parse(&mut reader, encoding)
        .map_err(|e| ConfigurationError::for_resource(file.display(), e))?;

    let paths = source.paths();
    println!("{}: {} document, {} keys", file.display(), engine, paths.len());
    for path in paths {
        println!("  {}", path);
    }
    Ok(())
}

fn assemble(settings_path: &Path) -> Result<Assembly, ConfigurationError> {
    let settings = settings::load_settings(settings_path)?;
    settings::assemble(&settings, &Environment::from_process())
}

async fn watch(assembly: Assembly, paths: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let paths = if paths.is_empty() {
        assembly.service.paths()
    } else {
        paths
    };

    let mut group = ValueDefinitionGroup::builder("livecfg-watch").on_change(|change| {
        tracing::info!(changed = change.changed.len(), "Watched values changed");
    });
    for path in paths {
        let label = path.clone();
        group = group.value(ValueDefinition::<Value>::optional(path).on_change(
            move |new, old| match (new, old) {
                (Some(new), Some(old)) => println!("{}: {} -> {}", label, old, new),
                (Some(new), None) => println!("{} = {}", label, new),
                (None, Some(old)) => println!("{}: {} -> (unset)", label, old),
                (None, None) => {}
            },
        ));
    }
    assembly.service.register(group.build())?;

    let shutdown = Shutdown::new();
    let reloader = assembly.start_reloader(&shutdown);
    if reloader.is_none() {
        tracing::warn!("Periodic reload is disabled in settings, waiting for Ctrl-C only");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    shutdown.trigger();
    if let Some(handle) = reloader {
        handle.await?;
    }
    Ok(())
}
