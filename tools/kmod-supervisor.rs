//! kmod-supervisor command line front end
//!
//! `run` installs every automatic module, waits for SIGTERM/SIGINT, then removes
//! them again. A module configuration with a cycle or a missing dependency makes
//! `run` exit non-zero before it waits. The other subcommands act once on the
//! imported module set.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use kmod_supervisor::utils::{init_logging_from_config, ShutdownListener};
use kmod_supervisor::{
    CommandLauncher, DryRunLauncher, KernelModuleManager, ProcessLauncher, SupervisorConfig,
    TreeConfigStore,
};

#[derive(Parser)]
#[command(name = "kmod-supervisor", version, about = "Kernel module lifecycle manager")]
struct Cli {
    /// Supervisor configuration file (TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Config store file; overrides `config_store` from the configuration
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Log loader commands instead of running them
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install automatic modules, wait for a shutdown signal, remove them
    Run,
    /// Install the named modules and their dependencies
    Insert {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Remove the named manual modules
    Remove {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Print the resolved dependency sequence for a module
    Plan {
        name: String,
        /// Show removal order instead of install order
        #[arg(long)]
        remove: bool,
    },
    /// List imported modules
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("kmod-supervisor: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => SupervisorConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {:?}", path))?,
        None => SupervisorConfig::default(),
    };
    config.validate()?;
    init_logging_from_config(config.logging.as_ref());

    let store_path = cli
        .store
        .clone()
        .or_else(|| config.config_store.as_ref().map(PathBuf::from))
        .context("No config store given (use --store or set config_store)")?;
    let store = TreeConfigStore::from_file(&store_path)
        .with_context(|| format!("Failed to load config store {:?}", store_path))?;

    let launcher: Box<dyn ProcessLauncher> = if cli.dry_run {
        Box::new(DryRunLauncher)
    } else {
        Box::new(CommandLauncher::new())
    };

    let mut manager = KernelModuleManager::new(config.kernel_modules.clone(), store, launcher);

    match cli.command {
        Commands::Run => {
            let shutdown = ShutdownListener::register()
                .context("Failed to register shutdown signal handlers")?;
            manager.start()?;
            info!("Kernel modules installed, waiting for shutdown signal");
            shutdown.wait();
            manager.remove_all()?;
        }
        Commands::Insert { names } => {
            manager.import_modules()?;
            manager.insert_list(&names)?;
        }
        Commands::Remove { names } => {
            manager.import_modules()?;
            manager.remove_list(&names)?;
        }
        Commands::Plan { name, remove } => {
            manager.import_modules()?;
            let sequence = manager.resolve(&name)?;
            let order: Vec<&str> = if remove {
                sequence.remove_order().collect()
            } else {
                sequence.install_order().collect()
            };
            for (step, module) in order.iter().enumerate() {
                println!("{:>3}  {}", step + 1, module);
            }
        }
        Commands::List { json } => {
            manager.import_modules()?;
            let modules: Vec<_> = manager.registry().iter().collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&modules)?);
            } else {
                for module in modules {
                    println!(
                        "{:<24} {:<7} {:<10} params={} requires=[{}]",
                        module.name(),
                        module.load_mode().to_string(),
                        module.load_status().to_string(),
                        module.parameters().len(),
                        module.required_modules().join(", ")
                    );
                }
            }
        }
    }

    Ok(())
}
