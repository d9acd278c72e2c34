// src/main.rs

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rosdep::{
    InstallOptions, InstallerContext, RosdepConfig, RosdepInstaller, RosdepLookup,
    register_platforms,
};
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "rosdep")]
#[command(author, version, about = "Resolve and install system dependencies of source packages", long_about = None)]
struct Cli {
    /// Config file (default: /etc/rosdep/config.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the detected OS, as NAME:VERSION
    #[arg(long, global = true, value_name = "NAME:VERSION")]
    os: Option<String>,

    /// Print commands before running them and enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the rosdep keys declared by packages
    Keys {
        #[arg(required = true)]
        packages: Vec<String>,
    },
    /// List the packages that declare rosdep keys
    WhatNeeds {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Show which rule files define a rosdep key
    WhereDefined { key: String },
    /// Resolve the system packages needed by packages
    Resolve {
        #[arg(required = true)]
        packages: Vec<String>,
    },
    /// Check that the system packages needed by packages are installed
    Check {
        #[arg(required = true)]
        packages: Vec<String>,
    },
    /// Install the system packages needed by packages
    Install {
        #[arg(required = true)]
        packages: Vec<String>,
        /// Print the install commands instead of running them
        #[arg(short, long)]
        simulate: bool,
        /// Answer yes to package manager prompts
        #[arg(short = 'y', long)]
        default_yes: bool,
        /// Keep installing after a failure
        #[arg(short = 'r', long)]
        continue_on_error: bool,
    },
}

fn load_config(cli: &Cli) -> Result<RosdepConfig> {
    let mut config = match &cli.config {
        Some(path) => RosdepConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?
            .with_env(),
        None => RosdepConfig::from_env()?,
    };
    if let Some(os) = &cli.os {
        config.os_override = Some(os.clone());
        config.os_override()?;
    }
    config.verbose |= cli.verbose;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let config = load_config(&cli)?;
    debug!("Configuration: {:?}", config);

    let mut context = InstallerContext::new();
    register_platforms(&mut context)?;
    context.apply_config(&config)?;

    let mut lookup = RosdepLookup::create_from_config(&config)?;

    match cli.command {
        Commands::Keys { packages } => {
            for package in &packages {
                for key in lookup.get_rosdeps(package)? {
                    println!("{}", key);
                }
            }
        }
        Commands::WhatNeeds { keys } => {
            for key in &keys {
                for package in lookup.get_packages_that_need(key)? {
                    println!("{}", package);
                }
            }
        }
        Commands::WhereDefined { key } => {
            let defined = lookup.get_units_that_define(&key)?;
            for error in lookup.get_errors() {
                warn!("{}: {}", error.origin, error.error);
            }
            if defined.is_empty() {
                bail!("rosdep key [{}] is not defined", key);
            }
            for (unit, origin) in defined {
                println!("{}\t{}", unit, origin);
            }
        }
        Commands::Resolve { packages } => {
            let (resolutions, errors) = lookup.resolve_all(&packages, &context)?;
            for (installer_key, resolved) in &resolutions {
                println!("#{}", installer_key);
                println!("{}", resolved.join(" "));
            }
            report_errors(&errors)?;
        }
        Commands::Check { packages } => {
            let mut installer = RosdepInstaller::new(&context, &mut lookup);
            let (uninstalled, errors) = installer.get_uninstalled(&packages)?;
            let mut missing = 0;
            for (installer_key, resolved) in &uninstalled {
                for package in resolved {
                    println!("{}\t{}", installer_key, package);
                    missing += 1;
                }
            }
            report_errors(&errors)?;
            if missing > 0 {
                bail!("{} system package(s) are not installed", missing);
            }
            println!("All system dependencies have been satisfied");
        }
        Commands::Install {
            packages,
            simulate,
            default_yes,
            continue_on_error,
        } => {
            let options = InstallOptions {
                interactive: !default_yes,
                simulate,
                continue_on_error,
                verbose: config.verbose,
            };
            let mut installer = RosdepInstaller::new(&context, &mut lookup);
            let report = installer.install(&packages, &options)?;
            debug!("Install report: {:?}", report);
            if !simulate {
                println!(
                    "{} installed, {} already present",
                    report.installed.len(),
                    report.skipped.len()
                );
            }
        }
    }

    Ok(())
}

fn report_errors(errors: &rosdep::lookup::ResolutionErrors) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    for (key, error) in errors {
        eprintln!("ERROR: {}: {}", key, error);
    }
    bail!("{} rosdep key(s) could not be resolved", errors.len())
}
