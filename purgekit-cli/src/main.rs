mod cli;
mod commands;
mod config;
mod error;
mod output;

use crate::{
    cli::{Args, Commands},
    commands::CommandExecutor,
    config::AppConfig,
    error::Result,
};
use clap::Parser;
#[cfg(feature = "colored-output")]
use colored::*;
use std::process;
use tracing::{Level, debug, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        error!("Application error: {}", e);
        #[cfg(feature = "colored-output")]
        {
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
        #[cfg(not(feature = "colored-output"))]
        {
            eprintln!("Error: {}", e);
        }
        process::exit(e.exit_code());
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet)?;

    let config_path = args.config.as_deref();

    // Load configuration
    let mut config = AppConfig::load(config_path)?;
    config.apply_cdn_overrides(args.cdn_email, args.cdn_api_key, args.cdn_zone_id);
    if args.no_color {
        config.colored_output = false;
    }
    #[cfg(feature = "colored-output")]
    {
        if !config.colored_output {
            colored::control::set_override(false);
        }
    }

    debug!("Starting purgekit with output format {}", config.default_output_format);

    // Execute command
    match args.command {
        Commands::Status { output } => {
            CommandExecutor::new(config, config_path, args.quiet)?
                .status(output)
                .await?;
        }

        Commands::Purge {
            backends,
            detach,
            output,
        } => {
            CommandExecutor::new(config, config_path, args.quiet)?
                .purge(backends, detach, output)
                .await?;
        }

        Commands::Last { output } => {
            CommandExecutor::new(config, config_path, args.quiet)?
                .last(output)
                .await?;
        }

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Args::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        }

        Commands::Config { show, reset, path } => {
            if reset {
                AppConfig::reset(config_path)?;
                println!("✓ Configuration reset to defaults");
            } else if show {
                println!("{}", config.show()?);
            } else if path {
                match AppConfig::resolve_path(config_path) {
                    Some(path) => println!("{}", path.display()),
                    None => println!("No configuration path available"),
                }
            } else {
                println!(
                    "Use --show to display current configuration, --reset to reset to defaults or --path to locate it"
                );
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(verbose)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();

    Ok(())
}
