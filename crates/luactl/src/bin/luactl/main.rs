mod cli;

use luactl::context::Context;
use luactl::rewrite::MissingDefault;
use luactl::sync::{Mode, Processor, SyncConfig, SyncError, SyncSummary};

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_env("LUACTL_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(level = %cli.log_level, "Using log level");

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let ctx = Context::with_timeout(cli.timeout);

    let command_result = match cli.command {
        cli::Command::Sync(sync_cli) => sync(&ctx, sync_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn sync(ctx: &Context, cli: cli::SyncCommand) -> anyhow::Result<()> {
    let config = SyncConfig {
        modules_dir: cli.modules_dir,
        target_dir: cli.target_dir,
        nested_dir: cli.nested_dir,
        mode: match cli.mode {
            cli::SyncMode::GenerateRootOnly => Mode::GenerateRootOnly,
            cli::SyncMode::RewriteConsumer => Mode::RewriteConsumer,
        },
        namespace_key: cli.namespace,
        missing_default: if cli.skip_missing_defaults {
            MissingDefault::Skip
        } else {
            MissingDefault::Null
        },
    };

    let processor = Processor::new(config);

    match processor.process_modules(ctx) {
        Ok(summary) => {
            tracing::info!("Variable synchronization completed successfully");
            output(cli.format, &summary)
        }
        Err(SyncError::ModulesFailed(summary)) => {
            output(cli.format, &summary)?;
            tracing::error!("Variable synchronization failed");
            Err(SyncError::ModulesFailed(summary).into())
        }
        Err(err) => {
            tracing::error!(error = %err, "Variable synchronization failed");
            Err(err.into())
        }
    }
}

fn output(format: Option<cli::OutputFormat>, summary: &SyncSummary) -> anyhow::Result<()> {
    match format {
        Some(cli::OutputFormat::Yaml) => serde_yaml::to_writer(std::io::stdout(), summary)?,
        Some(cli::OutputFormat::Json) => serde_json::to_writer_pretty(std::io::stdout(), summary)?,
        None => {}
    };

    Ok(())
}

/// (luactl-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: cli::DevCommand) -> anyhow::Result<()> {
    use cli::DevSubCommand::*;

    match cli.command {
        Declarations { file } => {
            let document = luactl::document::Document::load(&file)?;
            let declarations = luactl::declaration::extract_blocks(
                &document,
                luactl::declaration::VARIABLE_BLOCK,
            );
            println!("{declarations:#?}");
        }
        Document { file } => {
            let document = luactl::document::Document::load(&file)?;
            println!("{document:#?}");
        }
    }

    Ok(())
}
