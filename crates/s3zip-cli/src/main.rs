//! s3zip CLI - streams S3 bucket prefixes into ZIP archives.

mod cli;
mod commands;
mod error;
mod logging;
mod output;
mod progress;

use anyhow::Result;
use clap::Parser;
use cli::OutputTarget;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    logging::init_logging(cli.effective_log_level());

    let archive_on_stdout = matches!(
        &cli.command,
        cli::Commands::Create(args) if args.target() == OutputTarget::Stdout
    );
    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet, archive_on_stdout);

    let result = match &cli.command {
        cli::Commands::Create(args) => commands::create::execute(args, &*formatter, cli.quiet),
        cli::Commands::List(args) => commands::list::execute(args, &*formatter),
        cli::Commands::Completion { shell } => {
            commands::completion::execute(*shell);
            Ok(())
        }
    };

    if cli.json
        && let Err(err) = &result
    {
        formatter.format_error(err);
    }

    result
}
