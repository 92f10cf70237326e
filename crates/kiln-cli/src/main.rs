use clap::Parser;
use kiln_cli::cli::{Cli, Command};
use kiln_cli::error::cli_error_to_miette;
use kiln_cli::{commands, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logger::init_logger(cli.verbose, cli.quiet, cli.no_color);
    ui::init(cli.no_color, cli.quiet);

    let result = match cli.command {
        Command::Build(args) => commands::build_execute(args).await,
        Command::Cache(args) => commands::cache_execute(args),
    };

    result.map_err(cli_error_to_miette)
}
