use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use color_eyre::Result;
use nano_banana::{Outcome, cli::Cli, exit_code, load_config, report, run, usage_status};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    pretty_env_logger::init();
    color_eyre::install()?;
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            e.print()?;
            return Ok(ExitCode::from(usage_status(&e)));
        }
    };

    match run(cli, load_config).await {
        Ok(Outcome::Done) => Ok(ExitCode::SUCCESS),
        Ok(Outcome::NeedsPrompt) => {
            Cli::command().print_help()?;
            report::tip("Provide a prompt to generate an image");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            report::error(&e);
            Ok(exit_code(&e))
        }
    }
}
