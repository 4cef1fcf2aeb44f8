use clap::Parser;
use cli::{CliArgs, CliCommand};
use commands::{down::cli_down, initialize::cli_initialize, status::cli_status, up::cli_up};
use miette::{Context, IntoDiagnostic, Result};

mod cli;
mod commands;


pub fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    if let Err(error) = dotenvy::dotenv() {
        if !error.not_found() {
            return Err(error)
                .into_diagnostic()
                .wrap_err("failed to load dotenv file");
        }
    }


    match cli_args.command {
        CliCommand::Initialize(initialize_command_args) => cli_initialize(initialize_command_args),
        CliCommand::Status(status_command_args) => cli_status(status_command_args),
        CliCommand::Up(up_command_args) => cli_up(up_command_args),
        CliCommand::Down(down_command_args) => cli_down(down_command_args),
    }
}
