pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::{contact, decide, office, progress, submit};

#[derive(Debug, Parser)]
#[command(
    name = "budgetflow",
    about = "Budget request workflow operator CLI",
    long_about = "Apply migrations, inspect configuration, and drive budget requests through the approval chain.",
    after_help = "Examples:\n  budgetflow migrate\n  budgetflow submit --actor-id u-1 --actor-role teacher --file draft.json\n  budgetflow decide REQ --actor-id u-2 --actor-role kyoto --decision approved\n  budgetflow progress REQ"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Submit a new budget request from a JSON draft file")]
    Submit(submit::SubmitArgs),
    #[command(about = "Approve or reject the current approval step of a request")]
    Decide(decide::DecideArgs),
    #[command(about = "Office: mark an approved request's cash as prepared")]
    PrepareCash(office::OfficeArgs),
    #[command(about = "Office: record that prepared cash was handed over")]
    Disburse(office::OfficeArgs),
    #[command(about = "Show the approval progress of a request")]
    Progress(progress::ProgressArgs),
    #[command(about = "Record the contact address used for request owner notifications")]
    Contact(contact::ContactArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Submit(args) => submit::run(&args),
        Command::Decide(args) => decide::run(&args),
        Command::PrepareCash(args) => office::prepare_cash(&args),
        Command::Disburse(args) => office::disburse(&args),
        Command::Progress(args) => progress::run(&args),
        Command::Contact(args) => contact::run(&args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
