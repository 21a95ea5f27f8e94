use std::process::ExitCode;

fn main() -> ExitCode {
    budgetflow_cli::run()
}
