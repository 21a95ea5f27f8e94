use std::fs;
use std::path::PathBuf;

use budgetflow_core::errors::CoordinatorError;
use budgetflow_core::submission::SubmissionDraft;

use crate::commands::context::{run_workflow, Completed};
use crate::commands::{ActorArgs, CommandResult};

#[derive(Debug, Clone, clap::Args)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub actor: ActorArgs,
    #[arg(long, conflicts_with = "json", help = "Path to a JSON submission draft")]
    pub file: Option<PathBuf>,
    #[arg(long, help = "Inline JSON submission draft")]
    pub json: Option<String>,
}

pub fn run(args: &SubmitArgs) -> CommandResult {
    let draft = match read_draft(args) {
        Ok(draft) => draft,
        Err(message) => return CommandResult::failure("submit", "invalid_input", message, 2),
    };
    let actor = args.actor.actor();

    run_workflow("submit", |coordinator| async move {
        let request = coordinator.submit(&actor, &draft).await?;
        Ok::<_, CoordinatorError>(Completed::new(
            format!("submitted request {} ({})", request.id, request.status),
            &request,
        ))
    })
}

fn read_draft(args: &SubmitArgs) -> Result<SubmissionDraft, String> {
    let raw = match (&args.file, &args.json) {
        (Some(path), _) => fs::read_to_string(path)
            .map_err(|error| format!("could not read {}: {error}", path.display()))?,
        (None, Some(raw)) => raw.clone(),
        (None, None) => return Err("either --file or --json is required".to_string()),
    };
    serde_json::from_str(&raw).map_err(|error| format!("draft is not valid JSON: {error}"))
}
