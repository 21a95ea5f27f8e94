use budgetflow_core::domain::request::RequestId;
use budgetflow_core::errors::CoordinatorError;

use crate::commands::context::{run_workflow, Completed};
use crate::commands::CommandResult;

#[derive(Debug, Clone, clap::Args)]
pub struct ProgressArgs {
    #[arg(help = "Request identifier")]
    pub request_id: String,
}

pub fn run(args: &ProgressArgs) -> CommandResult {
    let request_id = RequestId(args.request_id.clone());

    run_workflow("progress", |coordinator| async move {
        let projection = coordinator.progress(&request_id).await?;
        let message = format!(
            "{}: {} of {} steps done",
            projection.status.label(),
            projection.done_count(),
            projection.steps.len()
        );
        Ok::<_, CoordinatorError>(Completed::new(message, &projection))
    })
}
