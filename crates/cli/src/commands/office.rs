use budgetflow_core::domain::request::RequestId;
use budgetflow_core::errors::CoordinatorError;

use crate::commands::context::{run_workflow, Completed};
use crate::commands::{ActorArgs, CommandResult};

#[derive(Debug, Clone, clap::Args)]
pub struct OfficeArgs {
    #[arg(help = "Request identifier")]
    pub request_id: String,
    #[command(flatten)]
    pub actor: ActorArgs,
}

pub fn prepare_cash(args: &OfficeArgs) -> CommandResult {
    let request_id = RequestId(args.request_id.clone());
    let actor = args.actor.actor();

    run_workflow("prepare-cash", |coordinator| async move {
        let outcome = coordinator.mark_ready_for_payment(&request_id, &actor).await?;
        let message = if outcome.notified {
            format!("cash prepared for {request_id}; owner notified")
        } else {
            format!("cash prepared for {request_id}; owner was not notified")
        };
        Ok::<_, CoordinatorError>(Completed::new(message, &outcome))
    })
}

pub fn disburse(args: &OfficeArgs) -> CommandResult {
    let request_id = RequestId(args.request_id.clone());
    let actor = args.actor.actor();

    run_workflow("disburse", |coordinator| async move {
        let outcome = coordinator.mark_completed(&request_id, &actor).await?;
        let message = format!("request {request_id} completed");
        Ok::<_, CoordinatorError>(Completed::new(message, &outcome))
    })
}
