use budgetflow_core::domain::approval::Decision;
use budgetflow_core::domain::request::RequestId;
use budgetflow_core::errors::CoordinatorError;
use serde_json::json;

use crate::commands::context::{run_workflow, Completed};
use crate::commands::{ActorArgs, CommandResult};

#[derive(Debug, Clone, clap::Args)]
pub struct DecideArgs {
    #[arg(help = "Request identifier")]
    pub request_id: String,
    #[command(flatten)]
    pub actor: ActorArgs,
    #[arg(long, value_parser = parse_decision, help = "approved or rejected")]
    pub decision: Decision,
    #[arg(long, default_value = "", help = "Optional comment recorded with the decision")]
    pub comment: String,
}

pub fn run(args: &DecideArgs) -> CommandResult {
    let request_id = RequestId(args.request_id.clone());
    let actor = args.actor.actor();
    let decision = args.decision;
    let comment = args.comment.clone();

    run_workflow("decide", |coordinator| async move {
        let outcome = coordinator.act(&request_id, &actor, decision, &comment).await?;
        let transition = &outcome.transition;
        let mut message =
            format!("request {} moved from {} to {}", request_id, transition.from, transition.to);
        let warning = outcome.audit.warning();
        if let Some(warning) = &warning {
            message.push_str(&format!(" ({warning})"));
        }
        Ok::<_, CoordinatorError>(Completed::new(
            message,
            &json!({
                "request_id": outcome.request_id,
                "from": transition.from,
                "to": transition.to,
                "decision": decision,
                "audit": outcome.audit,
                "warning": warning,
            }),
        ))
    })
}

fn parse_decision(value: &str) -> Result<Decision, String> {
    Decision::parse(value)
        .ok_or_else(|| format!("unknown decision `{value}` (expected approved or rejected)"))
}
