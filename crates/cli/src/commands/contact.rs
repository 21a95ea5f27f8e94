use budgetflow_core::domain::actor::UserId;
use budgetflow_core::domain::request::OwnerContact;
use budgetflow_core::errors::CoordinatorError;
use budgetflow_core::lifecycle::StoreError;

use crate::commands::context::{run_workflow, Completed};
use crate::commands::CommandResult;

#[derive(Debug, Clone, clap::Args)]
pub struct ContactArgs {
    #[arg(long = "user-id", help = "Request owner identifier")]
    pub user_id: String,
    #[arg(long, help = "Address that receives cash-ready notices")]
    pub email: String,
    #[arg(long = "full-name")]
    pub full_name: Option<String>,
}

pub fn run(args: &ContactArgs) -> CommandResult {
    if !args.email.contains('@') {
        return CommandResult::failure(
            "contact",
            "invalid_input",
            format!("`{}` is not an email address", args.email),
            2,
        );
    }
    let owner = UserId(args.user_id.clone());
    let contact =
        OwnerContact { email: args.email.trim().to_string(), full_name: args.full_name.clone() };

    run_workflow("contact", |coordinator| async move {
        coordinator
            .store()
            .upsert_owner_contact(&owner, &contact)
            .await
            .map_err(|error| CoordinatorError::from(StoreError::from(error)))?;
        let message = format!("contact saved for {}", owner.0);
        Ok::<_, CoordinatorError>(Completed::new(message, &contact))
    })
}
