pub mod actor;
pub mod approval;
pub mod request;
pub mod role;
pub mod status;
