//! Command implementations for the opsctl CLI

pub mod dynect;
pub mod push_button;
pub mod route53;
pub mod service;

pub use dynect::run_dyn;
pub use push_button::run_push_button;
pub use route53::run_route53;
pub use service::run_service;
