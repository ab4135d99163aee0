//! Backend coordination: readiness probing, root location, bootstrap
//! launch, and the startup orchestrator that ties them together.

pub mod config;
pub mod error;
pub mod health;
pub mod launch;
pub mod locate;
pub mod manager;

pub use config::Endpoints;
pub use error::StartupError;
pub use manager::BackendManager;
