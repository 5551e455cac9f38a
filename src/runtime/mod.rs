pub mod events;
pub mod facade;
pub mod session;

pub use facade::{BootstrappedRuntime, RuntimeOverrides, bootstrap_runtime};
pub use session::build_think_pipeline;
