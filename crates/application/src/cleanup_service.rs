mod binding_removal;
mod disposition;
mod drain;
mod republish;
mod routing;

pub use binding_removal::PolicyBindingService;
pub use disposition::FailureDisposition;
pub use drain::{DrainReport, DrainService};
pub use republish::Republisher;
pub use routing::{MessageRouter, RouteOutcome};
