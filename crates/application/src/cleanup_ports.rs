mod policy;
mod queue;

pub use policy::ResourcePolicyClient;
pub use queue::{MessagePublisher, QueueMessage, QueueSubscriber};
