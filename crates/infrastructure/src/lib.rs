//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod access_token_source;
mod in_memory_policy_store;
mod in_memory_pubsub;
mod pubsub_rest_client;
mod resource_manager_policy_client;

pub use access_token_source::{
    AccessTokenSource, MetadataServerTokenSource, StaticAccessTokenSource,
};
pub use in_memory_policy_store::InMemoryPolicyStore;
pub use in_memory_pubsub::{InMemoryPubSub, PublishedRecord};
pub use pubsub_rest_client::{DEFAULT_PUBSUB_BASE_URL, PubSubRestClient};
pub use resource_manager_policy_client::{
    DEFAULT_RESOURCE_MANAGER_BASE_URL, ResourceManagerPolicyClient,
};
