//! Application services and ports.

#![forbid(unsafe_code)]

mod cleanup_ports;
mod cleanup_service;

pub use cleanup_ports::{MessagePublisher, QueueMessage, QueueSubscriber, ResourcePolicyClient};
pub use cleanup_service::{
    DrainReport, DrainService, FailureDisposition, MessageRouter, PolicyBindingService,
    Republisher, RouteOutcome,
};
