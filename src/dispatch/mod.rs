//! Worker dispatch and capability discovery

pub mod dispatcher;
pub mod worker;

pub use dispatcher::{
    DiscoveryError, DispatchOutcome, DispatchResult, Dispatcher, NO_VALID_AGENT_MESSAGE,
};
pub use worker::{CapabilityReport, WorkerReply, WorkerRequest};
