pub mod executor;
pub mod offload;
pub mod orchestrator;
pub mod source;
