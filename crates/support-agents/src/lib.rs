//! Agent side of the support ticket triage system: live and canned
//! completion ports, configuration, run telemetry and the engine wiring
//! used by the `support-agents` binary.

pub mod agents;
pub mod config;
pub mod runner;
pub mod telemetry;
