//! Channel backends the engine drives.
//!
//! Provides the `TransportBackend` trait plus live serial, simulated
//! testbench and in-memory mock implementations.

pub mod artifact;
pub mod error;
pub mod live;
pub mod mock;
pub mod simulated;
pub mod traits;

pub use artifact::ArtifactError;
pub use error::BackendError;
pub use live::LiveBackend;
pub use mock::MockBackend;
pub use simulated::{SimulatedBackend, SimulatorSettings};
pub use traits::TransportBackend;
