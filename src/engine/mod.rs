//! Burst transfer engine: writes patterned bursts, waits for their echo and
//! turns what comes back into a verdict.

pub mod compare;
pub mod settings;
pub mod transfer;

pub use compare::first_mismatch;
pub use settings::{TransferSettings, DEFAULT_ERROR_MARKER, DEFAULT_RETRIES, DEFAULT_SETTLE_DELAY};
pub use transfer::{BurstPhase, BurstTransferEngine};
