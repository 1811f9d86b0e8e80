pub mod cip30;
pub mod clock;
pub mod config;
pub mod deployment;
pub mod ledger;

pub use cip30::Cip30Adapter;
pub use clock::SystemClockAdapter;
pub use config::{ConfigError, RegistryConfig};
pub use deployment::{DeploymentError, DeploymentRecord, ReferenceScript};
pub use ledger::LedgerAdapter;
