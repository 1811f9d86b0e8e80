pub mod builder;
pub mod capability;
pub mod codec;
pub mod confirm;
pub mod domain;
pub mod error;
pub mod orchestrator;
pub mod plutus;
pub mod ports;
pub mod state_machine;
pub mod submit;
pub mod tx;

pub use builder::{BuilderConfig, TxBuilder};
pub use capability::{CapabilityAdapter, SigningStrategy};
pub use codec::{decode_action, decode_state, encode_action, encode_state, CodecError};
pub use confirm::{cancellation, CancelHandle, CancelToken, ConfirmationOutcome, TrackerConfig};
pub use error::{classify, ErrorKind, Phase, RegistryError};
pub use orchestrator::{CommandResult, RegistryClient, RegistryCommand};
pub use plutus::{PlutusData, PlutusError};
pub use ports::{ClockPort, LedgerPort, PortError, WalletPort};
pub use tx::{SignedTx, UnsignedTx};
