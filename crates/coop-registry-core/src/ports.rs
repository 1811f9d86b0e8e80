use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    Address, AssetUnit, BalanceEntry, ProtocolParams, TxId, TxStatus, UnspentOutput,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PortError {
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("declined: {0}")]
    Declined(String),
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("ambiguous response: {0}")]
    Ambiguous(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("policy error: {0}")]
    Policy(String),
}

/// Raw surface of an installed wallet (CIP-30 style).
///
/// Every method may be missing on a given provider; absence is reported as
/// [`PortError::Unsupported`] and is a normal condition.
#[async_trait]
pub trait WalletPort: Send + Sync {
    /// Provider-specific shortcut for the lovelace balance.
    async fn lovelace_balance(&self) -> Result<u64, PortError> {
        Err(PortError::Unsupported("wallet.lovelace_balance"))
    }

    /// Full balance listing (lovelace plus native assets).
    async fn balance_listing(&self) -> Result<Vec<BalanceEntry>, PortError>;

    async fn assets(&self) -> Result<Vec<(AssetUnit, u64)>, PortError> {
        Err(PortError::Unsupported("wallet.assets"))
    }

    async fn utxos(&self) -> Result<Vec<UnspentOutput>, PortError> {
        Err(PortError::Unsupported("wallet.utxos"))
    }

    async fn used_addresses(&self) -> Result<Vec<Address>, PortError> {
        Err(PortError::Unsupported("wallet.used_addresses"))
    }

    async fn change_address(&self) -> Result<Address, PortError>;

    /// Returns the CBOR witness set produced for `tx_cbor`.
    async fn sign_tx(&self, tx_cbor: &[u8], partial: bool) -> Result<Vec<u8>, PortError>;
}

/// Ledger query and submission provider.
#[async_trait]
pub trait LedgerPort: Send + Sync {
    async fn utxos_at(&self, address: &Address) -> Result<Vec<UnspentOutput>, PortError>;
    async fn protocol_params(&self) -> Result<ProtocolParams, PortError>;
    /// Submits signed transaction bytes and returns the id the ledger reports.
    async fn submit_tx(&self, signed_cbor: &[u8]) -> Result<TxId, PortError>;
    async fn tx_status(&self, id: &TxId) -> Result<TxStatus, PortError>;
}

pub trait ClockPort: Send + Sync {
    fn now_ms(&self) -> Result<u64, PortError>;
}

#[async_trait]
impl<T: WalletPort + ?Sized> WalletPort for std::sync::Arc<T> {
    async fn lovelace_balance(&self) -> Result<u64, PortError> {
        (**self).lovelace_balance().await
    }

    async fn balance_listing(&self) -> Result<Vec<BalanceEntry>, PortError> {
        (**self).balance_listing().await
    }

    async fn assets(&self) -> Result<Vec<(AssetUnit, u64)>, PortError> {
        (**self).assets().await
    }

    async fn utxos(&self) -> Result<Vec<UnspentOutput>, PortError> {
        (**self).utxos().await
    }

    async fn used_addresses(&self) -> Result<Vec<Address>, PortError> {
        (**self).used_addresses().await
    }

    async fn change_address(&self) -> Result<Address, PortError> {
        (**self).change_address().await
    }

    async fn sign_tx(&self, tx_cbor: &[u8], partial: bool) -> Result<Vec<u8>, PortError> {
        (**self).sign_tx(tx_cbor, partial).await
    }
}

#[async_trait]
impl<T: LedgerPort + ?Sized> LedgerPort for std::sync::Arc<T> {
    async fn utxos_at(&self, address: &Address) -> Result<Vec<UnspentOutput>, PortError> {
        (**self).utxos_at(address).await
    }

    async fn protocol_params(&self) -> Result<ProtocolParams, PortError> {
        (**self).protocol_params().await
    }

    async fn submit_tx(&self, signed_cbor: &[u8]) -> Result<TxId, PortError> {
        (**self).submit_tx(signed_cbor).await
    }

    async fn tx_status(&self, id: &TxId) -> Result<TxStatus, PortError> {
        (**self).tx_status(id).await
    }
}

impl<T: ClockPort + ?Sized> ClockPort for std::sync::Arc<T> {
    fn now_ms(&self) -> Result<u64, PortError> {
        (**self).now_ms()
    }
}
