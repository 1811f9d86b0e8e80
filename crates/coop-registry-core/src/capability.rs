//! Normalizes a wallet's uneven feature surface into one interface.
//!
//! Every fallback decision lives here. Only [`PortError::Unsupported`] moves a
//! read to the next strategy; any other failure is classified and returned.

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{Address, AssetUnit, ProtocolParams, Unit, UnspentOutput};
use crate::error::{classify, Phase, RegistryError};
use crate::ports::{LedgerPort, PortError, WalletPort};
use crate::tx::{SignedTx, UnsignedTx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningStrategy {
    /// `signTx(tx, partialSign = true)`; the wallet signs only what it owns.
    Partial,
    /// `signTx(tx, partialSign = false)`.
    Full,
}

impl SigningStrategy {
    const ORDER: [SigningStrategy; 2] = [SigningStrategy::Partial, SigningStrategy::Full];

    fn partial(self) -> bool {
        matches!(self, SigningStrategy::Partial)
    }
}

pub struct CapabilityAdapter<W, L> {
    wallet: W,
    ledger: L,
    signing: Mutex<()>,
}

impl<W, L> CapabilityAdapter<W, L>
where
    W: WalletPort,
    L: LedgerPort,
{
    pub fn new(wallet: W, ledger: L) -> Self {
        Self {
            wallet,
            ledger,
            signing: Mutex::new(()),
        }
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Lovelace held by the wallet. The shortcut and the listing report the
    /// whole wallet; the last fallback sums outputs at `address` only.
    pub async fn get_balance(&self, address: &Address) -> Result<u64, RegistryError> {
        if let Some(lovelace) = attempt(
            "wallet.lovelace_balance",
            self.wallet.lovelace_balance().await,
        )? {
            return Ok(lovelace);
        }

        if let Some(listing) = attempt("wallet.balance_listing", self.wallet.balance_listing().await)? {
            if let Some(entry) = listing.iter().find(|e| e.unit == Unit::Lovelace) {
                debug!("balance derived from full listing");
                return Ok(entry.quantity);
            }
            debug!("balance listing carries no lovelace entry");
        }

        let outputs = self.get_spendable_outputs(address).await?;
        debug!(outputs = outputs.len(), "balance derived from spendable outputs");
        outputs
            .iter()
            .try_fold(0u64, |acc, u| acc.checked_add(u.value.lovelace))
            .ok_or_else(|| RegistryError::Encoding("balance overflows u64".to_owned()))
    }

    pub async fn get_assets(&self) -> Result<Vec<(AssetUnit, u64)>, RegistryError> {
        if let Some(assets) = attempt("wallet.assets", self.wallet.assets().await)? {
            return Ok(assets);
        }
        let listing = attempt("wallet.balance_listing", self.wallet.balance_listing().await)?
            .ok_or_else(|| unavailable("asset listing"))?;
        Ok(listing
            .into_iter()
            .filter_map(|e| match e.unit {
                Unit::Asset(asset) => Some((asset, e.quantity)),
                Unit::Lovelace => None,
            })
            .collect())
    }

    pub async fn get_address(&self) -> Result<Address, RegistryError> {
        if let Some(address) = attempt("wallet.change_address", self.wallet.change_address().await)? {
            return Ok(address);
        }
        attempt("wallet.used_addresses", self.wallet.used_addresses().await)?
            .and_then(|used| used.into_iter().next())
            .ok_or_else(|| unavailable("wallet address"))
    }

    pub async fn get_spendable_outputs(
        &self,
        address: &Address,
    ) -> Result<Vec<UnspentOutput>, RegistryError> {
        if let Some(utxos) = attempt("wallet.utxos", self.wallet.utxos().await)? {
            return Ok(utxos.into_iter().filter(|u| &u.address == address).collect());
        }
        debug!(%address, "wallet cannot list outputs, querying ledger");
        attempt("ledger.utxos_at", self.ledger.utxos_at(address).await)?
            .ok_or_else(|| unavailable("spendable outputs"))
    }

    /// Unspent outputs at a script address, always read from the ledger.
    pub async fn ledger_outputs_at(
        &self,
        address: &Address,
    ) -> Result<Vec<UnspentOutput>, RegistryError> {
        self.ledger
            .utxos_at(address)
            .await
            .map_err(|e| classify(Phase::Read, e))
    }

    pub async fn protocol_params(&self) -> Result<ProtocolParams, RegistryError> {
        self.ledger
            .protocol_params()
            .await
            .map_err(|e| classify(Phase::Read, e))
    }

    /// Asks the wallet for witnesses and assembles the signed transaction.
    ///
    /// Requests are single-flight: concurrent callers queue on a fair mutex.
    pub async fn sign_and_finalize(&self, tx: &UnsignedTx) -> Result<SignedTx, RegistryError> {
        let _guard = self.signing.lock().await;
        let tx_cbor = tx.to_cbor()?;
        for strategy in SigningStrategy::ORDER {
            match self.wallet.sign_tx(&tx_cbor, strategy.partial()).await {
                Ok(witness_set) => {
                    let signed = tx.assemble(&witness_set)?;
                    info!(tx_id = %signed.id, ?strategy, "transaction signed");
                    return Ok(signed);
                }
                Err(PortError::Unsupported(op)) => {
                    warn!(?strategy, op, "signing strategy unsupported, trying next");
                }
                Err(PortError::Rejected(reason)) => {
                    warn!(?strategy, %reason, "signing strategy failed inside provider, trying next");
                }
                Err(e) => return Err(classify(Phase::Sign, e)),
            }
        }
        Err(unavailable("transaction signing"))
    }
}

/// `Ok(None)` means "unsupported, try the next strategy".
fn attempt<T>(op: &'static str, result: Result<T, PortError>) -> Result<Option<T>, RegistryError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(PortError::Unsupported(_)) => {
            debug!(op, "capability unsupported");
            Ok(None)
        }
        Err(e) => Err(classify(Phase::Read, e)),
    }
}

fn unavailable(what: &str) -> RegistryError {
    RegistryError::CapabilityUnavailable(format!("no provider strategy yields {what}"))
}
