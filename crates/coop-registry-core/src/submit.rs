use tracing::{info, warn};

use crate::capability::CapabilityAdapter;
use crate::domain::TxId;
use crate::error::{classify, Phase, RegistryError};
use crate::ports::{LedgerPort, WalletPort};
use crate::tx::{SignedTx, UnsignedTx};

pub struct Submitter<'a, W, L> {
    capability: &'a CapabilityAdapter<W, L>,
}

impl<'a, W, L> Submitter<'a, W, L>
where
    W: WalletPort,
    L: LedgerPort,
{
    pub fn new(capability: &'a CapabilityAdapter<W, L>) -> Self {
        Self { capability }
    }

    /// Signs through the wallet and submits exactly once.
    pub async fn sign_and_submit(&self, tx: &UnsignedTx) -> Result<TxId, RegistryError> {
        let signed = self.capability.sign_and_finalize(tx).await?;
        self.submit(&signed).await
    }

    /// One network submission. A failure after the bytes left the client is
    /// never retried here.
    pub async fn submit(&self, signed: &SignedTx) -> Result<TxId, RegistryError> {
        let reported = self
            .capability
            .ledger()
            .submit_tx(&signed.cbor)
            .await
            .map_err(|e| classify(Phase::Submit, e))?;
        if reported != signed.id {
            warn!(expected = %signed.id, %reported, "ledger reported a different transaction id");
            return Err(RegistryError::SubmissionAmbiguous(format!(
                "ledger acknowledged {reported} but the signed body hashes to {}",
                signed.id
            )));
        }
        info!(tx_id = %reported, bytes = signed.cbor.len(), "transaction submitted");
        Ok(reported)
    }
}
