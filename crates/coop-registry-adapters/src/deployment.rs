use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use coop_registry_core::domain::{
    Address, Credential, Network, OutputRef, ParseError, PlutusVersion, ScriptHash, TxId,
    ValidatorRef,
};
use coop_registry_core::RegistryError;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("failed to read deployment record {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed deployment record: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("deployment record inconsistent: {0}")]
    Inconsistent(String),
}

impl From<DeploymentError> for RegistryError {
    fn from(e: DeploymentError) -> Self {
        RegistryError::Configuration(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceScript {
    pub tx_hash: TxId,
    pub output_index: u32,
}

/// Validator deployment as persisted by the deploy tooling. Read only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub network: Network,
    pub validator_hash: ScriptHash,
    pub address: String,
    pub plutus_version: PlutusVersion,
    #[serde(default)]
    pub reference_script: Option<ReferenceScript>,
    #[serde(default)]
    pub deployed_at: Option<String>,
}

impl DeploymentRecord {
    pub fn load(path: &Path) -> Result<Self, DeploymentError> {
        let raw = std::fs::read_to_string(path).map_err(|source| DeploymentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, DeploymentError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Checks the address against the hash and network before use.
    pub fn to_validator_ref(&self) -> Result<ValidatorRef, DeploymentError> {
        let address = Address::from_bech32(&self.address)?;
        if address.network_id() != self.network.network_id() {
            return Err(DeploymentError::Inconsistent(format!(
                "address network id {} does not match {}",
                address.network_id(),
                self.network
            )));
        }
        match address.payment_credential() {
            Credential::Script(hash) if hash == self.validator_hash => {}
            other => {
                return Err(DeploymentError::Inconsistent(format!(
                    "address credential {other:?} is not script {}",
                    self.validator_hash
                )))
            }
        }
        Ok(ValidatorRef {
            script_hash: self.validator_hash,
            address,
            plutus_version: self.plutus_version,
            reference_script: self
                .reference_script
                .as_ref()
                .map(|r| OutputRef::new(r.tx_hash, r.output_index)),
        })
    }
}
