use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::capability::CapabilityAdapter;
use crate::codec::ToPlutusData;
use crate::domain::{
    Address, AssetUnit, ExUnits, KeyHash, OutputRef, ProtocolParams, Ratio, RegistryAction,
    RegistryState, TimestampMs, UnspentOutput, ValidatorRef, Value,
};
use crate::error::{classify, Phase, RegistryError};
use crate::ports::{ClockPort, LedgerPort, WalletPort};
use crate::tx::{
    min_fee, script_data_hash, Redeemer, RedeemerTag, TxBody, TxOutput, UnsignedTx,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Execution budget declared for the registry validator.
    pub script_ex_units: ExUnits,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            script_ex_units: ExUnits {
                mem: 2_000_000,
                steps: 800_000_000,
            },
        }
    }
}

/// Everything about a registry transaction except the wallet side.
struct Draft {
    script_input: Option<UnspentOutput>,
    /// Registry token minted by this transaction.
    mint: Option<AssetUnit>,
    /// Reference input holding the validator script.
    script_source: OutputRef,
    registry_output: TxOutput,
    redeemer_tag: RedeemerTag,
    required_signers: Vec<KeyHash>,
    action: RegistryAction,
    state: RegistryState,
}

pub struct TxBuilder<'a, W, L, C> {
    capability: &'a CapabilityAdapter<W, L>,
    clock: &'a C,
    validator: &'a ValidatorRef,
    config: BuilderConfig,
}

impl<'a, W, L, C> TxBuilder<'a, W, L, C>
where
    W: WalletPort,
    L: LedgerPort,
    C: ClockPort,
{
    pub fn new(
        capability: &'a CapabilityAdapter<W, L>,
        clock: &'a C,
        validator: &'a ValidatorRef,
    ) -> Self {
        Self {
            capability,
            clock,
            validator,
            config: BuilderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn build_create_entity_tx(
        &self,
        founder: &Address,
        name: &str,
        description: &str,
    ) -> Result<UnsignedTx, RegistryError> {
        let founder_key = signer_key(founder)?;
        let script_source = self.script_source()?;
        let params = self.capability.protocol_params().await?;
        let utxos = self.capability.get_spendable_outputs(founder).await?;
        let now = self.clock.now_ms().map_err(|e| classify(Phase::Read, e))?;

        let state = RegistryState::genesis(name, description, TimestampMs(now), founder_key);
        let token = self.validator.registry_token();
        let mut carried = Value::default();
        carried.assets.insert(token.clone(), 1);
        let registry_output = self.registry_output(&state, carried, &params)?;
        let minimum = registry_output.value.lovelace;
        let largest = utxos.iter().map(|u| u.value.lovelace).max().unwrap_or(0);
        if largest <= minimum {
            let reason = if utxos.is_empty() {
                "no spendable outputs at the founder address"
            } else {
                "no single output exceeds the registry output minimum"
            };
            return Err(RegistryError::InsufficientFunds {
                reason: reason.to_owned(),
                required: minimum,
                available: largest,
            });
        }

        let draft = Draft {
            script_input: None,
            mint: Some(token),
            script_source,
            registry_output,
            redeemer_tag: RedeemerTag::Mint,
            required_signers: vec![founder_key],
            action: RegistryAction::CreateEntity {
                name: name.to_owned(),
                description: description.to_owned(),
            },
            state,
        };
        self.balance(draft, utxos, founder, &params)
    }

    /// Spends the registry output at `registry` with `action` and recreates it
    /// with the projected datum. Fees come from `signer`'s wallet.
    pub async fn build_action_tx(
        &self,
        signer: &Address,
        registry: OutputRef,
        action: RegistryAction,
    ) -> Result<UnsignedTx, RegistryError> {
        if matches!(action, RegistryAction::CreateEntity { .. }) {
            return Err(RegistryError::InvalidAction(
                "CreateEntity cannot spend an existing registry".to_owned(),
            ));
        }
        let signer_key = signer_key(signer)?;
        let script_source = self.script_source()?;
        let params = self.capability.protocol_params().await?;

        let script_input = self
            .capability
            .ledger_outputs_at(&self.validator.address)
            .await?
            .into_iter()
            .find(|u| u.reference == registry)
            .ok_or_else(|| {
                RegistryError::InvalidAction(format!(
                    "registry output {registry} is not unspent at {}",
                    self.validator.address
                ))
            })?;
        let current = script_input.registry_state()?.ok_or_else(|| {
            RegistryError::Encoding(format!("registry output {registry} carries no inline datum"))
        })?;
        let next = current.apply(&action)?;
        debug!(
            action = action.label(),
            members = next.members.len(),
            admins = next.admins.len(),
            "projected registry state"
        );

        let registry_output = self.registry_output(&next, script_input.value.clone(), &params)?;
        let utxos = self.capability.get_spendable_outputs(signer).await?;
        let draft = Draft {
            script_input: Some(script_input),
            mint: None,
            script_source,
            registry_output,
            redeemer_tag: RedeemerTag::Spend,
            required_signers: vec![signer_key],
            action,
            state: next,
        };
        self.balance(draft, utxos, signer, &params)
    }

    /// Every registry transaction runs the validator, which is only ever
    /// supplied through its reference script.
    fn script_source(&self) -> Result<OutputRef, RegistryError> {
        self.validator.reference_script.ok_or_else(|| {
            RegistryError::Configuration(format!(
                "validator {} has no reference script output",
                self.validator.script_hash
            ))
        })
    }

    /// Registry output carrying `state` inline, holding at least `carried`
    /// and never less than the ledger minimum.
    fn registry_output(
        &self,
        state: &RegistryState,
        carried: Value,
        params: &ProtocolParams,
    ) -> Result<TxOutput, RegistryError> {
        let mut output = TxOutput {
            address: self.validator.address.clone(),
            value: carried,
            datum: Some(state.to_plutus_data()),
        };
        let minimum = output.min_lovelace(params.coins_per_utxo_byte)?;
        output.value.lovelace = output.value.lovelace.max(minimum);
        Ok(output)
    }

    /// Largest-first selection over `wallet_utxos`, adding inputs until the
    /// outputs, the fee and a valid change output are covered.
    fn balance(
        &self,
        draft: Draft,
        mut wallet_utxos: Vec<UnspentOutput>,
        change_address: &Address,
        params: &ProtocolParams,
    ) -> Result<UnsignedTx, RegistryError> {
        wallet_utxos.sort_by(|a, b| {
            b.value
                .lovelace
                .cmp(&a.value.lovelace)
                .then_with(|| a.reference.cmp(&b.reference))
        });
        let collateral = wallet_utxos.iter().find(|u| u.value.is_pure_ada());
        let wallet_total: u64 = wallet_utxos
            .iter()
            .fold(0u64, |acc, u| acc.saturating_add(u.value.lovelace));

        let spent = draft.registry_output.value.clone();
        let mut in_total = draft
            .script_input
            .as_ref()
            .map(|u| u.value.clone())
            .unwrap_or_default();
        if let Some(token) = &draft.mint {
            in_total.assets.insert(token.clone(), 1);
        }
        let mut required = spent.lovelace;
        let mut selected: Vec<&UnspentOutput> = Vec::new();

        for candidate in &wallet_utxos {
            in_total = in_total
                .checked_add(&candidate.value)
                .ok_or_else(|| RegistryError::Encoding("input value overflows u64".to_owned()))?;
            selected.push(candidate);
            let Some(available) = in_total.checked_sub(&spent) else {
                continue;
            };

            // Worst-case change and fee fields give an upper bound on size.
            let worst_change = TxOutput {
                address: change_address.clone(),
                value: Value {
                    lovelace: u64::MAX,
                    assets: available.assets.clone(),
                },
                datum: None,
            };
            let estimate =
                self.draft_tx(&draft, &selected, Some(worst_change), u64::MAX, collateral, params)?;
            let size = estimate.estimated_signed_size()?;
            let fee = min_fee(params, size, self.config.script_ex_units)
                .ok_or_else(|| RegistryError::Encoding("fee computation overflowed".to_owned()))?;
            required = spent.lovelace.saturating_add(fee);

            let Some(change) = available.checked_sub(&Value::lovelace(fee)) else {
                continue;
            };
            let (change_output, fee) = if change.is_zero() {
                (None, fee)
            } else {
                let output = TxOutput {
                    address: change_address.clone(),
                    value: change,
                    datum: None,
                };
                let change_min = output.min_lovelace(params.coins_per_utxo_byte)?;
                if output.value.lovelace >= change_min {
                    (Some(output), fee)
                } else if output.value.is_pure_ada() {
                    debug!(dust = output.value.lovelace, "folding change below minimum into fee");
                    (None, fee + output.value.lovelace)
                } else {
                    continue;
                }
            };

            let collateral_required = Ratio {
                numerator: params.collateral_percent,
                denominator: 100,
            }
            .mul_ceil(fee)
            .ok_or_else(|| RegistryError::Encoding("collateral computation overflowed".to_owned()))?;
            let collateral = match collateral {
                Some(c) if c.value.lovelace >= collateral_required => c,
                other => {
                    return Err(RegistryError::InsufficientFunds {
                        reason: "no pure-ADA output covers the collateral".to_owned(),
                        required: collateral_required,
                        available: other.map(|c| c.value.lovelace).unwrap_or(0),
                    })
                }
            };

            let tx = self.draft_tx(&draft, &selected, change_output, fee, Some(collateral), params)?;
            let size = tx.estimated_signed_size()?;
            if size > params.max_tx_size as usize {
                return Err(RegistryError::Encoding(format!(
                    "transaction of {size} bytes exceeds the {} byte limit",
                    params.max_tx_size
                )));
            }
            info!(
                action = tx.action.label(),
                inputs = tx.body.inputs.len(),
                outputs = tx.body.outputs.len(),
                fee = tx.body.fee,
                "balanced registry transaction"
            );
            return Ok(tx);
        }

        Err(RegistryError::InsufficientFunds {
            reason: "wallet outputs do not cover the registry output and fee".to_owned(),
            required,
            available: wallet_total,
        })
    }

    fn draft_tx(
        &self,
        draft: &Draft,
        selected: &[&UnspentOutput],
        change: Option<TxOutput>,
        fee: u64,
        collateral: Option<&UnspentOutput>,
        params: &ProtocolParams,
    ) -> Result<UnsignedTx, RegistryError> {
        let script_ref = draft.script_input.as_ref().map(|u| u.reference);
        let mut inputs: Vec<OutputRef> = selected
            .iter()
            .map(|u| u.reference)
            .chain(script_ref)
            .collect();
        inputs.sort();
        inputs.dedup();

        let index = match script_ref {
            Some(reference) => inputs.iter().position(|i| *i == reference).unwrap_or(0) as u32,
            None => 0,
        };
        let redeemer = Redeemer {
            tag: draft.redeemer_tag,
            index,
            data: draft.action.to_plutus_data(),
            ex_units: self.config.script_ex_units,
        };
        let script_data_hash = params
            .cost_model(self.validator.plutus_version)
            .map(|model| {
                script_data_hash(std::slice::from_ref(&redeemer), model.version, &model.costs)
            })
            .transpose()?;

        let signers: BTreeSet<KeyHash> = selected
            .iter()
            .copied()
            .chain(collateral)
            .filter_map(|u| u.address.payment_key_hash())
            .chain(draft.required_signers.iter().copied())
            .collect();

        let mut outputs = vec![draft.registry_output.clone()];
        outputs.extend(change);
        let body = TxBody {
            inputs,
            outputs,
            fee,
            mint: draft
                .mint
                .iter()
                .map(|token| (token.clone(), 1))
                .collect::<BTreeMap<_, _>>(),
            script_data_hash,
            collateral: collateral.map(|c| vec![c.reference]).unwrap_or_default(),
            required_signers: draft.required_signers.clone(),
            reference_inputs: vec![draft.script_source],
        };
        Ok(UnsignedTx {
            body,
            redeemers: vec![redeemer],
            action: draft.action.clone(),
            state: draft.state.clone(),
            registry_output: 0,
            validator: self.validator.clone(),
            signer_count: signers.len(),
        })
    }
}

fn signer_key(address: &Address) -> Result<KeyHash, RegistryError> {
    address.payment_key_hash().ok_or_else(|| {
        RegistryError::Configuration(format!("{address} has no verification-key payment credential"))
    })
}
