//! Transaction model and its ledger CBOR encoding.

use std::collections::BTreeMap;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use minicbor::data::{Tag, Type};
use minicbor::encode::{Error as EncodeError, Write};
use minicbor::{Decoder, Encoder};

use crate::domain::{
    Address, AssetUnit, ExUnits, KeyHash, OutputRef, PlutusVersion, PolicyId, ProtocolParams,
    RegistryAction, RegistryState, TxId, UnspentOutput, ValidatorRef, Value,
};
use crate::plutus::{at_break, decode_bytes, PlutusData, PlutusError};

/// Fixed per-output overhead the ledger adds before applying `coinsPerUTxOByte`.
pub const OUTPUT_OVERHEAD_BYTES: u64 = 160;
/// `[vkey (32), signature (64)]` with CBOR framing.
pub const VKEY_WITNESS_BYTES: usize = 101;
const WITNESS_SET_OVERHEAD_BYTES: usize = 4;
const TAG_ENCODED_CBOR: u64 = 24;
const TAG_SET: u64 = 258;

pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub address: Address,
    pub value: Value,
    pub datum: Option<PlutusData>,
}

impl TxOutput {
    pub fn to_cbor(&self) -> Result<Vec<u8>, PlutusError> {
        let mut e = Encoder::new(Vec::new());
        encode_output(self, &mut e)?;
        Ok(e.into_writer())
    }

    /// Minimum lovelace the ledger accepts for this output, computed as
    /// `(160 + serialized size) * coinsPerUTxOByte`. The output's own lovelace
    /// field is part of the size, so the amount is raised until it is stable.
    pub fn min_lovelace(&self, coins_per_utxo_byte: u64) -> Result<u64, PlutusError> {
        let mut candidate = self.clone();
        loop {
            let size = candidate.to_cbor()?.len() as u64;
            let required = (OUTPUT_OVERHEAD_BYTES + size)
                .checked_mul(coins_per_utxo_byte)
                .ok_or(PlutusError::IntegerOverflow)?;
            if candidate.value.lovelace >= required {
                return Ok(required);
            }
            candidate.value.lovelace = required;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemerTag {
    Spend,
    Mint,
}

impl RedeemerTag {
    fn code(self) -> u8 {
        match self {
            RedeemerTag::Spend => 0,
            RedeemerTag::Mint => 1,
        }
    }

    fn from_code(code: u8) -> Result<Self, PlutusError> {
        match code {
            0 => Ok(RedeemerTag::Spend),
            1 => Ok(RedeemerTag::Mint),
            other => Err(PlutusError::Unsupported(format!("redeemer tag {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redeemer {
    pub tag: RedeemerTag,
    pub index: u32,
    pub data: PlutusData,
    pub ex_units: ExUnits,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxBody {
    /// Kept sorted; spend redeemer indexes point into this order.
    pub inputs: Vec<OutputRef>,
    pub outputs: Vec<TxOutput>,
    pub fee: u64,
    /// Quantities minted (positive) or burned (negative).
    pub mint: BTreeMap<AssetUnit, i64>,
    pub script_data_hash: Option<[u8; 32]>,
    pub collateral: Vec<OutputRef>,
    pub required_signers: Vec<KeyHash>,
    pub reference_inputs: Vec<OutputRef>,
}

impl TxBody {
    pub fn to_cbor(&self) -> Result<Vec<u8>, PlutusError> {
        let mut e = Encoder::new(Vec::new());
        encode_body(self, &mut e)?;
        Ok(e.into_writer())
    }

    pub fn id(&self) -> Result<TxId, PlutusError> {
        Ok(TxId(blake2b_256(&self.to_cbor()?)))
    }
}

/// Balanced, unsigned registry transaction ready for the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTx {
    pub body: TxBody,
    pub redeemers: Vec<Redeemer>,
    pub action: RegistryAction,
    /// Datum written to the registry output.
    pub state: RegistryState,
    /// Position of the registry output in `body.outputs`.
    pub registry_output: usize,
    pub validator: ValidatorRef,
    /// Distinct verification keys expected to sign.
    pub signer_count: usize,
}

impl UnsignedTx {
    pub fn id(&self) -> Result<TxId, PlutusError> {
        self.body.id()
    }

    pub fn registry_ref(&self) -> Result<OutputRef, PlutusError> {
        Ok(OutputRef::new(self.id()?, self.registry_output as u32))
    }

    pub fn registry_output(&self) -> Option<&TxOutput> {
        self.body.outputs.get(self.registry_output)
    }

    /// Full transaction with an empty vkey witness set, as handed to wallets.
    pub fn to_cbor(&self) -> Result<Vec<u8>, PlutusError> {
        let body = self.body.to_cbor()?;
        let mut witnesses = BTreeMap::new();
        witnesses.insert(5, redeemers_cbor(&self.redeemers)?);
        encode_transaction(&body, &witnesses)
    }

    pub fn estimated_signed_size(&self) -> Result<usize, PlutusError> {
        Ok(self.to_cbor()?.len()
            + self.signer_count * VKEY_WITNESS_BYTES
            + WITNESS_SET_OVERHEAD_BYTES)
    }

    /// Merges the wallet's witness set into this transaction's witnesses.
    pub fn assemble(&self, wallet_witness_set: &[u8]) -> Result<SignedTx, PlutusError> {
        let mut witnesses = split_map_entries(wallet_witness_set)?;
        if !witnesses.contains_key(&0) {
            return Err(PlutusError::Decode(
                "wallet witness set carries no vkey witnesses".to_owned(),
            ));
        }
        witnesses.insert(5, redeemers_cbor(&self.redeemers)?);
        let body = self.body.to_cbor()?;
        let id = TxId(blake2b_256(&body));
        Ok(SignedTx {
            id,
            cbor: encode_transaction(&body, &witnesses)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub id: TxId,
    pub cbor: Vec<u8>,
}

/// What a serialized transaction consumes, creates and asks scripts to run for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxEffects {
    pub id: TxId,
    pub inputs: Vec<OutputRef>,
    pub outputs: Vec<TxOutput>,
    pub mint: BTreeMap<AssetUnit, i64>,
    pub reference_inputs: Vec<OutputRef>,
    /// `(purpose, index)` of every redeemer in the witness set.
    pub redeemers: Vec<(RedeemerTag, u32)>,
    /// Scripts carried in the witness set itself.
    pub witness_scripts: bool,
}

impl TxEffects {
    /// Distinct minting policies in ledger order; mint redeemer indexes point
    /// into this list.
    pub fn mint_policies(&self) -> Vec<PolicyId> {
        let mut policies: Vec<PolicyId> = self.mint.keys().map(|unit| unit.policy).collect();
        policies.dedup();
        policies
    }

    pub fn created_outputs(&self) -> Vec<UnspentOutput> {
        self.outputs
            .iter()
            .enumerate()
            .map(|(i, o)| UnspentOutput {
                reference: OutputRef::new(self.id, i as u32),
                address: o.address.clone(),
                value: o.value.clone(),
                inline_datum: o.datum.clone(),
            })
            .collect()
    }
}

/// `fee = a * size + b + ceil(mem * priceMem) + ceil(steps * priceSteps)`.
pub fn min_fee(params: &ProtocolParams, size: usize, ex_units: ExUnits) -> Option<u64> {
    let size_fee = params.min_fee_a.checked_mul(size as u64)?;
    let mem_fee = params.price_mem.mul_ceil(ex_units.mem)?;
    let step_fee = params.price_steps.mul_ceil(ex_units.steps)?;
    size_fee
        .checked_add(params.min_fee_b)?
        .checked_add(mem_fee)?
        .checked_add(step_fee)
}

/// Script integrity hash over redeemers and the language view of the cost
/// model. Inline datums are not part of the witness set.
pub fn script_data_hash(
    redeemers: &[Redeemer],
    version: PlutusVersion,
    costs: &[i64],
) -> Result<[u8; 32], PlutusError> {
    let mut preimage = redeemers_cbor(redeemers)?;
    let mut e = Encoder::new(Vec::new());
    let language = match version {
        PlutusVersion::V2 => 1u8,
        PlutusVersion::V3 => 2u8,
    };
    e.map(1)?.u8(language)?.array(costs.len() as u64)?;
    for cost in costs {
        e.i64(*cost)?;
    }
    preimage.extend_from_slice(&e.into_writer());
    Ok(blake2b_256(&preimage))
}

fn redeemers_cbor(redeemers: &[Redeemer]) -> Result<Vec<u8>, PlutusError> {
    let mut e = Encoder::new(Vec::new());
    e.array(redeemers.len() as u64)?;
    for r in redeemers {
        e.array(4)?.u8(r.tag.code())?.u32(r.index)?;
        r.data.encode_to(&mut e)?;
        e.array(2)?.u64(r.ex_units.mem)?.u64(r.ex_units.steps)?;
    }
    Ok(e.into_writer())
}

fn encode_transaction(
    body: &[u8],
    witnesses: &BTreeMap<u64, Vec<u8>>,
) -> Result<Vec<u8>, PlutusError> {
    let mut e = Encoder::new(Vec::new());
    e.array(4)?;
    e.writer_mut().extend_from_slice(body);
    e.map(witnesses.len() as u64)?;
    for (key, raw) in witnesses {
        e.u64(*key)?;
        e.writer_mut().extend_from_slice(raw);
    }
    e.bool(true)?.null()?;
    Ok(e.into_writer())
}

fn encode_input<W: Write>(input: &OutputRef, e: &mut Encoder<W>) -> Result<(), EncodeError<W::Error>> {
    e.array(2)?.bytes(input.tx_id.as_bytes())?.u32(input.index)?;
    Ok(())
}

fn encode_inputs<W: Write>(
    inputs: &[OutputRef],
    e: &mut Encoder<W>,
) -> Result<(), EncodeError<W::Error>> {
    e.array(inputs.len() as u64)?;
    for input in inputs {
        encode_input(input, e)?;
    }
    Ok(())
}

pub(crate) fn encode_value<W: Write>(
    value: &Value,
    e: &mut Encoder<W>,
) -> Result<(), EncodeError<W::Error>> {
    let assets: Vec<_> = value.assets.iter().filter(|(_, q)| **q > 0).collect();
    if assets.is_empty() {
        e.u64(value.lovelace)?;
        return Ok(());
    }
    let mut by_policy: BTreeMap<&PolicyId, Vec<(&[u8], u64)>> = BTreeMap::new();
    for (unit, qty) in assets {
        by_policy
            .entry(&unit.policy)
            .or_default()
            .push((unit.name.as_slice(), *qty));
    }
    e.array(2)?.u64(value.lovelace)?.map(by_policy.len() as u64)?;
    for (policy, names) in by_policy {
        e.bytes(policy.as_bytes())?.map(names.len() as u64)?;
        for (name, qty) in names {
            e.bytes(name)?.u64(qty)?;
        }
    }
    Ok(())
}

fn encode_output<W: Write>(output: &TxOutput, e: &mut Encoder<W>) -> Result<(), EncodeError<W::Error>> {
    let entries = if output.datum.is_some() { 3 } else { 2 };
    e.map(entries)?;
    e.u8(0)?.bytes(output.address.as_bytes())?;
    e.u8(1)?;
    encode_value(&output.value, e)?;
    if let Some(datum) = &output.datum {
        let inner = datum
            .to_cbor()
            .map_err(|_| EncodeError::message("inline datum encoding failed"))?;
        e.u8(2)?
            .array(2)?
            .u8(1)?
            .tag(Tag::new(TAG_ENCODED_CBOR))?
            .bytes(&inner)?;
    }
    Ok(())
}

fn encode_mint<W: Write>(
    mint: &BTreeMap<AssetUnit, i64>,
    e: &mut Encoder<W>,
) -> Result<(), EncodeError<W::Error>> {
    let mut by_policy: BTreeMap<&PolicyId, Vec<(&[u8], i64)>> = BTreeMap::new();
    for (unit, qty) in mint {
        by_policy
            .entry(&unit.policy)
            .or_default()
            .push((unit.name.as_slice(), *qty));
    }
    e.map(by_policy.len() as u64)?;
    for (policy, names) in by_policy {
        e.bytes(policy.as_bytes())?.map(names.len() as u64)?;
        for (name, qty) in names {
            e.bytes(name)?.i64(qty)?;
        }
    }
    Ok(())
}

fn encode_body<W: Write>(body: &TxBody, e: &mut Encoder<W>) -> Result<(), EncodeError<W::Error>> {
    let mut entries = 3;
    entries += u64::from(!body.mint.is_empty());
    entries += u64::from(body.script_data_hash.is_some());
    entries += u64::from(!body.collateral.is_empty());
    entries += u64::from(!body.required_signers.is_empty());
    entries += u64::from(!body.reference_inputs.is_empty());
    e.map(entries)?;

    e.u8(0)?;
    encode_inputs(&body.inputs, e)?;
    e.u8(1)?.array(body.outputs.len() as u64)?;
    for output in &body.outputs {
        encode_output(output, e)?;
    }
    e.u8(2)?.u64(body.fee)?;
    if !body.mint.is_empty() {
        e.u8(9)?;
        encode_mint(&body.mint, e)?;
    }
    if let Some(hash) = &body.script_data_hash {
        e.u8(11)?.bytes(hash)?;
    }
    if !body.collateral.is_empty() {
        e.u8(13)?;
        encode_inputs(&body.collateral, e)?;
    }
    if !body.required_signers.is_empty() {
        e.u8(14)?.array(body.required_signers.len() as u64)?;
        for signer in &body.required_signers {
            e.bytes(signer.as_bytes())?;
        }
    }
    if !body.reference_inputs.is_empty() {
        e.u8(18)?;
        encode_inputs(&body.reference_inputs, e)?;
    }
    Ok(())
}

fn split_map_entries(bytes: &[u8]) -> Result<BTreeMap<u64, Vec<u8>>, PlutusError> {
    let mut d = Decoder::new(bytes);
    let len = d.map()?;
    let mut entries = BTreeMap::new();
    let mut read_entry = |d: &mut Decoder<'_>| -> Result<(), PlutusError> {
        let key = d.u64()?;
        let start = d.position();
        d.skip()?;
        entries.insert(key, bytes[start..d.position()].to_vec());
        Ok(())
    };
    match len {
        Some(n) => {
            for _ in 0..n {
                read_entry(&mut d)?;
            }
        }
        None => {
            while !at_break(&mut d)? {
                read_entry(&mut d)?;
            }
        }
    }
    Ok(entries)
}

/// Runs `f` once per element of a definite or indefinite array, skipping an
/// optional set tag.
fn for_each_in_array<'b, F>(d: &mut Decoder<'b>, mut f: F) -> Result<(), PlutusError>
where
    F: FnMut(&mut Decoder<'b>) -> Result<(), PlutusError>,
{
    if d.datatype()? == Type::Tag {
        let tag = d.tag()?.as_u64();
        if tag != TAG_SET {
            return Err(PlutusError::Unsupported(format!("array tag {tag}")));
        }
    }
    match d.array()? {
        Some(n) => {
            for _ in 0..n {
                f(d)?;
            }
        }
        None => {
            while !at_break(d)? {
                f(d)?;
            }
        }
    }
    Ok(())
}

fn decode_input(d: &mut Decoder<'_>) -> Result<OutputRef, PlutusError> {
    if d.array()? != Some(2) {
        return Err(PlutusError::Decode("input must be [tx_id, index]".to_owned()));
    }
    let tx_id = TxId::from_slice(d.bytes()?).map_err(|e| PlutusError::Decode(e.to_string()))?;
    let index = d.u32()?;
    Ok(OutputRef::new(tx_id, index))
}

pub fn decode_value(d: &mut Decoder<'_>) -> Result<Value, PlutusError> {
    match d.datatype()? {
        Type::U8 | Type::U16 | Type::U32 | Type::U64 => Ok(Value::lovelace(d.u64()?)),
        Type::Array => {
            if d.array()? != Some(2) {
                return Err(PlutusError::Decode("value must be [coin, multiasset]".to_owned()));
            }
            let mut value = Value::lovelace(d.u64()?);
            let policies = d
                .map()?
                .ok_or_else(|| PlutusError::Decode("indefinite multiasset map".to_owned()))?;
            for _ in 0..policies {
                let policy =
                    PolicyId::from_slice(d.bytes()?).map_err(|e| PlutusError::Decode(e.to_string()))?;
                let names = d
                    .map()?
                    .ok_or_else(|| PlutusError::Decode("indefinite asset map".to_owned()))?;
                for _ in 0..names {
                    let name = d.bytes()?.to_vec();
                    let qty = d.u64()?;
                    value.assets.insert(AssetUnit { policy, name }, qty);
                }
            }
            Ok(value)
        }
        other => Err(PlutusError::Decode(format!("unexpected value type {other:?}"))),
    }
}

pub fn decode_value_cbor(bytes: &[u8]) -> Result<Value, PlutusError> {
    decode_value(&mut Decoder::new(bytes))
}

fn decode_address(d: &mut Decoder<'_>) -> Result<Address, PlutusError> {
    Address::from_bytes(d.bytes()?.to_vec()).map_err(|e| PlutusError::Decode(e.to_string()))
}

fn decode_datum_option(d: &mut Decoder<'_>) -> Result<Option<PlutusData>, PlutusError> {
    if d.array()? != Some(2) {
        return Err(PlutusError::Decode("datum option must be [kind, payload]".to_owned()));
    }
    match d.u8()? {
        0 => {
            d.skip()?;
            Ok(None)
        }
        1 => {
            let tag = d.tag()?.as_u64();
            if tag != TAG_ENCODED_CBOR {
                return Err(PlutusError::Decode(format!("inline datum tag {tag}")));
            }
            let raw = decode_bytes(d)?;
            Ok(Some(PlutusData::from_cbor(&raw)?))
        }
        other => Err(PlutusError::Decode(format!("datum option kind {other}"))),
    }
}

/// Decodes both the legacy array and the map output formats.
pub fn decode_output(d: &mut Decoder<'_>) -> Result<TxOutput, PlutusError> {
    match d.datatype()? {
        Type::Array => {
            let len = d.array()?.unwrap_or(0);
            if !(2..=3).contains(&len) {
                return Err(PlutusError::Decode(format!("legacy output with {len} fields")));
            }
            let address = decode_address(d)?;
            let value = decode_value(d)?;
            if len == 3 {
                d.skip()?;
            }
            Ok(TxOutput {
                address,
                value,
                datum: None,
            })
        }
        Type::Map => {
            let len = d.map()?.unwrap_or(0);
            let mut address = None;
            let mut value = None;
            let mut datum = None;
            for _ in 0..len {
                match d.u8()? {
                    0 => address = Some(decode_address(d)?),
                    1 => value = Some(decode_value(d)?),
                    2 => datum = decode_datum_option(d)?,
                    _ => {
                        d.skip()?;
                    }
                }
            }
            Ok(TxOutput {
                address: address.ok_or_else(|| PlutusError::Decode("output without address".to_owned()))?,
                value: value.ok_or_else(|| PlutusError::Decode("output without value".to_owned()))?,
                datum,
            })
        }
        other => Err(PlutusError::Decode(format!("unexpected output type {other:?}"))),
    }
}

/// Decodes a CIP-30 `TransactionUnspentOutput` (`[input, output]`).
pub fn decode_unspent_output(bytes: &[u8]) -> Result<UnspentOutput, PlutusError> {
    let mut d = Decoder::new(bytes);
    if d.array()? != Some(2) {
        return Err(PlutusError::Decode("utxo must be [input, output]".to_owned()));
    }
    let reference = decode_input(&mut d)?;
    let output = decode_output(&mut d)?;
    Ok(UnspentOutput {
        reference,
        address: output.address,
        value: output.value,
        inline_datum: output.datum,
    })
}

fn decode_mint(d: &mut Decoder<'_>) -> Result<BTreeMap<AssetUnit, i64>, PlutusError> {
    let mut mint = BTreeMap::new();
    let policies = d
        .map()?
        .ok_or_else(|| PlutusError::Decode("indefinite mint map".to_owned()))?;
    for _ in 0..policies {
        let policy =
            PolicyId::from_slice(d.bytes()?).map_err(|e| PlutusError::Decode(e.to_string()))?;
        let names = d
            .map()?
            .ok_or_else(|| PlutusError::Decode("indefinite mint asset map".to_owned()))?;
        for _ in 0..names {
            let name = d.bytes()?.to_vec();
            mint.insert(AssetUnit { policy, name }, d.i64()?);
        }
    }
    Ok(mint)
}

/// Reads redeemer pointers from either the array or the map witness format.
fn decode_redeemer_pointers(bytes: &[u8]) -> Result<Vec<(RedeemerTag, u32)>, PlutusError> {
    let mut d = Decoder::new(bytes);
    let mut pointers = Vec::new();
    let mut pointer = |d: &mut Decoder<'_>| -> Result<(), PlutusError> {
        let tag = RedeemerTag::from_code(d.u8()?)?;
        pointers.push((tag, d.u32()?));
        Ok(())
    };
    match d.datatype()? {
        Type::Map | Type::MapIndef => {
            let len = d.map()?;
            let mut entry = |d: &mut Decoder<'_>| -> Result<(), PlutusError> {
                d.array()?;
                pointer(d)?;
                d.skip()?;
                Ok(())
            };
            match len {
                Some(n) => {
                    for _ in 0..n {
                        entry(&mut d)?;
                    }
                }
                None => {
                    while !at_break(&mut d)? {
                        entry(&mut d)?;
                    }
                }
            }
        }
        _ => for_each_in_array(&mut d, |d| {
            d.array()?;
            pointer(d)?;
            d.skip()?;
            d.skip()?;
            Ok(())
        })?,
    }
    Ok(pointers)
}

/// Reads the id, spent inputs, created outputs, mint and script purposes of a
/// serialized transaction.
pub fn decode_tx_effects(tx_cbor: &[u8]) -> Result<TxEffects, PlutusError> {
    let mut d = Decoder::new(tx_cbor);
    if d.array()?.is_none() {
        return Err(PlutusError::Decode("indefinite transaction array".to_owned()));
    }
    let body_start = d.position();
    let entries = d
        .map()?
        .ok_or_else(|| PlutusError::Decode("indefinite transaction body".to_owned()))?;
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    let mut mint = BTreeMap::new();
    let mut reference_inputs = Vec::new();
    for _ in 0..entries {
        match d.u64()? {
            0 => for_each_in_array(&mut d, |d| {
                inputs.push(decode_input(d)?);
                Ok(())
            })?,
            1 => for_each_in_array(&mut d, |d| {
                outputs.push(decode_output(d)?);
                Ok(())
            })?,
            9 => mint = decode_mint(&mut d)?,
            18 => for_each_in_array(&mut d, |d| {
                reference_inputs.push(decode_input(d)?);
                Ok(())
            })?,
            _ => {
                d.skip()?;
            }
        }
    }
    let id = TxId(blake2b_256(&tx_cbor[body_start..d.position()]));

    let witnesses = split_map_entries(&tx_cbor[d.position()..])?;
    let redeemers = match witnesses.get(&5) {
        Some(raw) => decode_redeemer_pointers(raw)?,
        None => Vec::new(),
    };
    // Native, Plutus V1, V2 and V3 script slots.
    let witness_scripts = [1u64, 3, 6, 7].iter().any(|k| witnesses.contains_key(k));
    Ok(TxEffects {
        id,
        inputs,
        outputs,
        mint,
        reference_inputs,
        redeemers,
        witness_scripts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Credential, Network, ScriptHash};

    fn key_address() -> Address {
        Address::new(Network::Preview, Credential::Key(KeyHash([1; 28])), None)
    }

    #[test]
    fn min_lovelace_grows_with_inline_datum() {
        let plain = TxOutput {
            address: key_address(),
            value: Value::lovelace(0),
            datum: None,
        };
        let with_datum = TxOutput {
            datum: Some(PlutusData::Bytes(vec![0; 64])),
            ..plain.clone()
        };
        let a = plain.min_lovelace(4_310).expect("plain");
        let b = with_datum.min_lovelace(4_310).expect("datum");
        assert!(b > a);
        assert_eq!(a % 4_310, 0);
    }

    #[test]
    fn value_round_trips_through_cbor() {
        let mut value = Value::lovelace(2_000_000);
        value.assets.insert(
            AssetUnit {
                policy: PolicyId([9; 28]),
                name: b"COOP".to_vec(),
            },
            5,
        );
        let mut e = Encoder::new(Vec::new());
        encode_value(&value, &mut e).expect("encode");
        let bytes = e.into_writer();
        assert_eq!(decode_value_cbor(&bytes).expect("decode"), value);
    }

    #[test]
    fn body_id_changes_with_fee() {
        let mut body = TxBody {
            inputs: vec![OutputRef::new(TxId([3; 32]), 0)],
            outputs: vec![TxOutput {
                address: Address::new(Network::Preview, Credential::Script(ScriptHash([2; 28])), None),
                value: Value::lovelace(1_500_000),
                datum: Some(PlutusData::Integer(1)),
            }],
            fee: 170_000,
            ..TxBody::default()
        };
        let a = body.id().expect("id a");
        body.fee += 1;
        assert_ne!(a, body.id().expect("id b"));
    }

    #[test]
    fn effects_recover_inputs_and_outputs() {
        let output = TxOutput {
            address: key_address(),
            value: Value::lovelace(3_000_000),
            datum: Some(PlutusData::constr(0, vec![])),
        };
        let body = TxBody {
            inputs: vec![OutputRef::new(TxId([4; 32]), 1)],
            outputs: vec![output.clone()],
            fee: 200_000,
            ..TxBody::default()
        };
        let body_cbor = body.to_cbor().expect("body");
        let tx = encode_transaction(&body_cbor, &BTreeMap::new()).expect("tx");
        let effects = decode_tx_effects(&tx).expect("effects");
        assert_eq!(effects.id, body.id().expect("id"));
        assert_eq!(effects.inputs, body.inputs);
        assert_eq!(effects.outputs, vec![output]);
        assert!(effects.redeemers.is_empty());
    }

    #[test]
    fn effects_recover_mint_and_script_purposes() {
        let token = AssetUnit {
            policy: PolicyId([2; 28]),
            name: b"CoopRegistry".to_vec(),
        };
        let body = TxBody {
            inputs: vec![OutputRef::new(TxId([4; 32]), 0)],
            fee: 200_000,
            mint: BTreeMap::from([(token.clone(), 1)]),
            reference_inputs: vec![OutputRef::new(TxId([5; 32]), 0)],
            ..TxBody::default()
        };
        let redeemer = Redeemer {
            tag: RedeemerTag::Mint,
            index: 0,
            data: PlutusData::Integer(0),
            ex_units: ExUnits { mem: 1, steps: 1 },
        };
        let witnesses = BTreeMap::from([(5, redeemers_cbor(&[redeemer]).expect("redeemers"))]);
        let tx = encode_transaction(&body.to_cbor().expect("body"), &witnesses).expect("tx");

        let effects = decode_tx_effects(&tx).expect("effects");
        assert_eq!(effects.mint, body.mint);
        assert_eq!(effects.mint_policies(), vec![token.policy]);
        assert_eq!(effects.reference_inputs, body.reference_inputs);
        assert_eq!(effects.redeemers, vec![(RedeemerTag::Mint, 0)]);
        assert!(!effects.witness_scripts);
    }

    #[test]
    fn map_format_redeemers_are_read() {
        // {[0, 2]: [data, [mem, steps]]}
        let mut e = Encoder::new(Vec::new());
        e.map(1)
            .and_then(|e| e.array(2))
            .and_then(|e| e.u8(0))
            .and_then(|e| e.u8(2))
            .and_then(|e| e.array(2))
            .and_then(|e| e.u8(0))
            .and_then(|e| e.array(2))
            .and_then(|e| e.u8(1))
            .and_then(|e| e.u8(1))
            .expect("encode");
        let pointers = decode_redeemer_pointers(&e.into_writer()).expect("pointers");
        assert_eq!(pointers, vec![(RedeemerTag::Spend, 2)]);
    }
}
