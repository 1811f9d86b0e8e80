use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::plutus::PlutusData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimestampMs(pub u64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid hex: {0}")]
    Hex(String),
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("invalid address: {0}")]
    Address(String),
    #[error("invalid output reference: {0}")]
    OutputRef(String),
    #[error("unknown network: {0}")]
    Network(String),
    #[error("invalid asset unit: {0}")]
    Unit(String),
}

macro_rules! hash_newtype {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseError> {
                let arr: [u8; $len] = bytes.try_into().map_err(|_| ParseError::Length {
                    expected: $len,
                    actual: bytes.len(),
                })?;
                Ok(Self(arr))
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = hex::decode(s).map_err(|e| ParseError::Hex(e.to_string()))?;
                Self::from_slice(&raw)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hash_newtype!(
    /// Blake2b-224 hash of a verification key.
    KeyHash,
    28
);
hash_newtype!(
    /// Blake2b-224 hash of a script.
    ScriptHash,
    28
);
hash_newtype!(PolicyId, 28);
hash_newtype!(
    /// Blake2b-256 hash of a transaction body.
    TxId,
    32
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputRef {
    pub tx_id: TxId,
    pub index: u32,
}

impl OutputRef {
    pub fn new(tx_id: TxId, index: u32) -> Self {
        Self { tx_id, index }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_id, self.index)
    }
}

impl FromStr for OutputRef {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tx, index) = s
            .split_once('#')
            .ok_or_else(|| ParseError::OutputRef(format!("missing '#': {s}")))?;
        let index = index
            .parse()
            .map_err(|e| ParseError::OutputRef(format!("bad index in {s}: {e}")))?;
        Ok(Self {
            tx_id: tx.parse()?,
            index,
        })
    }
}

impl Serialize for OutputRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for OutputRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Preprod,
    Preview,
}

impl Network {
    pub fn network_id(self) -> u8 {
        match self {
            Network::Mainnet => 1,
            Network::Preprod | Network::Preview => 0,
        }
    }

    pub fn address_hrp(self) -> &'static str {
        match self {
            Network::Mainnet => "addr",
            Network::Preprod | Network::Preview => "addr_test",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Network::Mainnet => "mainnet",
            Network::Preprod => "preprod",
            Network::Preview => "preview",
        })
    }
}

impl FromStr for Network {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "preprod" => Ok(Network::Preprod),
            "preview" => Ok(Network::Preview),
            other => Err(ParseError::Network(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Credential {
    Key(KeyHash),
    Script(ScriptHash),
}

impl Credential {
    fn hash_bytes(&self) -> &[u8] {
        match self {
            Credential::Key(h) => h.as_bytes(),
            Credential::Script(h) => h.as_bytes(),
        }
    }

    fn is_script(&self) -> bool {
        matches!(self, Credential::Script(_))
    }
}

/// Shelley-era payment address (base, pointer or enterprise).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Address {
    bytes: Vec<u8>,
}

impl Address {
    pub fn new(network: Network, payment: Credential, stake: Option<Credential>) -> Self {
        let (kind, stake_bytes) = match stake {
            Some(stake) => {
                let kind = u8::from(payment.is_script()) | (u8::from(stake.is_script()) << 1);
                (kind, stake.hash_bytes().to_vec())
            }
            None => (if payment.is_script() { 7 } else { 6 }, Vec::new()),
        };
        let mut bytes = Vec::with_capacity(57);
        bytes.push((kind << 4) | network.network_id());
        bytes.extend_from_slice(payment.hash_bytes());
        bytes.extend_from_slice(&stake_bytes);
        Self { bytes }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ParseError> {
        let header = *bytes
            .first()
            .ok_or_else(|| ParseError::Address("empty address".to_owned()))?;
        let kind = header >> 4;
        let valid_len = match kind {
            0..=3 => bytes.len() == 57,
            4 | 5 => bytes.len() > 29,
            6 | 7 => bytes.len() == 29,
            _ => {
                return Err(ParseError::Address(format!(
                    "address type {kind} carries no payment credential"
                )))
            }
        };
        if !valid_len {
            return Err(ParseError::Address(format!(
                "address type {kind} with invalid length {}",
                bytes.len()
            )));
        }
        Ok(Self { bytes })
    }

    pub fn from_bech32(raw: &str) -> Result<Self, ParseError> {
        let (hrp, bytes) =
            bech32::decode(raw).map_err(|e| ParseError::Address(format!("{raw}: {e}")))?;
        let address = Self::from_bytes(bytes)?;
        let expected = if address.network_id() == 1 {
            "addr"
        } else {
            "addr_test"
        };
        if hrp.as_str() != expected {
            return Err(ParseError::Address(format!(
                "prefix {} does not match network id {}",
                hrp.as_str(),
                address.network_id()
            )));
        }
        Ok(address)
    }

    pub fn to_bech32(&self) -> String {
        let hrp = if self.network_id() == 1 {
            Hrp::parse_unchecked("addr")
        } else {
            Hrp::parse_unchecked("addr_test")
        };
        bech32::encode::<Bech32>(hrp, &self.bytes).unwrap_or_else(|_| hex::encode(&self.bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn network_id(&self) -> u8 {
        self.bytes[0] & 0x0f
    }

    pub fn payment_credential(&self) -> Credential {
        let mut hash = [0u8; 28];
        hash.copy_from_slice(&self.bytes[1..29]);
        if (self.bytes[0] >> 4) & 1 == 1 {
            Credential::Script(ScriptHash(hash))
        } else {
            Credential::Key(KeyHash(hash))
        }
    }

    pub fn payment_key_hash(&self) -> Option<KeyHash> {
        match self.payment_credential() {
            Credential::Key(h) => Some(h),
            Credential::Script(_) => None,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bech32())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_bech32())
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bech32(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_bech32())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_bech32(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetUnit {
    pub policy: PolicyId,
    pub name: Vec<u8>,
}

impl fmt::Display for AssetUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.policy, hex::encode(&self.name))
    }
}

/// A balance listing entry as reported by wallets and ledger indexers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Unit {
    Lovelace,
    Asset(AssetUnit),
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Lovelace => f.write_str("lovelace"),
            Unit::Asset(asset) => asset.fmt(f),
        }
    }
}

impl FromStr for Unit {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "lovelace" {
            return Ok(Unit::Lovelace);
        }
        let raw = hex::decode(s).map_err(|e| ParseError::Unit(format!("{s}: {e}")))?;
        if raw.len() < PolicyId::LEN || raw.len() > PolicyId::LEN + 32 {
            return Err(ParseError::Unit(format!("{s}: bad length {}", raw.len())));
        }
        Ok(Unit::Asset(AssetUnit {
            policy: PolicyId::from_slice(&raw[..PolicyId::LEN])?,
            name: raw[PolicyId::LEN..].to_vec(),
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceEntry {
    pub unit: Unit,
    pub quantity: u64,
}

/// Multi-asset amount carried by an output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Value {
    pub lovelace: u64,
    pub assets: BTreeMap<AssetUnit, u64>,
}

impl Value {
    pub fn lovelace(lovelace: u64) -> Self {
        Self {
            lovelace,
            assets: BTreeMap::new(),
        }
    }

    pub fn is_pure_ada(&self) -> bool {
        self.assets.values().all(|q| *q == 0)
    }

    pub fn is_zero(&self) -> bool {
        self.lovelace == 0 && self.is_pure_ada()
    }

    pub fn checked_add(&self, other: &Value) -> Option<Value> {
        let mut out = self.clone();
        out.lovelace = out.lovelace.checked_add(other.lovelace)?;
        for (unit, qty) in &other.assets {
            let slot = out.assets.entry(unit.clone()).or_insert(0);
            *slot = slot.checked_add(*qty)?;
        }
        Some(out)
    }

    /// `None` when `other` is not covered by `self`.
    pub fn checked_sub(&self, other: &Value) -> Option<Value> {
        let mut out = self.clone();
        out.lovelace = out.lovelace.checked_sub(other.lovelace)?;
        for (unit, qty) in &other.assets {
            if *qty == 0 {
                continue;
            }
            let slot = out.assets.get_mut(unit)?;
            *slot = slot.checked_sub(*qty)?;
        }
        out.assets.retain(|_, q| *q > 0);
        Some(out)
    }

    pub fn to_listing(&self) -> Vec<BalanceEntry> {
        let mut listing = vec![BalanceEntry {
            unit: Unit::Lovelace,
            quantity: self.lovelace,
        }];
        listing.extend(self.assets.iter().map(|(unit, qty)| BalanceEntry {
            unit: Unit::Asset(unit.clone()),
            quantity: *qty,
        }));
        listing
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    pub reference: OutputRef,
    pub address: Address,
    pub value: Value,
    pub inline_datum: Option<PlutusData>,
}

impl UnspentOutput {
    /// Typed view of the inline datum; `Ok(None)` when the output carries none.
    pub fn registry_state(&self) -> Result<Option<RegistryState>, crate::codec::CodecError> {
        self.inline_datum
            .as_ref()
            .map(crate::codec::FromPlutusData::from_plutus_data)
            .transpose()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    Active,
    Inactive,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub name: String,
    pub verification_key_hash: KeyHash,
    pub join_time: TimestampMs,
    pub status: MemberStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub name: String,
    pub description: String,
    pub creation_time: TimestampMs,
    pub founder: KeyHash,
    pub member_count: u64,
}

/// Member mapping that keeps caller insertion order and unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberMap(Vec<(KeyHash, Member)>);

impl MemberMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys the entry by the member's own verification key hash. Returns
    /// `false` and leaves the map untouched when that key exists.
    pub fn insert(&mut self, member: Member) -> bool {
        let key = member.verification_key_hash;
        if self.contains_key(&key) {
            return false;
        }
        self.0.push((key, member));
        true
    }

    pub fn get(&self, key: &KeyHash) -> Option<&Member> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, m)| m)
    }

    /// Returns `false` when no member has `key`.
    pub fn set_status(&mut self, key: &KeyHash, status: MemberStatus) -> bool {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, member)) => {
                member.status = status;
                true
            }
            None => false,
        }
    }

    pub fn contains_key(&self, key: &KeyHash) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KeyHash, &Member)> {
        self.0.iter().map(|(k, m)| (k, m))
    }
}

/// Administrator set that keeps caller insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSet(Vec<KeyHash>);

impl AdminSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: KeyHash) -> bool {
        if self.contains(&key) {
            return false;
        }
        self.0.push(key);
        true
    }

    pub fn remove(&mut self, key: &KeyHash) -> bool {
        let before = self.0.len();
        self.0.retain(|k| k != key);
        before != self.0.len()
    }

    pub fn contains(&self, key: &KeyHash) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyHash> {
        self.0.iter()
    }
}

impl FromIterator<KeyHash> for AdminSet {
    fn from_iter<I: IntoIterator<Item = KeyHash>>(iter: I) -> Self {
        let mut set = AdminSet::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

/// The registry datum held at the contract address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryState {
    pub entity: Entity,
    pub members: MemberMap,
    pub admins: AdminSet,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("registry already exists; CreateEntity cannot be applied")]
    AlreadyCreated,
    #[error("member already registered: {0}")]
    DuplicateMember(KeyHash),
    #[error("unknown member: {0}")]
    UnknownMember(KeyHash),
    #[error("already an admin: {0}")]
    DuplicateAdmin(KeyHash),
    #[error("not an admin: {0}")]
    UnknownAdmin(KeyHash),
    #[error("cannot remove the last admin: {0}")]
    LastAdmin(KeyHash),
}

impl RegistryState {
    /// Initial datum written by a registration transaction.
    pub fn genesis(
        name: impl Into<String>,
        description: impl Into<String>,
        creation_time: TimestampMs,
        founder: KeyHash,
    ) -> Self {
        let mut admins = AdminSet::new();
        admins.insert(founder);
        Self {
            entity: Entity {
                name: name.into(),
                description: description.into(),
                creation_time,
                founder,
                member_count: 0,
            },
            members: MemberMap::new(),
            admins,
        }
    }

    /// Projects the datum the validator is expected to accept after `action`.
    /// The validator stays the authority; this only shapes the continuing output.
    pub fn apply(&self, action: &RegistryAction) -> Result<RegistryState, ActionError> {
        let mut next = self.clone();
        match action {
            RegistryAction::CreateEntity { .. } => return Err(ActionError::AlreadyCreated),
            RegistryAction::AddMember { member } => {
                let key = member.verification_key_hash;
                if !next.members.insert(member.clone()) {
                    return Err(ActionError::DuplicateMember(key));
                }
            }
            RegistryAction::UpdateMemberStatus { key, status } => {
                if !next.members.set_status(key, *status) {
                    return Err(ActionError::UnknownMember(*key));
                }
            }
            RegistryAction::AddAdmin { key } => {
                if !next.admins.insert(*key) {
                    return Err(ActionError::DuplicateAdmin(*key));
                }
            }
            RegistryAction::RemoveAdmin { key } => {
                if !next.admins.contains(key) {
                    return Err(ActionError::UnknownAdmin(*key));
                }
                if next.admins.len() == 1 {
                    return Err(ActionError::LastAdmin(*key));
                }
                next.admins.remove(key);
            }
        }
        next.entity.member_count = next.members.len() as u64;
        Ok(next)
    }
}

/// Redeemer attached to registry transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryAction {
    CreateEntity { name: String, description: String },
    AddMember { member: Member },
    UpdateMemberStatus { key: KeyHash, status: MemberStatus },
    AddAdmin { key: KeyHash },
    RemoveAdmin { key: KeyHash },
}

impl RegistryAction {
    pub fn label(&self) -> &'static str {
        match self {
            RegistryAction::CreateEntity { .. } => "create_entity",
            RegistryAction::AddMember { .. } => "add_member",
            RegistryAction::UpdateMemberStatus { .. } => "update_member_status",
            RegistryAction::AddAdmin { .. } => "add_admin",
            RegistryAction::RemoveAdmin { .. } => "remove_admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlutusVersion {
    #[serde(alias = "PlutusV2", alias = "v2")]
    V2,
    #[serde(alias = "PlutusV3", alias = "v3")]
    V3,
}

/// Deployed registry validator as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorRef {
    pub script_hash: ScriptHash,
    pub address: Address,
    pub plutus_version: PlutusVersion,
    pub reference_script: Option<OutputRef>,
}

/// Asset name of the token marking an authentic registry output.
pub const REGISTRY_TOKEN_NAME: &[u8] = b"CoopRegistry";

impl ValidatorRef {
    /// Minted once at creation under the validator's own script hash and
    /// carried by every continuing registry output.
    pub fn registry_token(&self) -> AssetUnit {
        AssetUnit {
            policy: PolicyId(self.script_hash.0),
            name: REGISTRY_TOKEN_NAME.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExUnits {
    pub mem: u64,
    pub steps: u64,
}

/// Fraction used for execution prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratio {
    pub numerator: u64,
    pub denominator: u64,
}

impl Ratio {
    /// `ceil(value * self)`; `None` on a zero denominator or overflow.
    pub fn mul_ceil(&self, value: u64) -> Option<u64> {
        if self.denominator == 0 {
            return None;
        }
        let num = u128::from(value) * u128::from(self.numerator);
        let den = u128::from(self.denominator);
        u64::try_from(num.div_ceil(den)).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostModel {
    pub version: PlutusVersion,
    pub costs: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    pub min_fee_a: u64,
    pub min_fee_b: u64,
    pub coins_per_utxo_byte: u64,
    pub max_tx_size: u32,
    pub collateral_percent: u64,
    pub max_collateral_inputs: u32,
    pub price_mem: Ratio,
    pub price_steps: Ratio,
    pub cost_models: Vec<CostModel>,
}

impl ProtocolParams {
    pub fn cost_model(&self, version: PlutusVersion) -> Option<&CostModel> {
        self.cost_models.iter().find(|m| m.version == version)
    }
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            min_fee_a: 44,
            min_fee_b: 155_381,
            coins_per_utxo_byte: 4_310,
            max_tx_size: 16_384,
            collateral_percent: 150,
            max_collateral_inputs: 3,
            price_mem: Ratio {
                numerator: 577,
                denominator: 10_000,
            },
            price_steps: Ratio {
                numerator: 721,
                denominator: 10_000_000,
            },
            cost_models: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Submitted,
    Confirmed,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTransaction {
    pub id: TxId,
    pub submitted_at: TimestampMs,
    pub status: SubmissionStatus,
}

/// Ledger-side view of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed { block_height: Option<u64> },
}
