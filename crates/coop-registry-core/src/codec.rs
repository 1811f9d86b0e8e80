//! Datum and redeemer codec.
//!
//! Field order below is the wire contract with the deployed validator:
//!
//! ```text
//! Entity         = Constr 0 [name, description, creation_time, founder, member_count]
//! MemberStatus   = Constr 0 [] | Constr 1 [] | Constr 2 []
//! Member         = Constr 0 [name, vkh, join_time, status]
//! RegistryState  = Constr 0 [entity, Map vkh member, List vkh]
//! RegistryAction = Constr 0 [name, description] | Constr 1 [member]
//!                | Constr 2 [key, status] | Constr 3 [key] | Constr 4 [key]
//! ```

use thiserror::Error;

use crate::domain::{
    AdminSet, Entity, KeyHash, Member, MemberMap, MemberStatus, RegistryAction, RegistryState,
    TimestampMs,
};
use crate::plutus::{PlutusData, PlutusError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error(transparent)]
    Cbor(#[from] PlutusError),
    #[error("{ty}: expected constructor, found {found}")]
    NotConstr { ty: &'static str, found: &'static str },
    #[error("{ty}: unknown constructor index {index}")]
    UnknownConstructor { ty: &'static str, index: u64 },
    #[error("{ty}: constructor {index} expects {expected} fields, found {found}")]
    FieldCount {
        ty: &'static str,
        index: u64,
        expected: usize,
        found: usize,
    },
    #[error("{field}: expected {expected}")]
    FieldType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("{field}: invalid utf-8")]
    Utf8 { field: &'static str },
    #[error("{field}: integer out of range")]
    IntegerRange { field: &'static str },
    #[error("{field}: expected {expected}-byte hash, found {found} bytes")]
    HashLength {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{field}: duplicate key {key}")]
    DuplicateKey { field: &'static str, key: KeyHash },
    #[error("members: map key {key} differs from member key {member}")]
    MemberKeyMismatch { key: KeyHash, member: KeyHash },
}

pub trait ToPlutusData {
    fn to_plutus_data(&self) -> PlutusData;
}

pub trait FromPlutusData: Sized {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, CodecError>;
}

pub fn encode_state(state: &RegistryState) -> Result<Vec<u8>, CodecError> {
    Ok(state.to_plutus_data().to_cbor()?)
}

pub fn decode_state(bytes: &[u8]) -> Result<RegistryState, CodecError> {
    RegistryState::from_plutus_data(&PlutusData::from_cbor(bytes)?)
}

pub fn encode_action(action: &RegistryAction) -> Result<Vec<u8>, CodecError> {
    Ok(action.to_plutus_data().to_cbor()?)
}

pub fn decode_action(bytes: &[u8]) -> Result<RegistryAction, CodecError> {
    RegistryAction::from_plutus_data(&PlutusData::from_cbor(bytes)?)
}

fn kind_name(data: &PlutusData) -> &'static str {
    match data {
        PlutusData::Constr { .. } => "constructor",
        PlutusData::Map(_) => "map",
        PlutusData::List(_) => "list",
        PlutusData::Integer(_) => "integer",
        PlutusData::Bytes(_) => "bytes",
    }
}

fn constr<'a>(
    ty: &'static str,
    data: &'a PlutusData,
) -> Result<(u64, &'a [PlutusData]), CodecError> {
    match data {
        PlutusData::Constr {
            alternative,
            fields,
        } => Ok((*alternative, fields.as_slice())),
        other => Err(CodecError::NotConstr {
            ty,
            found: kind_name(other),
        }),
    }
}

fn arity<'a>(
    ty: &'static str,
    index: u64,
    fields: &'a [PlutusData],
    expected: usize,
) -> Result<&'a [PlutusData], CodecError> {
    if fields.len() != expected {
        return Err(CodecError::FieldCount {
            ty,
            index,
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

fn text(s: &str) -> PlutusData {
    PlutusData::Bytes(s.as_bytes().to_vec())
}

fn int(n: u64) -> PlutusData {
    PlutusData::Integer(i128::from(n))
}

fn key(k: &KeyHash) -> PlutusData {
    PlutusData::Bytes(k.0.to_vec())
}

fn read_text(field: &'static str, data: &PlutusData) -> Result<String, CodecError> {
    match data {
        PlutusData::Bytes(b) => {
            String::from_utf8(b.clone()).map_err(|_| CodecError::Utf8 { field })
        }
        _ => Err(CodecError::FieldType {
            field,
            expected: "bytes",
        }),
    }
}

fn read_u64(field: &'static str, data: &PlutusData) -> Result<u64, CodecError> {
    match data {
        PlutusData::Integer(n) => u64::try_from(*n).map_err(|_| CodecError::IntegerRange { field }),
        _ => Err(CodecError::FieldType {
            field,
            expected: "integer",
        }),
    }
}

fn read_key(field: &'static str, data: &PlutusData) -> Result<KeyHash, CodecError> {
    match data {
        PlutusData::Bytes(b) => KeyHash::from_slice(b).map_err(|_| CodecError::HashLength {
            field,
            expected: KeyHash::LEN,
            found: b.len(),
        }),
        _ => Err(CodecError::FieldType {
            field,
            expected: "bytes",
        }),
    }
}

impl ToPlutusData for MemberStatus {
    fn to_plutus_data(&self) -> PlutusData {
        let index = match self {
            MemberStatus::Active => 0,
            MemberStatus::Inactive => 1,
            MemberStatus::Suspended => 2,
        };
        PlutusData::constr(index, vec![])
    }
}

impl FromPlutusData for MemberStatus {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, CodecError> {
        const TY: &str = "MemberStatus";
        let (index, fields) = constr(TY, data)?;
        let status = match index {
            0 => MemberStatus::Active,
            1 => MemberStatus::Inactive,
            2 => MemberStatus::Suspended,
            _ => return Err(CodecError::UnknownConstructor { ty: TY, index }),
        };
        arity(TY, index, fields, 0)?;
        Ok(status)
    }
}

impl ToPlutusData for Member {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::constr(
            0,
            vec![
                text(&self.name),
                key(&self.verification_key_hash),
                int(self.join_time.0),
                self.status.to_plutus_data(),
            ],
        )
    }
}

impl FromPlutusData for Member {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, CodecError> {
        const TY: &str = "Member";
        let (index, fields) = constr(TY, data)?;
        if index != 0 {
            return Err(CodecError::UnknownConstructor { ty: TY, index });
        }
        let f = arity(TY, index, fields, 4)?;
        Ok(Member {
            name: read_text("member.name", &f[0])?,
            verification_key_hash: read_key("member.verification_key_hash", &f[1])?,
            join_time: TimestampMs(read_u64("member.join_time", &f[2])?),
            status: MemberStatus::from_plutus_data(&f[3])?,
        })
    }
}

impl ToPlutusData for Entity {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::constr(
            0,
            vec![
                text(&self.name),
                text(&self.description),
                int(self.creation_time.0),
                key(&self.founder),
                int(self.member_count),
            ],
        )
    }
}

impl FromPlutusData for Entity {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, CodecError> {
        const TY: &str = "Entity";
        let (index, fields) = constr(TY, data)?;
        if index != 0 {
            return Err(CodecError::UnknownConstructor { ty: TY, index });
        }
        let f = arity(TY, index, fields, 5)?;
        Ok(Entity {
            name: read_text("entity.name", &f[0])?,
            description: read_text("entity.description", &f[1])?,
            creation_time: TimestampMs(read_u64("entity.creation_time", &f[2])?),
            founder: read_key("entity.founder", &f[3])?,
            member_count: read_u64("entity.member_count", &f[4])?,
        })
    }
}

impl ToPlutusData for RegistryState {
    fn to_plutus_data(&self) -> PlutusData {
        let members = self
            .members
            .iter()
            .map(|(k, m)| (key(k), m.to_plutus_data()))
            .collect();
        let admins = self.admins.iter().map(key).collect();
        PlutusData::constr(
            0,
            vec![
                self.entity.to_plutus_data(),
                PlutusData::Map(members),
                PlutusData::List(admins),
            ],
        )
    }
}

impl FromPlutusData for RegistryState {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, CodecError> {
        const TY: &str = "RegistryState";
        let (index, fields) = constr(TY, data)?;
        if index != 0 {
            return Err(CodecError::UnknownConstructor { ty: TY, index });
        }
        let f = arity(TY, index, fields, 3)?;
        let entity = Entity::from_plutus_data(&f[0])?;

        let PlutusData::Map(entries) = &f[1] else {
            return Err(CodecError::FieldType {
                field: "members",
                expected: "map",
            });
        };
        let mut members = MemberMap::new();
        for (k, v) in entries {
            let k = read_key("members.key", k)?;
            let member = Member::from_plutus_data(v)?;
            if member.verification_key_hash != k {
                return Err(CodecError::MemberKeyMismatch {
                    key: k,
                    member: member.verification_key_hash,
                });
            }
            if !members.insert(member) {
                return Err(CodecError::DuplicateKey {
                    field: "members",
                    key: k,
                });
            }
        }

        let PlutusData::List(items) = &f[2] else {
            return Err(CodecError::FieldType {
                field: "admins",
                expected: "list",
            });
        };
        let mut admins = AdminSet::new();
        for item in items {
            let k = read_key("admins", item)?;
            if !admins.insert(k) {
                return Err(CodecError::DuplicateKey {
                    field: "admins",
                    key: k,
                });
            }
        }

        Ok(RegistryState {
            entity,
            members,
            admins,
        })
    }
}

impl ToPlutusData for RegistryAction {
    fn to_plutus_data(&self) -> PlutusData {
        match self {
            RegistryAction::CreateEntity { name, description } => {
                PlutusData::constr(0, vec![text(name), text(description)])
            }
            RegistryAction::AddMember { member } => {
                PlutusData::constr(1, vec![member.to_plutus_data()])
            }
            RegistryAction::UpdateMemberStatus { key: k, status } => {
                PlutusData::constr(2, vec![key(k), status.to_plutus_data()])
            }
            RegistryAction::AddAdmin { key: k } => PlutusData::constr(3, vec![key(k)]),
            RegistryAction::RemoveAdmin { key: k } => PlutusData::constr(4, vec![key(k)]),
        }
    }
}

impl FromPlutusData for RegistryAction {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, CodecError> {
        const TY: &str = "RegistryAction";
        let (index, fields) = constr(TY, data)?;
        match index {
            0 => {
                let f = arity(TY, index, fields, 2)?;
                Ok(RegistryAction::CreateEntity {
                    name: read_text("action.name", &f[0])?,
                    description: read_text("action.description", &f[1])?,
                })
            }
            1 => {
                let f = arity(TY, index, fields, 1)?;
                Ok(RegistryAction::AddMember {
                    member: Member::from_plutus_data(&f[0])?,
                })
            }
            2 => {
                let f = arity(TY, index, fields, 2)?;
                Ok(RegistryAction::UpdateMemberStatus {
                    key: read_key("action.key", &f[0])?,
                    status: MemberStatus::from_plutus_data(&f[1])?,
                })
            }
            3 => {
                let f = arity(TY, index, fields, 1)?;
                Ok(RegistryAction::AddAdmin {
                    key: read_key("action.key", &f[0])?,
                })
            }
            4 => {
                let f = arity(TY, index, fields, 1)?;
                Ok(RegistryAction::RemoveAdmin {
                    key: read_key("action.key", &f[0])?,
                })
            }
            _ => Err(CodecError::UnknownConstructor { ty: TY, index }),
        }
    }
}
