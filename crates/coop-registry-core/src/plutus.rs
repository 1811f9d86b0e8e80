//! Plutus Data and its CBOR encoding.
//!
//! Encoding is deterministic: definite-length arrays and maps, the shortest
//! integer form, bignum tags only outside the 64-bit CBOR range, and byte
//! strings longer than 64 bytes split into 64-byte chunks. Decoding also
//! accepts the indefinite-length forms other tooling emits.

use std::convert::Infallible;

use minicbor::data::{Int, Tag, Type};
use minicbor::encode::{Error as EncodeError, Write};
use minicbor::{Decoder, Encoder};
use thiserror::Error;

const MAX_CHUNK: usize = 64;
const MAX_DEPTH: usize = 64;
const TAG_POS_BIGNUM: u64 = 2;
const TAG_NEG_BIGNUM: u64 = 3;
const TAG_GENERAL_CONSTR: u64 = 102;
const TAG_CONSTR_SMALL: u64 = 121;
const TAG_CONSTR_LARGE: u64 = 1280;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlutusData {
    Constr {
        alternative: u64,
        fields: Vec<PlutusData>,
    },
    Map(Vec<(PlutusData, PlutusData)>),
    List(Vec<PlutusData>),
    Integer(i128),
    Bytes(Vec<u8>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlutusError {
    #[error("cbor decode failed: {0}")]
    Decode(String),
    #[error("cbor encode failed: {0}")]
    Encode(String),
    #[error("unsupported cbor item: {0}")]
    Unsupported(String),
    #[error("integer does not fit 128 bits")]
    IntegerOverflow,
    #[error("plutus data nested deeper than {MAX_DEPTH} levels")]
    TooDeep,
    #[error("{0} trailing bytes after plutus data")]
    TrailingBytes(usize),
}

impl From<minicbor::decode::Error> for PlutusError {
    fn from(e: minicbor::decode::Error) -> Self {
        PlutusError::Decode(e.to_string())
    }
}

impl From<EncodeError<Infallible>> for PlutusError {
    fn from(e: EncodeError<Infallible>) -> Self {
        PlutusError::Encode(e.to_string())
    }
}

impl PlutusData {
    pub fn constr(alternative: u64, fields: Vec<PlutusData>) -> Self {
        PlutusData::Constr {
            alternative,
            fields,
        }
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, PlutusError> {
        let mut e = Encoder::new(Vec::new());
        self.encode_to(&mut e)?;
        Ok(e.into_writer())
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, PlutusError> {
        let mut d = Decoder::new(bytes);
        let data = Self::decode_from(&mut d)?;
        let rest = bytes.len() - d.position();
        if rest != 0 {
            return Err(PlutusError::TrailingBytes(rest));
        }
        Ok(data)
    }

    pub fn encode_to<W: Write>(&self, e: &mut Encoder<W>) -> Result<(), EncodeError<W::Error>> {
        match self {
            PlutusData::Constr {
                alternative,
                fields,
            } => {
                match compact_constr_tag(*alternative) {
                    Some(tag) => {
                        e.tag(Tag::new(tag))?;
                    }
                    None => {
                        e.tag(Tag::new(TAG_GENERAL_CONSTR))?.array(2)?.u64(*alternative)?;
                    }
                }
                encode_list(fields, e)
            }
            PlutusData::Map(entries) => {
                e.map(entries.len() as u64)?;
                for (k, v) in entries {
                    k.encode_to(e)?;
                    v.encode_to(e)?;
                }
                Ok(())
            }
            PlutusData::List(items) => encode_list(items, e),
            PlutusData::Integer(n) => encode_integer(*n, e),
            PlutusData::Bytes(bytes) => encode_bytes(bytes, e),
        }
    }

    /// Decodes one data item at the decoder's position.
    pub fn decode_from(d: &mut Decoder<'_>) -> Result<Self, PlutusError> {
        decode_item(d, 0)
    }
}

fn compact_constr_tag(alternative: u64) -> Option<u64> {
    match alternative {
        0..=6 => Some(TAG_CONSTR_SMALL + alternative),
        7..=127 => Some(TAG_CONSTR_LARGE + alternative - 7),
        _ => None,
    }
}

fn encode_list<W: Write>(
    items: &[PlutusData],
    e: &mut Encoder<W>,
) -> Result<(), EncodeError<W::Error>> {
    e.array(items.len() as u64)?;
    for item in items {
        item.encode_to(e)?;
    }
    Ok(())
}

fn encode_integer<W: Write>(n: i128, e: &mut Encoder<W>) -> Result<(), EncodeError<W::Error>> {
    if let Ok(small) = Int::try_from(n) {
        e.int(small)?;
        return Ok(());
    }
    let (tag, magnitude) = if n >= 0 {
        (TAG_POS_BIGNUM, n as u128)
    } else {
        (TAG_NEG_BIGNUM, (-1 - n) as u128)
    };
    let raw = magnitude.to_be_bytes();
    let first = raw.iter().position(|b| *b != 0).unwrap_or(raw.len() - 1);
    e.tag(Tag::new(tag))?;
    encode_bytes(&raw[first..], e)
}

fn encode_bytes<W: Write>(bytes: &[u8], e: &mut Encoder<W>) -> Result<(), EncodeError<W::Error>> {
    if bytes.len() <= MAX_CHUNK {
        e.bytes(bytes)?;
        return Ok(());
    }
    e.begin_bytes()?;
    for chunk in bytes.chunks(MAX_CHUNK) {
        e.bytes(chunk)?;
    }
    e.end()?;
    Ok(())
}

fn decode_item(d: &mut Decoder<'_>, depth: usize) -> Result<PlutusData, PlutusError> {
    if depth > MAX_DEPTH {
        return Err(PlutusError::TooDeep);
    }
    match d.datatype()? {
        Type::Tag => {
            let tag = d.tag()?.as_u64();
            match tag {
                121..=127 => Ok(PlutusData::Constr {
                    alternative: tag - TAG_CONSTR_SMALL,
                    fields: decode_list(d, depth)?,
                }),
                1280..=1400 => Ok(PlutusData::Constr {
                    alternative: tag - TAG_CONSTR_LARGE + 7,
                    fields: decode_list(d, depth)?,
                }),
                TAG_GENERAL_CONSTR => {
                    if d.array()? != Some(2) {
                        return Err(PlutusError::Unsupported(
                            "general constructor must be a 2-element array".to_owned(),
                        ));
                    }
                    let alternative = d.u64()?;
                    Ok(PlutusData::Constr {
                        alternative,
                        fields: decode_list(d, depth)?,
                    })
                }
                TAG_POS_BIGNUM | TAG_NEG_BIGNUM => {
                    let raw = decode_bytes(d)?;
                    let significant = raw.iter().skip_while(|b| **b == 0).count();
                    if significant > 16 {
                        return Err(PlutusError::IntegerOverflow);
                    }
                    let magnitude = raw
                        .iter()
                        .fold(0u128, |acc, b| (acc << 8) | u128::from(*b));
                    let magnitude =
                        i128::try_from(magnitude).map_err(|_| PlutusError::IntegerOverflow)?;
                    if tag == TAG_POS_BIGNUM {
                        Ok(PlutusData::Integer(magnitude))
                    } else {
                        Ok(PlutusData::Integer(-1 - magnitude))
                    }
                }
                other => Err(PlutusError::Unsupported(format!("cbor tag {other}"))),
            }
        }
        Type::Map | Type::MapIndef => {
            let len = d.map()?;
            let mut entries = Vec::new();
            match len {
                Some(n) => {
                    for _ in 0..n {
                        let k = decode_item(d, depth + 1)?;
                        let v = decode_item(d, depth + 1)?;
                        entries.push((k, v));
                    }
                }
                None => {
                    while !at_break(d)? {
                        let k = decode_item(d, depth + 1)?;
                        let v = decode_item(d, depth + 1)?;
                        entries.push((k, v));
                    }
                }
            }
            Ok(PlutusData::Map(entries))
        }
        Type::Array | Type::ArrayIndef => Ok(PlutusData::List(decode_array_items(d, depth)?)),
        Type::U8
        | Type::U16
        | Type::U32
        | Type::U64
        | Type::I8
        | Type::I16
        | Type::I32
        | Type::I64
        | Type::Int => Ok(PlutusData::Integer(i128::from(d.int()?))),
        Type::Bytes | Type::BytesIndef => Ok(PlutusData::Bytes(decode_bytes(d)?)),
        other => Err(PlutusError::Unsupported(format!("cbor type {other:?}"))),
    }
}

fn decode_list(d: &mut Decoder<'_>, depth: usize) -> Result<Vec<PlutusData>, PlutusError> {
    match d.datatype()? {
        Type::Array | Type::ArrayIndef => decode_array_items(d, depth),
        other => Err(PlutusError::Unsupported(format!(
            "constructor fields must be an array, found {other:?}"
        ))),
    }
}

fn decode_array_items(d: &mut Decoder<'_>, depth: usize) -> Result<Vec<PlutusData>, PlutusError> {
    let mut items = Vec::new();
    match d.array()? {
        Some(n) => {
            for _ in 0..n {
                items.push(decode_item(d, depth + 1)?);
            }
        }
        None => {
            while !at_break(d)? {
                items.push(decode_item(d, depth + 1)?);
            }
        }
    }
    Ok(items)
}

pub(crate) fn decode_bytes(d: &mut Decoder<'_>) -> Result<Vec<u8>, PlutusError> {
    match d.datatype()? {
        Type::Bytes => Ok(d.bytes()?.to_vec()),
        Type::BytesIndef => {
            let mut out = Vec::new();
            for chunk in d.bytes_iter()? {
                out.extend_from_slice(chunk?);
            }
            Ok(out)
        }
        other => Err(PlutusError::Unsupported(format!(
            "expected byte string, found {other:?}"
        ))),
    }
}

/// Consumes the break marker of an indefinite container when present.
pub(crate) fn at_break(d: &mut Decoder<'_>) -> Result<bool, PlutusError> {
    if d.datatype()? == Type::Break {
        d.set_position(d.position() + 1);
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_constructor_uses_compact_tag() {
        let bytes = PlutusData::constr(0, vec![]).to_cbor().expect("encode");
        assert_eq!(bytes, vec![0xd8, 0x79, 0x80]);
    }

    #[test]
    fn constructor_eight_uses_extended_range() {
        let bytes = PlutusData::constr(8, vec![]).to_cbor().expect("encode");
        // tag 1281
        assert_eq!(bytes, vec![0xd9, 0x05, 0x01, 0x80]);
    }

    #[test]
    fn large_alternative_uses_general_form() {
        let data = PlutusData::constr(300, vec![PlutusData::Integer(1)]);
        let bytes = data.to_cbor().expect("encode");
        assert_eq!(&bytes[..2], &[0xd8, 0x66]);
        assert_eq!(PlutusData::from_cbor(&bytes).expect("decode"), data);
    }

    #[test]
    fn integers_beyond_u64_use_bignum_tags() {
        let big = PlutusData::Integer(i128::from(u64::MAX) + 1);
        let bytes = big.to_cbor().expect("encode");
        assert_eq!(bytes[0], 0xc2);
        assert_eq!(PlutusData::from_cbor(&bytes).expect("decode"), big);

        let neg = PlutusData::Integer(-(i128::from(u64::MAX)) - 2);
        let bytes = neg.to_cbor().expect("encode");
        assert_eq!(bytes[0], 0xc3);
        assert_eq!(PlutusData::from_cbor(&bytes).expect("decode"), neg);
    }

    #[test]
    fn long_bytes_are_chunked() {
        let data = PlutusData::Bytes(vec![0xab; 100]);
        let bytes = data.to_cbor().expect("encode");
        assert_eq!(bytes[0], 0x5f);
        assert_eq!(*bytes.last().expect("break"), 0xff);
        assert_eq!(PlutusData::from_cbor(&bytes).expect("decode"), data);
    }

    #[test]
    fn indefinite_list_is_accepted() {
        // 121([_ 1, 2])
        let bytes = [0xd8, 0x79, 0x9f, 0x01, 0x02, 0xff];
        let data = PlutusData::from_cbor(&bytes).expect("decode");
        assert_eq!(
            data,
            PlutusData::constr(0, vec![PlutusData::Integer(1), PlutusData::Integer(2)])
        );
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let err = PlutusData::from_cbor(&[0x01, 0x02]).expect_err("trailing");
        assert_eq!(err, PlutusError::TrailingBytes(1));
    }

    #[test]
    fn text_strings_are_not_plutus_data() {
        let err = PlutusData::from_cbor(&[0x61, 0x61]).expect_err("text");
        assert!(matches!(err, PlutusError::Unsupported(_)));
    }
}
