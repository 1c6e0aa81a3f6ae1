//! Module: executor::group::raw
//! Responsibility: type-tagged byte encoding of raw group-by values.
//! Does not own: dictionary access.
//! Boundary: NoDictionary key mode; accepts any column type and cardinality.

use crate::{
    error::InternalError,
    executor::{
        group::{GroupColumn, GroupKey},
        projection::Block,
    },
    value::{Value, canonical_f64_bits},
};

const TAG_NULL: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_FLOAT: u8 = 2;
const TAG_TEXT: u8 = 3;

/// Append the canonical encoding of `value` to `out`.
///
/// Equal values (by canonical equality) always produce identical bytes, and
/// the encoding is self-delimiting so concatenations never collide.
pub fn encode_value(value: &Value, out: &mut Vec<u8>) -> Result<(), InternalError> {
    match value {
        Value::Null => out.push(TAG_NULL),
        Value::Int(v) => {
            out.push(TAG_INT);
            out.extend_from_slice(&v.to_be_bytes());
        }
        Value::Float(v) => {
            out.push(TAG_FLOAT);
            out.extend_from_slice(&canonical_f64_bits(*v).to_be_bytes());
        }
        Value::Text(v) => {
            let len = u32::try_from(v.len()).map_err(|_| {
                InternalError::executor_invariant(format!(
                    "group-by text value of {} bytes exceeds key encoding limit",
                    v.len()
                ))
            })?;
            out.push(TAG_TEXT);
            out.extend_from_slice(&len.to_be_bytes());
            out.extend_from_slice(v.as_bytes());
        }
    }

    Ok(())
}

/// Decode a full key produced by [`encode_value`] calls.
pub fn decode_values(mut bytes: &[u8]) -> Result<Vec<Value>, InternalError> {
    let mut values = Vec::new();
    while let Some((&tag, rest)) = bytes.split_first() {
        let (value, rest) = match tag {
            TAG_NULL => (Value::Null, rest),
            TAG_INT => {
                let (word, rest) = take_word(rest)?;
                (Value::Int(i64::from_be_bytes(word)), rest)
            }
            TAG_FLOAT => {
                let (word, rest) = take_word(rest)?;
                (Value::Float(f64::from_bits(u64::from_be_bytes(word))), rest)
            }
            TAG_TEXT => {
                let (len, rest) = take::<4>(rest)?;
                let len = usize::try_from(u32::from_be_bytes(len)).map_err(|_| truncated())?;
                let (text, rest) = rest.split_at_checked(len).ok_or_else(truncated)?;
                let text = std::str::from_utf8(text).map_err(|_| {
                    InternalError::executor_invariant("raw group key holds invalid utf-8")
                })?;
                (Value::Text(text.to_string()), rest)
            }
            other => {
                return Err(InternalError::executor_invariant(format!(
                    "raw group key has unknown tag {other}"
                )));
            }
        };
        values.push(value);
        bytes = rest;
    }

    Ok(values)
}

fn take_word(bytes: &[u8]) -> Result<([u8; 8], &[u8]), InternalError> {
    take::<8>(bytes)
}

fn take<const N: usize>(bytes: &[u8]) -> Result<([u8; N], &[u8]), InternalError> {
    let (head, rest) = bytes.split_first_chunk::<N>().ok_or_else(truncated)?;
    Ok((*head, rest))
}

fn truncated() -> InternalError {
    InternalError::executor_invariant("raw group key is truncated")
}

///
/// RawKeyGenerator
///

#[derive(Debug)]
pub struct RawKeyGenerator {
    columns: Vec<GroupColumn>,
    scratch: Vec<u8>,
}

impl RawKeyGenerator {
    #[must_use]
    pub(crate) const fn new(columns: Vec<GroupColumn>) -> Self {
        Self {
            columns,
            scratch: Vec::new(),
        }
    }

    pub(crate) fn generate(
        &mut self,
        block: &Block,
        keys: &mut Vec<GroupKey>,
    ) -> Result<(), InternalError> {
        keys.clear();
        for row in 0..block.len() {
            self.scratch.clear();
            for column in &self.columns {
                encode_value(block.column(column.position()).value(row), &mut self.scratch)?;
            }
            keys.push(GroupKey::Raw(self.scratch.as_slice().into()));
        }

        Ok(())
    }

    pub(crate) fn decode(&self, key: &[u8]) -> Result<Vec<Value>, InternalError> {
        let values = decode_values(key)?;
        if values.len() != self.columns.len() {
            return Err(InternalError::executor_invariant(format!(
                "raw group key decoded {} values for {} group-by columns",
                values.len(),
                self.columns.len()
            )));
        }

        Ok(values)
    }
}
