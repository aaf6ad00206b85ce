//! Operation ⇄ `serde_json::Value`.
//!
//! Every operation encodes as an object with a `type` field naming the
//! variant; the remaining fields depend on the variant.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::error::{invalid, OtError, OtResult};
use crate::meta::SelectionUpdate;
use crate::ops::{MathOp, OpTag, Operation};
use crate::range::Range;
use crate::sequence::Hunk;

// ── Encoding ──────────────────────────────────────────────────────────────

fn encode_hunk(hunk: &Hunk) -> Value {
    json!({
        "index": hunk.index,
        "length": hunk.removed,
        "value": hunk.inserted,
    })
}

fn encode_selections(update: &SelectionUpdate) -> Value {
    let map: Map<String, Value> = update
        .iter()
        .map(|(id, range)| (id.clone(), range.as_ref().map_or(Value::Null, Range::to_json)))
        .collect();
    Value::Object(map)
}

/// Encodes `op` without a protocol version.
pub fn encode(op: &Operation) -> Value {
    let mut m = Map::new();
    m.insert("type".into(), json!(op.tag().as_str()));
    match op {
        Operation::NoOp => {}
        Operation::Set(value) => {
            m.insert("value".into(), value.clone());
        }
        Operation::Math(edit) => {
            m.insert("op".into(), json!(edit.op().name()));
            m.insert("value".into(), edit.operand().clone());
        }
        Operation::Splice(patch) => match patch.hunks() {
            [hunk] => {
                m.insert("index".into(), json!(hunk.index));
                m.insert("length".into(), json!(hunk.removed));
                m.insert("value".into(), hunk.inserted.clone());
            }
            hunks => {
                m.insert("hunks".into(), Value::Array(hunks.iter().map(encode_hunk).collect()));
            }
        },
        Operation::AtIndex(ops) => {
            let ops: Map<String, Value> =
                ops.iter().map(|(i, op)| (i.to_string(), encode(op))).collect();
            m.insert("ops".into(), Value::Object(ops));
        }
        Operation::Map(op) => {
            m.insert("op".into(), encode(op));
        }
        Operation::Put { key, value } => {
            m.insert("key".into(), json!(key));
            m.insert("value".into(), value.clone());
        }
        Operation::Rem { key } => {
            m.insert("key".into(), json!(key));
        }
        Operation::Apply(ops) => {
            let ops: Map<String, Value> =
                ops.iter().map(|(k, op)| (k.clone(), encode(op))).collect();
            m.insert("ops".into(), Value::Object(ops));
        }
        Operation::Copy(pairs) => {
            let pairs: Vec<Value> =
                pairs.iter().map(|(from, to)| json!([from, to])).collect();
            m.insert("pairs".into(), Value::Array(pairs));
        }
        Operation::Select(update) => {
            m.insert("selections".into(), encode_selections(update));
        }
        Operation::List(ops) => {
            m.insert("ops".into(), Value::Array(ops.iter().map(encode).collect()));
        }
    }
    Value::Object(m)
}

// ── Decoding ──────────────────────────────────────────────────────────────

fn field<'a>(obj: &'a Map<String, Value>, tag: OpTag, name: &str) -> OtResult<&'a Value> {
    obj.get(name)
        .ok_or_else(|| invalid(format!("{tag} requires '{name}'")))
}

fn decode_usize(v: &Value, name: &str) -> OtResult<usize> {
    v.as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| invalid(format!("{name} must be a non-negative integer")))
}

fn decode_str(v: &Value, name: &str) -> OtResult<String> {
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(format!("{name} must be a string")))
}

/// Object keys are strings; numbers are accepted and written in decimal.
fn decode_key(v: &Value) -> OtResult<String> {
    match v {
        Value::String(key) => Ok(key.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(invalid("key must be a string or a number")),
    }
}

fn decode_object<'a>(v: &'a Value, name: &str) -> OtResult<&'a Map<String, Value>> {
    v.as_object().ok_or_else(|| invalid(format!("{name} must be an object")))
}

fn decode_array<'a>(v: &'a Value, name: &str) -> OtResult<&'a Vec<Value>> {
    v.as_array().ok_or_else(|| invalid(format!("{name} must be an array")))
}

fn decode_hunk(v: &Value) -> OtResult<Hunk> {
    let obj = decode_object(v, "hunk")?;
    let get = |name: &str| obj.get(name).ok_or_else(|| invalid(format!("hunk requires '{name}'")));
    Hunk::new(
        decode_usize(get("index")?, "index")?,
        decode_usize(get("length")?, "length")?,
        get("value")?.clone(),
    )
}

fn decode_pair(v: &Value) -> OtResult<(String, String)> {
    match decode_array(v, "copy pair")?.as_slice() {
        [from, to] => Ok((decode_str(from, "from")?, decode_str(to, "to")?)),
        _ => Err(invalid("copy pair must be [from, to]")),
    }
}

fn decode_selections(v: &Value) -> OtResult<SelectionUpdate> {
    decode_object(v, "selections")?
        .iter()
        .map(|(id, range)| {
            let range = match range {
                Value::Null => None,
                range => Some(Range::from_json(range)?),
            };
            Ok((id.clone(), range))
        })
        .collect()
}

/// Decodes an operation, validating it the way the constructors do.
pub fn decode(v: &Value) -> OtResult<Operation> {
    let obj = decode_object(v, "operation")?;
    let name = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing 'type' field"))?;
    let tag = OpTag::parse(name).ok_or_else(|| OtError::UnknownVariant(name.to_string()))?;

    match tag {
        OpTag::NoOp => Ok(Operation::NoOp),
        OpTag::Set => Ok(Operation::set(field(obj, tag, "value")?.clone())),
        OpTag::Math => {
            let op = MathOp::parse(&decode_str(field(obj, tag, "op")?, "op")?)?;
            let operand = obj.get("value").cloned().unwrap_or(Value::Null);
            Operation::math(op, operand)
        }
        OpTag::Splice => match obj.get("hunks") {
            Some(hunks) => {
                let hunks = decode_array(hunks, "hunks")?
                    .iter()
                    .map(decode_hunk)
                    .collect::<OtResult<_>>()?;
                Operation::splice_hunks(hunks)
            }
            None => Operation::splice(
                decode_usize(field(obj, tag, "index")?, "index")?,
                decode_usize(field(obj, tag, "length")?, "length")?,
                field(obj, tag, "value")?.clone(),
            ),
        },
        OpTag::AtIndex => {
            let mut ops = BTreeMap::new();
            for (index, op) in decode_object(field(obj, tag, "ops")?, "ops")? {
                let index = index
                    .parse::<usize>()
                    .map_err(|_| invalid(format!("ATINDEX key {index:?} is not an index")))?;
                ops.insert(index, decode(op)?);
            }
            Ok(Operation::at_indices(ops))
        }
        OpTag::Map => Ok(Operation::map(decode(field(obj, tag, "op")?)?)),
        OpTag::Put => Ok(Operation::put(
            decode_key(field(obj, tag, "key")?)?,
            field(obj, tag, "value")?.clone(),
        )),
        OpTag::Rem => Ok(Operation::rem(decode_key(field(obj, tag, "key")?)?)),
        OpTag::Apply => {
            let ops = decode_object(field(obj, tag, "ops")?, "ops")?
                .iter()
                .map(|(key, op)| Ok((key.clone(), decode(op)?)))
                .collect::<OtResult<_>>()?;
            Ok(Operation::at_keys(ops))
        }
        OpTag::Copy => {
            let pairs = decode_array(field(obj, tag, "pairs")?, "pairs")?
                .iter()
                .map(decode_pair)
                .collect::<OtResult<_>>()?;
            Operation::copy(pairs)
        }
        OpTag::Select => {
            let selections = decode_selections(field(obj, tag, "selections")?)?;
            Ok(Operation::select_many(selections))
        }
        OpTag::List => {
            let ops = decode_array(field(obj, tag, "ops")?, "ops")?
                .iter()
                .map(decode)
                .collect::<OtResult<_>>()?;
            Ok(Operation::list(ops))
        }
    }
}
