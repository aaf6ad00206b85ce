//! SET and MATH helpers.

use serde_json::{Number, Value};

use super::Operation;
use crate::error::{invalid, mismatch, OtResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathOp {
    Add,
    Mult,
    And,
    Or,
    Xor,
    /// `[increment, modulus]`.
    Rot,
    Not,
}

impl MathOp {
    pub fn name(&self) -> &'static str {
        match self {
            MathOp::Add => "add",
            MathOp::Mult => "mult",
            MathOp::And => "and",
            MathOp::Or => "or",
            MathOp::Xor => "xor",
            MathOp::Rot => "rot",
            MathOp::Not => "not",
        }
    }

    pub fn parse(name: &str) -> OtResult<MathOp> {
        Ok(match name {
            "add" => MathOp::Add,
            "mult" => MathOp::Mult,
            "and" => MathOp::And,
            "or" => MathOp::Or,
            "xor" => MathOp::Xor,
            "rot" => MathOp::Rot,
            "not" => MathOp::Not,
            other => return Err(invalid(format!("unknown MATH operator {other:?}"))),
        })
    }
}

/// A MATH operator together with an operand it accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct MathEdit {
    op: MathOp,
    operand: Value,
}

impl MathEdit {
    pub fn new(op: MathOp, operand: Value) -> OtResult<Self> {
        validate_operand(op, &operand)?;
        Ok(MathEdit { op, operand })
    }

    pub fn op(&self) -> MathOp {
        self.op
    }

    pub fn operand(&self) -> &Value {
        &self.operand
    }

    pub(crate) fn apply(&self, doc: &Value) -> OtResult<Value> {
        apply_math(self.op, &self.operand, doc)
    }

    pub(crate) fn is_identity(&self) -> bool {
        is_identity(self.op, &self.operand)
    }
}

fn validate_operand(op: MathOp, operand: &Value) -> OtResult<()> {
    let ok = match op {
        MathOp::Add | MathOp::Mult => operand.is_number(),
        MathOp::And | MathOp::Or | MathOp::Xor => operand.is_boolean() || operand.is_i64(),
        MathOp::Rot => return rot_parts(operand).map(|_| ()),
        MathOp::Not => operand.is_null(),
    };
    if ok {
        Ok(())
    } else {
        Err(invalid(format!("bad operand {operand} for MATH {}", op.name())))
    }
}

fn rot_parts(operand: &Value) -> OtResult<(i64, i64)> {
    match operand.as_array().map(Vec::as_slice) {
        Some([inc, modulus]) => match (inc.as_i64(), modulus.as_i64()) {
            (Some(inc), Some(modulus)) if modulus > 0 => Ok((inc, modulus)),
            _ => Err(invalid("rot takes integers [increment, modulus] with a positive modulus")),
        },
        _ => Err(invalid("rot takes [increment, modulus]")),
    }
}

fn rot_value(inc: i64, modulus: i64) -> Value {
    Value::from(vec![inc.rem_euclid(modulus), modulus])
}

fn float(f: f64) -> OtResult<Value> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| mismatch("MATH produced a non-finite number"))
}

/// Integer arithmetic when both sides are integers and it fits, float
/// arithmetic otherwise.
fn arith(
    a: &Value,
    b: &Value,
    int: fn(i64, i64) -> Option<i64>,
    flt: fn(f64, f64) -> f64,
) -> OtResult<Value> {
    if let Some(n) = a.as_i64().zip(b.as_i64()).and_then(|(x, y)| int(x, y)) {
        return Ok(Value::from(n));
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => float(flt(x, y)),
        _ => Err(mismatch("MATH arithmetic needs numbers")),
    }
}

fn bitwise(op: MathOp, a: &Value, b: &Value) -> OtResult<Value> {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => Ok(Value::Bool(match op {
            MathOp::And => *x && *y,
            MathOp::Or => *x || *y,
            _ => x ^ y,
        })),
        _ => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => Ok(Value::from(match op {
                MathOp::And => x & y,
                MathOp::Or => x | y,
                _ => x ^ y,
            })),
            _ => Err(mismatch(format!("MATH {} needs two booleans or two integers", op.name()))),
        },
    }
}

fn apply_math(op: MathOp, operand: &Value, doc: &Value) -> OtResult<Value> {
    match op {
        MathOp::Add => arith(doc, operand, i64::checked_add, |x, y| x + y),
        MathOp::Mult => arith(doc, operand, i64::checked_mul, |x, y| x * y),
        MathOp::And | MathOp::Or | MathOp::Xor => bitwise(op, doc, operand),
        MathOp::Rot => {
            let (inc, modulus) = rot_parts(operand)?;
            let x = doc.as_i64().ok_or_else(|| mismatch("MATH rot needs an integer"))?;
            let rotated = (i128::from(x) + i128::from(inc)).rem_euclid(i128::from(modulus));
            Ok(Value::from(rotated as i64))
        }
        MathOp::Not => match doc {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            _ => doc
                .as_i64()
                .map(|x| Value::from(!x))
                .ok_or_else(|| mismatch("MATH not needs a boolean or an integer")),
        },
    }
}

/// Operand for which the operator leaves every value unchanged.
fn is_identity(op: MathOp, operand: &Value) -> bool {
    match op {
        MathOp::Add => operand.as_f64() == Some(0.0),
        MathOp::Mult => operand.as_f64() == Some(1.0),
        MathOp::And => operand == &Value::Bool(true) || operand.as_i64() == Some(-1),
        MathOp::Or | MathOp::Xor => operand == &Value::Bool(false) || operand.as_i64() == Some(0),
        MathOp::Rot => rot_parts(operand).is_ok_and(|(inc, modulus)| inc.rem_euclid(modulus) == 0),
        MathOp::Not => false,
    }
}

/// Same-operator composition.
pub(crate) fn compose_math(first: &MathEdit, second: &MathEdit) -> Option<Operation> {
    let (a, x, y) = (first.op, &first.operand, &second.operand);
    if a != second.op {
        return None;
    }
    let operand = match a {
        MathOp::Add => arith(x, y, i64::checked_add, |x, y| x + y).ok()?,
        MathOp::Mult => arith(x, y, i64::checked_mul, |x, y| x * y).ok()?,
        MathOp::And | MathOp::Or | MathOp::Xor => bitwise(a, x, y).ok()?,
        MathOp::Rot => {
            let ((i, m), (j, n)) = (rot_parts(x).ok()?, rot_parts(y).ok()?);
            if m != n {
                return None;
            }
            rot_value(i.checked_add(j)?, m)
        }
        MathOp::Not => return Some(Operation::NoOp),
    };
    Some(Operation::Math(MathEdit { op: a, operand }))
}

/// Whether applying the two in either order gives the same result.
pub(crate) fn commutes(a: &MathEdit, b: &MathEdit) -> bool {
    match (a.op, b.op) {
        (MathOp::Rot, MathOp::Rot) => {
            matches!(
                (rot_parts(&a.operand), rot_parts(&b.operand)),
                (Ok((_, m)), Ok((_, n))) if m == n
            )
        }
        (MathOp::Xor | MathOp::Not, MathOp::Xor | MathOp::Not) => true,
        (x, y) => x == y,
    }
}

/// The MATH undoing `edit` on any value, when one exists.
fn exact_inverse(edit: &MathEdit) -> Option<MathEdit> {
    let operand = match edit.op {
        MathOp::Add => Value::from(edit.operand.as_i64()?.checked_neg()?),
        MathOp::Xor | MathOp::Not => edit.operand.clone(),
        MathOp::Mult if matches!(edit.operand.as_i64(), Some(1 | -1)) => edit.operand.clone(),
        _ => return None,
    };
    Some(MathEdit { op: edit.op, operand })
}

/// Whether the result of `edit` no longer depends on its input.
fn is_constant(edit: &MathEdit) -> bool {
    match edit.op {
        MathOp::Mult => edit.operand.as_f64() == Some(0.0),
        MathOp::And => edit.operand == Value::Bool(false) || edit.operand.as_i64() == Some(0),
        MathOp::Or => edit.operand == Value::Bool(true) || edit.operand.as_i64() == Some(-1),
        _ => false,
    }
}

/// Rewrites `first` so that, applied after `second`, it leaves the value
/// `second` would have left had it run after `first`.
///
/// `second` passes through unchanged. `None` when no such rewrite is
/// known without looking at the value.
pub(crate) fn replay_under(first: &MathEdit, second: &MathEdit) -> Option<Operation> {
    let (f, s) = (first.op, second.op);
    let lattice = |op: MathOp| matches!(op, MathOp::And | MathOp::Or);
    let undo_then_replay = |undo: MathEdit| {
        vec![
            Operation::Math(undo),
            Operation::Math(first.clone()),
            Operation::Math(second.clone()),
        ]
    };
    let steps = if let Some(undo) = exact_inverse(second) {
        undo_then_replay(undo)
    } else if (f == MathOp::Add || f == MathOp::Mult) && s == MathOp::Rot {
        // Rot only loses multiples of its modulus, which add and mult keep.
        let (inc, modulus) = rot_parts(&second.operand).ok()?;
        let operand = rot_value(modulus - inc.rem_euclid(modulus), modulus);
        undo_then_replay(MathEdit { op: MathOp::Rot, operand })
    } else if (lattice(f) && lattice(s)) || is_constant(first) || is_constant(second) {
        // second(first(second(x))) == second(first(x)) for these.
        vec![Operation::Math(first.clone()), Operation::Math(second.clone())]
    } else {
        return None;
    };
    Some(Operation::List(steps))
}

pub(crate) fn invert_math(edit: &MathEdit, doc: &Value) -> OtResult<Operation> {
    let op = edit.op;
    Ok(match op {
        MathOp::Add => {
            let operand = &edit.operand;
            let negated = match operand.as_i64().and_then(i64::checked_neg) {
                Some(n) => Value::from(n),
                None => {
                    let n = operand.as_f64().ok_or_else(|| mismatch("MATH add needs a number"))?;
                    float(-n)?
                }
            };
            Operation::Math(MathEdit { op, operand: negated })
        }
        MathOp::Rot => {
            let (inc, modulus) = rot_parts(&edit.operand)?;
            let operand = rot_value(modulus - inc.rem_euclid(modulus), modulus);
            Operation::Math(MathEdit { op, operand })
        }
        MathOp::Xor | MathOp::Not => Operation::Math(edit.clone()),
        MathOp::Mult if matches!(edit.operand.as_i64(), Some(1 | -1)) => {
            Operation::Math(edit.clone())
        }
        // Lossy operators restore the old value outright.
        MathOp::Mult | MathOp::And | MathOp::Or => Operation::Set(doc.clone()),
    })
}
