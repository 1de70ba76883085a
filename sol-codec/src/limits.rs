use crate::errors::DecodeError;
use crate::types::{ClassDefinition, Element, Value};
use nom::Err;

/// Deepest nesting of values a decoder will follow
pub(crate) const MAX_DEPTH: usize = 256;

/// Rough in-memory cost of one decoded value, strings and byte payloads are charged on top
const NODE_COST: usize = 32;

/// Each input byte may expand to this many bytes of copied values
const EXPANSION_FACTOR: usize = 128;

/// Inputs shorter than this get the budget of an input of this length
const MIN_BUDGET_INPUT: usize = 1 << 16;

type LimitResult<'a> = Result<(), Err<DecodeError<'a>>>;

/// Nesting depth and back-reference expansion budget shared by the decoders of one input
///
/// Resolving a reference copies the referenced value, so references to values that contain references
/// can describe data far larger than the input. Every copy is charged against `budget`.
#[derive(Clone, Debug)]
pub(crate) struct DecodeLimits {
    depth: usize,
    budget: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self::for_input(0)
    }
}

impl DecodeLimits {
    /// Limits for decoding `input_len` bytes
    pub(crate) fn for_input(input_len: usize) -> Self {
        Self {
            depth: 0,
            budget: input_len
                .max(MIN_BUDGET_INPUT)
                .saturating_mul(EXPANSION_FACTOR),
        }
    }

    /// Step into a value, failing at `i` once `MAX_DEPTH` values are open
    pub(crate) fn enter<'a>(&mut self, i: &'a [u8]) -> LimitResult<'a> {
        if self.depth >= MAX_DEPTH {
            return Err(Err::Error(DecodeError::Format(
                i,
                format!("values are nested more than {} deep", MAX_DEPTH),
            )));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Charge a copy of `value` made while resolving the reference at `i`
    pub(crate) fn charge<'a>(&mut self, i: &'a [u8], value: &Value) -> LimitResult<'a> {
        let mut size = 0;
        value_size(value, &mut size, self.budget);
        self.spend(i, size)
    }

    /// Charge a copy of a class definition taken from the trait table
    pub(crate) fn charge_class<'a>(
        &mut self,
        i: &'a [u8],
        class_def: &ClassDefinition,
    ) -> LimitResult<'a> {
        self.spend(i, class_size(class_def))
    }

    /// Charge `size` bytes copied for the reference at `i`
    pub(crate) fn spend<'a>(&mut self, i: &'a [u8], size: usize) -> LimitResult<'a> {
        match self.budget.checked_sub(size) {
            Some(left) => {
                self.budget = left;
                Ok(())
            }
            None => Err(Err::Error(DecodeError::Format(
                i,
                "back-references expand to more data than the input can describe".to_string(),
            ))),
        }
    }
}

fn class_size(class_def: &ClassDefinition) -> usize {
    class_def
        .static_properties
        .iter()
        .fold(NODE_COST + class_def.name.len(), |acc, name| {
            acc + NODE_COST + name.len()
        })
}

fn members_size(members: &[Element], total: &mut usize, limit: usize) {
    for member in members {
        *total += member.name.len();
        value_size(&member.value, total, limit);
    }
}

/// Add the approximate size of `value` to `total`, stopping early once `total` passes `limit`
fn value_size(value: &Value, total: &mut usize, limit: usize) {
    if *total > limit {
        return;
    }
    *total += NODE_COST;

    match value {
        Value::String(s) | Value::XML(s, _) => *total += s.len(),
        Value::Unsupported(bytes) | Value::ByteArray(bytes) => *total += bytes.len(),
        Value::VectorInt(items, _) => *total += items.len() * 4,
        Value::VectorUInt(items, _) => *total += items.len() * 4,
        Value::VectorDouble(items, _) => *total += items.len() * 8,
        Value::AMF3(inner) => value_size(inner, total, limit),
        Value::Object(members, class_def) => {
            if let Some(class_def) = class_def {
                *total += class_size(class_def);
            }
            members_size(members, total, limit);
        }
        Value::ECMAArray(dense, assoc, _) => {
            for item in dense {
                value_size(item, total, limit);
            }
            members_size(assoc, total, limit);
        }
        Value::StrictArray(items) => {
            for item in items {
                value_size(item, total, limit);
            }
        }
        Value::VectorObject(items, name, _) => {
            *total += name.len();
            for item in items {
                value_size(item, total, limit);
            }
        }
        Value::Dictionary(pairs, _) => {
            for (key, value) in pairs {
                value_size(key, total, limit);
                value_size(value, total, limit);
            }
        }
        Value::Number(_)
        | Value::Bool(_)
        | Value::Null
        | Value::Undefined
        | Value::Date(_, _)
        | Value::Integer(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn depth_is_bounded() {
        let mut limits = DecodeLimits::default();
        for _ in 0..MAX_DEPTH {
            assert!(limits.enter(&[]).is_ok());
        }
        assert!(matches!(
            limits.enter(&[]),
            Err(Err::Error(DecodeError::Format(_, _)))
        ));

        limits.leave();
        assert!(limits.enter(&[]).is_ok());
    }

    #[test]
    fn copies_use_up_the_budget() {
        let mut limits = DecodeLimits::for_input(0);
        let big = Value::String("x".repeat(1 << 20));

        let mut copies = 0;
        while limits.charge(&[], &big).is_ok() {
            copies += 1;
        }
        assert_eq!(copies, MIN_BUDGET_INPUT * EXPANSION_FACTOR / ((1 << 20) + NODE_COST));
    }

    #[test]
    fn larger_inputs_get_larger_budgets() {
        let small = DecodeLimits::for_input(10);
        let large = DecodeLimits::for_input(MIN_BUDGET_INPUT * 4);
        assert_eq!(small.budget, MIN_BUDGET_INPUT * EXPANSION_FACTOR);
        assert_eq!(large.budget, small.budget * 4);
    }

    #[test]
    fn nested_values_are_measured() {
        let value = Value::StrictArray(vec![
            Value::String("abc".to_string()),
            Value::object(vec![Element::new("k", Value::Null)]),
        ]);
        let mut size = 0;
        value_size(&value, &mut size, usize::MAX);
        assert_eq!(size, NODE_COST * 4 + 3 + 1);
    }
}
