use crate::types::{ClassDefinition, Element, Value};
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Values that can be looked up in an `ElementCache`
///
/// Values equal under `PartialEq` must feed the same data to the hasher
pub(crate) trait CacheKey: PartialEq {
    fn cache_hash<H: Hasher>(&self, state: &mut H);
}

impl CacheKey for ClassDefinition {
    fn cache_hash<H: Hasher>(&self, state: &mut H) {
        self.hash(state);
    }
}

impl CacheKey for &Value {
    fn cache_hash<H: Hasher>(&self, state: &mut H) {
        hash_value(self, state);
    }
}

/// `0.0 == -0.0`, so both hash as zero
fn hash_f64<H: Hasher>(n: f64, state: &mut H) {
    let bits = if n == 0.0 { 0 } else { n.to_bits() };
    bits.hash(state);
}

fn hash_members<H: Hasher>(members: &[Element], state: &mut H) {
    members.len().hash(state);
    for member in members {
        member.name.hash(state);
        hash_value(&member.value, state);
    }
}

fn hash_values<H: Hasher>(items: &[Value], state: &mut H) {
    items.len().hash(state);
    for item in items {
        hash_value(item, state);
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    std::mem::discriminant(value).hash(state);
    match value {
        Value::Number(n) => hash_f64(*n, state),
        Value::Bool(b) => b.hash(state),
        Value::String(s) => s.hash(state),
        Value::Object(members, class_def) => {
            class_def.hash(state);
            hash_members(members, state);
        }
        Value::Null | Value::Undefined => {}
        Value::ECMAArray(dense, assoc, length) => {
            hash_values(dense, state);
            hash_members(assoc, state);
            length.hash(state);
        }
        Value::StrictArray(items) => hash_values(items, state),
        Value::Date(millis, time_zone) => {
            hash_f64(*millis, state);
            time_zone.hash(state);
        }
        Value::Unsupported(bytes) | Value::ByteArray(bytes) => bytes.hash(state),
        Value::XML(content, e4x) => {
            content.hash(state);
            e4x.hash(state);
        }
        Value::AMF3(inner) => hash_value(inner, state),
        Value::Integer(n) => n.hash(state),
        Value::VectorInt(items, fixed) => {
            items.hash(state);
            fixed.hash(state);
        }
        Value::VectorUInt(items, fixed) => {
            items.hash(state);
            fixed.hash(state);
        }
        Value::VectorDouble(items, fixed) => {
            items.len().hash(state);
            for item in items {
                hash_f64(*item, state);
            }
            fixed.hash(state);
        }
        Value::VectorObject(items, type_name, fixed) => {
            hash_values(items, state);
            type_name.hash(state);
            fixed.hash(state);
        }
        Value::Dictionary(pairs, weak_keys) => {
            pairs.len().hash(state);
            for (key, value) in pairs {
                hash_value(key, state);
                hash_value(value, state);
            }
            weak_keys.hash(state);
        }
    }
}

fn key_of<T: CacheKey>(val: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    val.cache_hash(&mut hasher);
    hasher.finish()
}

/// First-occurrence table used by the encoders to find values that can be written as back-references
///
/// Lookups compare values structurally, so two equal values built separately share an entry
#[derive(Clone, Debug)]
pub(crate) struct ElementCache<T> {
    cache: Vec<T>,

    /// Indices into `cache` by hash
    buckets: HashMap<u64, Vec<usize>>,
}

impl<T> Default for ElementCache<T> {
    fn default() -> Self {
        ElementCache {
            cache: Vec::new(),
            buckets: HashMap::new(),
        }
    }
}

impl<T: CacheKey> ElementCache<T> {
    fn find(&self, key: u64, val: &T) -> Option<usize> {
        self.buckets
            .get(&key)?
            .iter()
            .copied()
            .find(|&index| self.cache.get(index) == Some(val))
    }

    fn insert(&mut self, key: u64, val: T) -> usize {
        let index = self.cache.len();
        self.cache.push(val);
        self.buckets.entry(key).or_default().push(index);
        index
    }

    /// Retrieve the index for the given value
    #[inline]
    pub(crate) fn get_index(&self, val: &T) -> Option<usize> {
        self.find(key_of(val), val)
    }

    /// Add the given item to the end of the table, returning its index
    #[inline]
    pub(crate) fn store(&mut self, val: T) -> usize {
        let key = key_of(&val);
        self.insert(key, val)
    }

    /// The index of `val` if it has been seen before, otherwise store it and return `None`
    pub(crate) fn lookup_or_store(&mut self, val: T) -> Option<usize> {
        let key = key_of(&val);
        match self.find(key, &val) {
            Some(index) => Some(index),
            None => {
                self.insert(key, val);
                None
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn equal_values_share_an_entry() {
        let a = Value::StrictArray(vec![Value::Number(1.0), Value::Number(2.0)]);
        let b = Value::StrictArray(vec![Value::Number(3.0)]);
        let a_again = a.clone();

        let mut cache = ElementCache::default();
        assert_eq!(cache.lookup_or_store(&a), None);
        assert_eq!(cache.lookup_or_store(&b), None);
        assert_eq!(cache.lookup_or_store(&a_again), Some(0));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn signed_zeros_share_an_entry() {
        let positive = Value::Date(0.0, None);
        let negative = Value::Date(-0.0, None);

        let mut cache = ElementCache::default();
        cache.store(&positive);
        assert_eq!(cache.get_index(&&negative), Some(0));
    }

    #[test]
    fn nan_never_matches() {
        let nan = Value::StrictArray(vec![Value::Number(f64::NAN)]);

        let mut cache = ElementCache::default();
        assert_eq!(cache.lookup_or_store(&nan), None);
        assert_eq!(cache.lookup_or_store(&nan), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn store_keeps_duplicates() {
        let a = Value::object(vec![]);

        let mut cache = ElementCache::default();
        assert_eq!(cache.store(&a), 0);
        assert_eq!(cache.store(&a), 1);
        assert_eq!(cache.get_index(&&a), Some(0));
    }

    #[test]
    fn class_definitions() {
        let mut cache = ElementCache::default();
        assert_eq!(cache.lookup_or_store(ClassDefinition::default_with_name("A")), None);
        assert_eq!(cache.lookup_or_store(ClassDefinition::default()), None);
        assert_eq!(
            cache.lookup_or_store(ClassDefinition::default_with_name("A")),
            Some(0)
        );
    }
}
