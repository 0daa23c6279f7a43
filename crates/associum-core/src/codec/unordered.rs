use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use crate::codec::{decode_parts, intern_parts, probe_parts, KeyCodec};
use crate::config::AssocConfig;
use crate::error::AssocResult;
use crate::interner::Interner;
use crate::keylet::Composite;

/// Tuple keys where position is irrelevant: every permutation of the same
/// parts is the same key. Repeated parts keep their multiplicity, so
/// `[a, a, b]` and `[a, b]` stay distinct.
///
/// Composites hold their keylets sorted by identifier, which means decoded
/// keys come back in keylet issue order rather than in the caller's order.
pub struct Unordered<T>(PhantomData<fn() -> T>);

impl<T> Default for Unordered<T> {
    fn default() -> Self {
        Unordered(PhantomData)
    }
}

impl<T> fmt::Debug for Unordered<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unordered")
    }
}

impl<T> KeyCodec for Unordered<T>
where
    T: Eq + Hash + Clone,
{
    type Part = T;
    type KeyRef = [T];
    type Key = Vec<T>;

    fn encode_for_insert(&self, key: &[T], interner: &mut Interner<T>, config: &AssocConfig) -> AssocResult<Composite> {
        config.check_arity(key.len())?;
        let mut composite = Composite::from_keylets(intern_parts(key, interner)?);
        composite.sort();
        Ok(composite)
    }

    fn encode_for_probe(&self, key: &[T], interner: &Interner<T>) -> Option<Composite> {
        let mut composite = Composite::from_keylets(probe_parts(key, interner)?);
        composite.sort();
        Some(composite)
    }

    fn decode(&self, composite: &Composite, interner: &Interner<T>) -> Vec<T> {
        decode_parts(composite, interner)
    }
}
