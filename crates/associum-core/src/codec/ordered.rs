use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use crate::codec::{decode_parts, intern_parts, normalize_positions, probe_parts, KeyCodec, KeyletTemplate, PositionalCodec};
use crate::config::AssocConfig;
use crate::error::AssocResult;
use crate::interner::Interner;
use crate::keylet::Composite;

/// Tuple keys where position matters: `[a, b]` and `[b, a]` are different
/// keys, and a key only matches keys of the same arity.
pub struct Ordered<T>(PhantomData<fn() -> T>);

impl<T> Default for Ordered<T> {
    fn default() -> Self {
        Ordered(PhantomData)
    }
}

impl<T> fmt::Debug for Ordered<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Ordered")
    }
}

impl<T> KeyCodec for Ordered<T>
where
    T: Eq + Hash + Clone,
{
    type Part = T;
    type KeyRef = [T];
    type Key = Vec<T>;

    fn encode_for_insert(&self, key: &[T], interner: &mut Interner<T>, config: &AssocConfig) -> AssocResult<Composite> {
        config.check_arity(key.len())?;
        Ok(Composite::from_keylets(intern_parts(key, interner)?))
    }

    fn encode_for_probe(&self, key: &[T], interner: &Interner<T>) -> Option<Composite> {
        probe_parts(key, interner).map(Composite::from_keylets)
    }

    fn decode(&self, composite: &Composite, interner: &Interner<T>) -> Vec<T> {
        decode_parts(composite, interner)
    }
}

impl<T> PositionalCodec for Ordered<T>
where
    T: Eq + Hash + Clone,
{
    /// `None` marks a wildcard position.
    type Template = [Option<T>];

    fn normalize_query(&self, template: &[Option<T>], interner: &Interner<T>) -> Option<KeyletTemplate> {
        normalize_positions(template, interner)
    }
}
