use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use crate::codec::KeyCodec;
use crate::config::AssocConfig;
use crate::error::AssocResult;
use crate::interner::Interner;
use crate::keylet::Composite;

/// Single-value keys. Useful when only the value side is structured, e.g.
/// an array-valued map keyed by a name.
pub struct Scalar<T>(PhantomData<fn() -> T>);

impl<T> Default for Scalar<T> {
    fn default() -> Self {
        Scalar(PhantomData)
    }
}

impl<T> fmt::Debug for Scalar<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Scalar")
    }
}

impl<T> KeyCodec for Scalar<T>
where
    T: Eq + Hash + Clone,
{
    type Part = T;
    type KeyRef = T;
    type Key = T;

    fn encode_for_insert(&self, key: &T, interner: &mut Interner<T>, _config: &AssocConfig) -> AssocResult<Composite> {
        Ok(Composite::from_keylets([interner.intern(key)?]))
    }

    fn encode_for_probe(&self, key: &T, interner: &Interner<T>) -> Option<Composite> {
        interner.lookup(key).map(|keylet| Composite::from_keylets([keylet]))
    }

    fn decode(&self, composite: &Composite, interner: &Interner<T>) -> T {
        match composite.slot(0) {
            Some(keylet) => interner.resolve(keylet).clone(),
            None => unreachable!("scalar composite without a keylet"),
        }
    }
}
