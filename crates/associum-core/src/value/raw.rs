use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;
use std::iter;
use std::marker::PhantomData;

use crate::config::AssocConfig;
use crate::error::AssocResult;
use crate::interner::Interner;
use crate::keylet::Keylet;
use crate::value::{ElementLayout, ValueLayout};

/// Values stored as given. Nothing is interned, so values need not be
/// hashable and cannot be queried.
pub struct Raw<V>(PhantomData<fn() -> V>);

impl<V> fmt::Debug for Raw<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Raw")
    }
}

impl<V> ValueLayout for Raw<V> {
    type Input = V;
    type Element = Infallible;
    type Stored = V;
    type Output<'a> = &'a V where Self: 'a;
    type Elements<'a> = iter::Empty<Keylet> where Self: 'a;

    fn encode(input: V, _interner: &mut Interner<Infallible>, _config: &AssocConfig) -> AssocResult<V> {
        Ok(input)
    }

    fn decode<'a>(stored: &'a V, _interner: &'a Interner<Infallible>) -> &'a V
    where
        Self: 'a,
    {
        stored
    }

    fn elements<'a>(_stored: &'a V) -> iter::Empty<Keylet>
    where
        Self: 'a,
    {
        iter::empty()
    }
}

/// Scalar values interned through the value interner. Equal values share
/// one keylet and can be found with `query_values_containing`.
pub struct Interned<V>(PhantomData<fn() -> V>);

impl<V> fmt::Debug for Interned<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Interned")
    }
}

impl<V> ValueLayout for Interned<V>
where
    V: Eq + Hash + Clone,
{
    type Input = V;
    type Element = V;
    type Stored = Keylet;
    type Output<'a> = &'a V where Self: 'a;
    type Elements<'a> = iter::Once<Keylet> where Self: 'a;

    fn encode(input: V, interner: &mut Interner<V>, _config: &AssocConfig) -> AssocResult<Keylet> {
        interner.intern(&input)
    }

    fn decode<'a>(stored: &'a Keylet, interner: &'a Interner<V>) -> &'a V
    where
        Self: 'a,
    {
        interner.resolve(*stored)
    }

    fn elements<'a>(stored: &'a Keylet) -> iter::Once<Keylet>
    where
        Self: 'a,
    {
        iter::once(*stored)
    }
}

impl<V> ElementLayout for Interned<V> where V: Eq + Hash + Clone {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_passes_through() {
        let mut interner = Interner::new();
        let stored = Raw::<Vec<f64>>::encode(vec![1.5], &mut interner, &AssocConfig::default()).unwrap();
        assert_eq!(Raw::<Vec<f64>>::decode(&stored, &interner), &vec![1.5]);
        assert_eq!(Raw::<Vec<f64>>::elements(&stored).count(), 0);
        assert!(interner.is_empty());
    }

    #[test]
    fn test_interned_shares_keylets() {
        let mut interner = Interner::new();
        let config = AssocConfig::default();
        let a = Interned::<&str>::encode("v", &mut interner, &config).unwrap();
        let b = Interned::<&str>::encode("v", &mut interner, &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(*Interned::<&str>::decode(&a, &interner), "v");
        assert_eq!(Interned::<&str>::elements(&a).collect::<Vec<_>>(), vec![a]);
    }
}
