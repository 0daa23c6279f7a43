use std::fmt;
use std::hash::Hash;
use std::iter;
use std::marker::PhantomData;

use indexmap::{set, IndexSet};

use crate::codec::{intern_parts, KeyCodec};
use crate::config::AssocConfig;
use crate::container::AssocMap;
use crate::error::AssocResult;
use crate::index::KeyIndexing;
use crate::interner::Interner;
use crate::keylet::Keylet;
use crate::value::{ElementLayout, ValueIndexing, ValueLayout};

/// Set values: distinct interned elements in insertion order.
pub struct SetValued<E>(PhantomData<fn() -> E>);

impl<E> fmt::Debug for SetValued<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SetValued")
    }
}

impl<E> ValueLayout for SetValued<E>
where
    E: Eq + Hash + Clone,
{
    type Input = Vec<E>;
    type Element = E;
    type Stored = IndexSet<Keylet>;
    type Output<'a> = IndexSet<E> where Self: 'a;
    type Elements<'a> = iter::Copied<set::Iter<'a, Keylet>> where Self: 'a;

    fn encode(input: Vec<E>, interner: &mut Interner<E>, config: &AssocConfig) -> AssocResult<IndexSet<Keylet>> {
        let keylets: IndexSet<Keylet> = intern_parts(&input, interner)?.into_iter().collect();
        if let Err(err) = config.check_collection_len(keylets.len()) {
            interner.forget_unbound(keylets);
            return Err(err);
        }
        Ok(keylets)
    }

    fn decode<'a>(stored: &'a IndexSet<Keylet>, interner: &'a Interner<E>) -> IndexSet<E>
    where
        Self: 'a,
    {
        stored.iter().map(|&keylet| interner.resolve(keylet).clone()).collect()
    }

    fn elements<'a>(stored: &'a IndexSet<Keylet>) -> Self::Elements<'a>
    where
        Self: 'a,
    {
        stored.iter().copied()
    }
}

impl<E> ElementLayout for SetValued<E> where E: Eq + Hash + Clone {}

impl<C, E, KQ, VQ> AssocMap<C, SetValued<E>, KQ, VQ>
where
    C: KeyCodec,
    E: Eq + Hash + Clone,
    KQ: KeyIndexing,
    VQ: ValueIndexing,
{
    /// Add `item`, creating the entry when absent. `false` when the set
    /// already held it.
    pub fn add_to_set(&mut self, key: &C::KeyRef, item: &E) -> AssocResult<bool> {
        let (composite, added) = self.stage_update(key, |current, interner, config| {
            let keylet = interner.intern(item)?;
            if current.is_some_and(|set| set.contains(&keylet)) {
                return Ok(None);
            }
            if let Err(err) = config.check_collection_len(current.map_or(0, |set| set.len()) + 1) {
                interner.forget_unbound([keylet]);
                return Err(err);
            }
            Ok(Some(keylet))
        })?;
        let Some(keylet) = added else {
            return Ok(false);
        };
        self.values.bind(&composite, [keylet]);
        self.stored_or_insert(&composite, IndexSet::new).insert(keylet);
        Ok(true)
    }

    /// Add every item. Returns how many were not already present. Items
    /// added before a failure stay added.
    pub fn fill_set(&mut self, key: &C::KeyRef, items: &[E]) -> AssocResult<usize> {
        let mut added = 0;
        for item in items {
            if self.add_to_set(key, item)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Remove `item`. `false` when it was not in the set.
    pub fn delete_from_set(&mut self, key: &C::KeyRef, item: &E) -> bool {
        let Some(composite) = self.codec.encode_for_probe(key, &self.keys) else {
            return false;
        };
        let Some(target) = self.values.interner.lookup(item) else {
            return false;
        };
        let removed = self
            .entries
            .get_mut(&composite)
            .is_some_and(|set| set.shift_remove(&target));
        if removed {
            self.values.release(&composite, [target]);
        }
        removed
    }

    pub fn has_in_set(&self, key: &C::KeyRef, item: &E) -> bool {
        let Some(target) = self.values.interner.lookup(item) else {
            return false;
        };
        self.stored(key).is_some_and(|set| set.contains(&target))
    }

    /// Empty the set under `key`, keeping the (now empty) entry. Returns the
    /// number of elements removed.
    pub fn clear_set(&mut self, key: &C::KeyRef) -> usize {
        let Some(composite) = self.codec.encode_for_probe(key, &self.keys) else {
            return 0;
        };
        let Some(set) = self.entries.get_mut(&composite) else {
            return 0;
        };
        let drained: Vec<Keylet> = set.drain(..).collect();
        let count = drained.len();
        self.values.release(&composite, drained);
        count
    }

    /// Number of elements, `None` when the entry is absent.
    pub fn size_of_set(&self, key: &C::KeyRef) -> Option<usize> {
        self.stored(key).map(|set| set.len())
    }
}
