use std::fmt;
use std::hash::Hash;
use std::iter;
use std::marker::PhantomData;
use std::slice;

use crate::codec::{intern_parts, KeyCodec};
use crate::config::AssocConfig;
use crate::container::{AssocMap, QueryResult};
use crate::error::AssocResult;
use crate::index::KeyIndexing;
use crate::interner::Interner;
use crate::keylet::Keylet;
use crate::value::{ElementLayout, QueryableValues, ValueIndexing, ValueLayout};

/// Which occurrences of an element [`AssocMap::purge`] removes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Occurrence {
    First,
    Last,
    All,
}

/// Array values: an ordered sequence of interned elements, duplicates
/// allowed. Each occurrence holds its own reference on the element keylet.
pub struct ArrayValued<E>(PhantomData<fn() -> E>);

impl<E> fmt::Debug for ArrayValued<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ArrayValued")
    }
}

impl<E> ValueLayout for ArrayValued<E>
where
    E: Eq + Hash + Clone,
{
    type Input = Vec<E>;
    type Element = E;
    type Stored = Vec<Keylet>;
    type Output<'a> = Vec<E> where Self: 'a;
    type Elements<'a> = iter::Copied<slice::Iter<'a, Keylet>> where Self: 'a;

    fn encode(input: Vec<E>, interner: &mut Interner<E>, config: &AssocConfig) -> AssocResult<Vec<Keylet>> {
        config.check_collection_len(input.len())?;
        intern_parts(&input, interner)
    }

    fn decode<'a>(stored: &'a Vec<Keylet>, interner: &'a Interner<E>) -> Vec<E>
    where
        Self: 'a,
    {
        stored.iter().map(|&keylet| interner.resolve(keylet).clone()).collect()
    }

    fn elements<'a>(stored: &'a Vec<Keylet>) -> Self::Elements<'a>
    where
        Self: 'a,
    {
        stored.iter().copied()
    }
}

impl<E> ElementLayout for ArrayValued<E> where E: Eq + Hash + Clone {}

impl<C, E, KQ, VQ> AssocMap<C, ArrayValued<E>, KQ, VQ>
where
    C: KeyCodec,
    E: Eq + Hash + Clone,
    KQ: KeyIndexing,
    VQ: ValueIndexing,
{
    /// Append items, creating the entry when absent. Returns the new length.
    pub fn push(&mut self, key: &C::KeyRef, items: &[E]) -> AssocResult<usize> {
        let (composite, added) = self.stage_update(key, |current, interner, config| {
            config.check_collection_len(current.map_or(0, |array| array.len()) + items.len())?;
            intern_parts(items, interner)
        })?;
        self.values.bind(&composite, added.iter().copied());
        let array = self.stored_or_insert(&composite, Vec::new);
        array.extend(added);
        Ok(array.len())
    }

    /// Prepend items, keeping their order, creating the entry when absent.
    /// Returns the new length.
    pub fn unshift(&mut self, key: &C::KeyRef, items: &[E]) -> AssocResult<usize> {
        let (composite, added) = self.stage_update(key, |current, interner, config| {
            config.check_collection_len(current.map_or(0, |array| array.len()) + items.len())?;
            intern_parts(items, interner)
        })?;
        self.values.bind(&composite, added.iter().copied());
        let array = self.stored_or_insert(&composite, Vec::new);
        array.splice(0..0, added);
        Ok(array.len())
    }

    /// Remove and return the last element.
    pub fn pop(&mut self, key: &C::KeyRef) -> Option<E> {
        let composite = self.codec.encode_for_probe(key, &self.keys)?;
        let keylet = self.entries.get_mut(&composite)?.pop()?;
        let item = self.values.interner.resolve(keylet).clone();
        self.values.release(&composite, [keylet]);
        Some(item)
    }

    /// Remove and return the first element.
    pub fn shift(&mut self, key: &C::KeyRef) -> Option<E> {
        let composite = self.codec.encode_for_probe(key, &self.keys)?;
        let array = self.entries.get_mut(&composite)?;
        if array.is_empty() {
            return None;
        }
        let keylet = array.remove(0);
        let item = self.values.interner.resolve(keylet).clone();
        self.values.release(&composite, [keylet]);
        Some(item)
    }

    /// Remove `delete_count` elements starting at `start` and insert `items`
    /// in their place. Both bounds are clamped to the array. Returns the
    /// removed elements; an absent entry is left absent.
    pub fn splice(&mut self, key: &C::KeyRef, start: usize, delete_count: usize, items: &[E]) -> AssocResult<Vec<E>> {
        let Some(composite) = self.codec.encode_for_probe(key, &self.keys) else {
            return Ok(Vec::new());
        };
        let Some(array) = self.entries.get_mut(&composite) else {
            return Ok(Vec::new());
        };

        let start = start.min(array.len());
        let end = start + delete_count.min(array.len() - start);
        self.config.check_collection_len(array.len() - (end - start) + items.len())?;
        let added = intern_parts(items, &mut self.values.interner)?;

        let removed: Vec<Keylet> = array.splice(start..end, added.iter().copied()).collect();
        self.values.bind(&composite, added);
        let removed_items = removed
            .iter()
            .map(|&keylet| self.values.interner.resolve(keylet).clone())
            .collect();
        self.values.release(&composite, removed);
        Ok(removed_items)
    }

    /// Remove the first, last or every occurrence of `item`. Returns whether
    /// anything was removed.
    pub fn purge(&mut self, key: &C::KeyRef, item: &E, occurrence: Occurrence) -> bool {
        let Some(composite) = self.codec.encode_for_probe(key, &self.keys) else {
            return false;
        };
        let Some(target) = self.values.interner.lookup(item) else {
            return false;
        };
        let Some(array) = self.entries.get_mut(&composite) else {
            return false;
        };

        let removed = match occurrence {
            Occurrence::First => match array.iter().position(|&keylet| keylet == target) {
                Some(position) => {
                    array.remove(position);
                    1
                }
                None => 0,
            },
            Occurrence::Last => match array.iter().rposition(|&keylet| keylet == target) {
                Some(position) => {
                    array.remove(position);
                    1
                }
                None => 0,
            },
            Occurrence::All => {
                let before = array.len();
                array.retain(|&keylet| keylet != target);
                before - array.len()
            }
        };
        if removed == 0 {
            return false;
        }
        self.values.release(&composite, iter::repeat(target).take(removed));
        true
    }

    /// Number of elements, `None` when the entry is absent.
    pub fn length(&self, key: &C::KeyRef) -> Option<usize> {
        self.stored(key).map(|array| array.len())
    }

    /// Whether the array under `key` holds `item`.
    pub fn includes(&self, key: &C::KeyRef, item: &E) -> bool {
        let Some(target) = self.values.interner.lookup(item) else {
            return false;
        };
        self.stored(key).is_some_and(|array| array.contains(&target))
    }
}

impl<C, E, KQ> AssocMap<C, ArrayValued<E>, KQ, QueryableValues>
where
    C: KeyCodec,
    E: Eq + Hash + Clone,
    KQ: KeyIndexing,
{
    /// Entries whose array holds exactly the given element at every
    /// constrained position. Open positions and positions past the end of
    /// the template match anything. A template without a constrained
    /// position yields nothing.
    pub fn query_values_matching(&self, template: &[Option<E>]) -> Vec<QueryResult<C::Key, Vec<E>>> {
        let mut constrained = Vec::new();
        for (position, slot) in template.iter().enumerate() {
            if let Some(item) = slot {
                match self.values.interner.lookup(item) {
                    Some(keylet) => constrained.push((position, keylet)),
                    None => return Vec::new(),
                }
            }
        }

        let elements: Vec<Keylet> = constrained.iter().map(|&(_, keylet)| keylet).collect();
        self.values
            .index
            .containing_all(&elements)
            .into_iter()
            .filter(|composite| {
                self.entries.get(*composite).is_some_and(|array| {
                    constrained
                        .iter()
                        .all(|&(position, keylet)| array.get(position) == Some(&keylet))
                })
            })
            .map(|composite| self.result_for(composite))
            .collect()
    }
}
