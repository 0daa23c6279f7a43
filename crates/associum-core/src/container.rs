//! Association container
//!
//! `AssocMap` joins a key codec, a value layout and two optional reverse
//! indices over a single entry table.
//!
//! **Write path**: encode key (interning), encode value (interning), then bind
//! keylets and update the indices
//! **Read path**: probe key (lookup only, never interns), then decode
//! **Failed writes**: keylets interned by the failed call are forgotten before
//! the error is returned, so the interners never hold unbound keylets
//!
//! Which operations exist is decided by the type parameters: positional
//! queries need a [`PositionalCodec`] and [`QueryableKeys`], value queries
//! need [`QueryableValues`], array and set operations need the matching
//! layout. Invalid combinations do not compile.
//!
//! [`QueryableValues`]: crate::value::QueryableValues

use std::fmt;
use std::hash::Hash;

use indexmap::map::Entry;
use indexmap::IndexMap;
use tracing::debug;

use crate::codec::{KeyCodec, Ordered, PositionalCodec, Structured};
use crate::config::AssocConfig;
use crate::error::AssocResult;
use crate::index::{KeyIndexing, PlainKeys, QueryableKeys};
use crate::interner::{Interner, InternerStats};
use crate::keylet::{Composite, Keylet};
use crate::value::{PlainValues, ValueIndexing, ValueLayout, ValueStore};

/// One entry returned by a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult<K, V> {
    pub key: K,
    pub value: V,
}

/// Snapshot of a container's counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssocStats {
    /// Live entries
    pub entries: usize,
    /// Key interner counters
    pub key_keylets: InternerStats,
    /// Value interner counters (all zero for raw values)
    pub value_keylets: InternerStats,
}

/// Associative container keyed by composite keys.
///
/// - `C`: key codec ([`Ordered`], [`Unordered`](crate::codec::Unordered),
///   [`Structured`], [`Scalar`](crate::codec::Scalar))
/// - `L`: value layout ([`Raw`](crate::value::Raw),
///   [`Interned`](crate::value::Interned), [`ArrayValued`](crate::value::ArrayValued),
///   [`SetValued`](crate::value::SetValued))
/// - `KQ`: [`PlainKeys`] or [`QueryableKeys`]
/// - `VQ`: [`PlainValues`] or [`QueryableValues`](crate::value::QueryableValues)
///
/// Entries iterate in insertion order; overwriting keeps an entry's place,
/// deleting keeps the order of the rest.
pub struct AssocMap<C, L, KQ = PlainKeys, VQ = PlainValues>
where
    C: KeyCodec,
    L: ValueLayout,
{
    /// Key codec (holds the field map for structured keys)
    pub(crate) codec: C,
    /// Sub-key interner
    pub(crate) keys: Interner<C::Part>,
    /// Reverse key index
    pub(crate) key_index: KQ,
    /// Composite -> stored value, in insertion order
    pub(crate) entries: IndexMap<Composite, L::Stored>,
    /// Value element interner and reverse value index
    pub(crate) values: ValueStore<L::Element, VQ>,
    pub(crate) config: AssocConfig,
}

impl<C, L, KQ, VQ> AssocMap<C, L, KQ, VQ>
where
    C: KeyCodec,
    L: ValueLayout,
    KQ: KeyIndexing,
    VQ: ValueIndexing,
{
    /// Empty container with the standard configuration.
    pub fn new() -> Self {
        Self::build(AssocConfig::default())
    }

    /// Empty container with a custom configuration.
    pub fn with_config(config: AssocConfig) -> AssocResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: AssocConfig) -> Self {
        debug!(
            max_key_arity = config.max_key_arity,
            max_collection_len = config.max_collection_len,
            initial_capacity = config.initial_capacity,
            "created container"
        );
        Self {
            codec: C::default(),
            keys: Interner::new(),
            key_index: KQ::default(),
            entries: IndexMap::with_capacity(config.initial_capacity),
            values: ValueStore {
                interner: Interner::new(),
                index: VQ::default(),
            },
            config,
        }
    }

    /// Insert or overwrite. Returns `true` when the key was not present.
    ///
    /// On error nothing changes: keylets interned for the rejected key or
    /// value are released again.
    pub fn set(&mut self, key: &C::KeyRef, value: L::Input) -> AssocResult<bool> {
        let composite = self.codec.encode_for_insert(key, &mut self.keys, &self.config)?;
        let stored = match L::encode(value, &mut self.values.interner, &self.config) {
            Ok(stored) => stored,
            Err(err) => {
                self.keys.forget_unbound(composite.keylets());
                return Err(err);
            }
        };
        self.codec.commit(key);

        match self.entries.get_mut(&composite) {
            Some(current) => {
                // Bind the new elements before releasing the old ones so
                // elements present in both never drop to zero.
                let previous = std::mem::replace(current, stored);
                self.values.bind(&composite, L::elements(current));
                self.values.release(&composite, L::elements(&previous));
                Ok(false)
            }
            None => {
                self.insert_entry(composite, stored);
                Ok(true)
            }
        }
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &C::KeyRef) -> Option<L::Output<'_>> {
        self.stored(key).map(|stored| L::decode(stored, &self.values.interner))
    }

    pub fn has(&self, key: &C::KeyRef) -> bool {
        self.stored(key).is_some()
    }

    /// Remove `key`. Returns whether it was present.
    pub fn delete(&mut self, key: &C::KeyRef) -> bool {
        let Some(composite) = self.codec.encode_for_probe(key, &self.keys) else {
            return false;
        };
        let Some(stored) = self.entries.shift_remove(&composite) else {
            return false;
        };
        self.values.release(&composite, L::elements(&stored));
        self.key_index.on_remove(&composite);
        self.keys.release(composite.keylets());
        true
    }

    /// Remove every entry. Reference counts are unwound entry by entry, then
    /// both interners start over from the first identifier. Structured field
    /// positions are kept.
    pub fn clear(&mut self) {
        let removed = self.entries.len();
        for (composite, stored) in self.entries.drain(..) {
            self.values.release(&composite, L::elements(&stored));
            self.keys.release(composite.keylets());
        }
        debug_assert!(self.keys.is_empty() && self.values.interner.is_empty());
        self.key_index.clear();
        self.values.index.clear();
        self.keys.reset();
        self.values.interner.reset();
        debug!(removed, "cleared container");
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (C::Key, L::Output<'_>)> + '_ {
        self.entries.iter().map(move |(composite, stored)| {
            (
                self.codec.decode(composite, &self.keys),
                L::decode(stored, &self.values.interner),
            )
        })
    }

    /// Same as [`iter`](Self::iter).
    pub fn entries(&self) -> impl Iterator<Item = (C::Key, L::Output<'_>)> + '_ {
        self.iter()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = C::Key> + '_ {
        self.entries
            .keys()
            .map(move |composite| self.codec.decode(composite, &self.keys))
    }

    /// Values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = L::Output<'_>> + '_ {
        self.entries
            .values()
            .map(move |stored| L::decode(stored, &self.values.interner))
    }

    /// Whether any live key uses `part` as a sub-key.
    pub fn contains_key_part(&self, part: &C::Part) -> bool {
        self.keys.lookup(part).is_some()
    }

    pub fn config(&self) -> &AssocConfig {
        &self.config
    }

    pub fn stats(&self) -> AssocStats {
        AssocStats {
            entries: self.entries.len(),
            key_keylets: self.keys.stats(),
            value_keylets: self.values.interner.stats(),
        }
    }

    /// Stored value for `key`, without decoding.
    pub(crate) fn stored(&self, key: &C::KeyRef) -> Option<&L::Stored> {
        let composite = self.codec.encode_for_probe(key, &self.keys)?;
        self.entries.get(&composite)
    }

    /// Encode `key` for a collection update and run `stage` against the
    /// current stored value (`None` when absent). Key keylets interned here
    /// are forgotten if either step fails; the codec only commits the key
    /// once both succeed.
    pub(crate) fn stage_update<T, F>(&mut self, key: &C::KeyRef, stage: F) -> AssocResult<(Composite, T)>
    where
        F: FnOnce(Option<&L::Stored>, &mut Interner<L::Element>, &AssocConfig) -> AssocResult<T>,
    {
        let composite = self.codec.encode_for_insert(key, &mut self.keys, &self.config)?;
        let current = self.entries.get(&composite);
        match stage(current, &mut self.values.interner, &self.config) {
            Ok(staged) => {
                self.codec.commit(key);
                Ok((composite, staged))
            }
            Err(err) => {
                self.keys.forget_unbound(composite.keylets());
                Err(err)
            }
        }
    }

    /// Stored value for `composite`, inserting `empty()` (which must hold no
    /// elements) when absent.
    pub(crate) fn stored_or_insert(&mut self, composite: &Composite, empty: impl FnOnce() -> L::Stored) -> &mut L::Stored {
        match self.entries.entry(composite.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.keys.bind(composite.keylets());
                self.key_index.on_insert(composite);
                entry.insert(empty())
            }
        }
    }

    /// Query result for a composite the indices report as live.
    ///
    /// # Panics
    ///
    /// Panics if the composite has no entry, which means an index is out of
    /// step with the entry table.
    pub(crate) fn result_for(&self, composite: &Composite) -> QueryResult<C::Key, L::Output<'_>> {
        let stored = match self.entries.get(composite) {
            Some(stored) => stored,
            None => panic!("indexed composite {} has no entry", composite),
        };
        QueryResult {
            key: self.codec.decode(composite, &self.keys),
            value: L::decode(stored, &self.values.interner),
        }
    }

    fn insert_entry(&mut self, composite: Composite, stored: L::Stored) {
        self.keys.bind(composite.keylets());
        self.key_index.on_insert(&composite);
        self.values.bind(&composite, L::elements(&stored));
        self.entries.insert(composite, stored);
    }
}

impl<C, L, KQ, VQ> Default for AssocMap<C, L, KQ, VQ>
where
    C: KeyCodec,
    L: ValueLayout,
    KQ: KeyIndexing,
    VQ: ValueIndexing,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C, L, KQ, VQ> fmt::Debug for AssocMap<C, L, KQ, VQ>
where
    C: KeyCodec,
    L: ValueLayout,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssocMap")
            .field("entries", &self.entries.len())
            .field("key_keylets", &self.keys.len())
            .field("value_keylets", &self.values.interner.len())
            .field("config", &self.config)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Key queries
// ---------------------------------------------------------------------------

impl<C, L, VQ> AssocMap<C, L, QueryableKeys, VQ>
where
    C: KeyCodec,
    L: ValueLayout,
    VQ: ValueIndexing,
{
    /// Entries whose key contains every given part, in any position.
    ///
    /// A part that no live key uses yields nothing, and so does an empty
    /// part list.
    pub fn query_indexed_with(&self, parts: &[C::Part]) -> Vec<QueryResult<C::Key, L::Output<'_>>> {
        let Some(keylets) = self.lookup_parts(parts) else {
            return Vec::new();
        };
        self.key_index
            .containing_all(&keylets)
            .into_iter()
            .map(|composite| self.result_for(composite))
            .collect()
    }

    fn lookup_parts(&self, parts: &[C::Part]) -> Option<Vec<Keylet>> {
        parts.iter().map(|part| self.keys.lookup(part)).collect()
    }
}

impl<C, L, VQ> AssocMap<C, L, QueryableKeys, VQ>
where
    C: PositionalCodec,
    L: ValueLayout,
    VQ: ValueIndexing,
{
    /// Entries whose key holds exactly the template's part at every
    /// constrained position. Open positions, and positions past the end of
    /// the template, match anything. A template without a constrained
    /// position yields nothing.
    pub fn query_matching(&self, template: &C::Template) -> Vec<QueryResult<C::Key, L::Output<'_>>> {
        let Some(keylets) = self.codec.normalize_query(template, &self.keys) else {
            return Vec::new();
        };
        self.key_index
            .matching(&keylets)
            .into_iter()
            .map(|composite| self.result_for(composite))
            .collect()
    }
}

impl<T, L, VQ> AssocMap<Ordered<T>, L, QueryableKeys, VQ>
where
    T: Eq + Hash + Clone,
    L: ValueLayout,
    VQ: ValueIndexing,
{
    /// Entries whose key contains every part of `fragment` in the same
    /// relative order, with any number of other parts in between.
    pub fn query_ordered_fragment(&self, fragment: &[T]) -> Vec<QueryResult<Vec<T>, L::Output<'_>>> {
        let Some(keylets) = self.lookup_parts(fragment) else {
            return Vec::new();
        };
        self.key_index
            .containing_all(&keylets)
            .into_iter()
            .filter(|composite| holds_in_order(composite, &keylets))
            .map(|composite| self.result_for(composite))
            .collect()
    }
}

/// Whether `fragment` is a subsequence of the composite's keylets.
fn holds_in_order(composite: &Composite, fragment: &[Keylet]) -> bool {
    let mut wanted = fragment.iter().peekable();
    for keylet in composite.keylets() {
        if wanted.peek() == Some(&&keylet) {
            wanted.next();
        }
    }
    wanted.peek().is_none()
}

impl<F, T, L, KQ, VQ> AssocMap<Structured<F, T>, L, KQ, VQ>
where
    F: Eq + Hash + Clone + fmt::Debug,
    T: Eq + Hash + Clone,
    L: ValueLayout,
    KQ: KeyIndexing,
    VQ: ValueIndexing,
{
    /// Position assigned to a field name, `None` if no key ever used it.
    pub fn field_position(&self, field: &F) -> Option<usize> {
        self.codec.field_position(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Unordered;
    use crate::error::AssocError;
    use crate::value::{Interned, Raw};

    type Plain = AssocMap<Ordered<&'static str>, Raw<u32>>;
    type Indexed = AssocMap<Ordered<&'static str>, Raw<u32>, QueryableKeys>;

    fn key_uses(map: &Plain, part: &'static str) -> Option<u32> {
        map.keys.lookup(&part).and_then(|keylet| map.keys.use_count(keylet))
    }

    #[test]
    fn test_set_get_has_delete() {
        let mut map = Plain::new();
        assert!(map.set(&["a", "b"], 1).unwrap());
        assert_eq!(map.get(&["a", "b"]), Some(&1));
        assert!(map.has(&["a", "b"]));
        assert!(!map.has(&["b", "a"]));
        assert_eq!(map.len(), 1);

        assert!(map.delete(&["a", "b"]));
        assert!(!map.delete(&["a", "b"]));
        assert!(map.is_empty());
        assert_eq!(map.get(&["a", "b"]), None);
    }

    #[test]
    fn test_overwrite_keeps_count_and_order() {
        let mut map = Plain::new();
        map.set(&["x"], 1).unwrap();
        map.set(&["y"], 2).unwrap();
        assert!(!map.set(&["x"], 3).unwrap());
        assert_eq!(map.len(), 2);
        assert_eq!(key_uses(&map, "x"), Some(1));
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![(vec!["x"], &3), (vec!["y"], &2)]);
    }

    #[test]
    fn test_shared_parts_are_counted() {
        let mut map = Plain::new();
        map.set(&["a", "b"], 1).unwrap();
        map.set(&["a", "c"], 2).unwrap();
        map.set(&["a", "a"], 3).unwrap();
        assert_eq!(key_uses(&map, "a"), Some(4));

        map.delete(&["a", "a"]);
        map.delete(&["a", "b"]);
        assert_eq!(key_uses(&map, "a"), Some(1));
        assert_eq!(key_uses(&map, "b"), None);
        assert!(!map.contains_key_part(&"b"));
    }

    #[test]
    fn test_probe_never_interns() {
        let mut map = Plain::new();
        map.set(&["a"], 1).unwrap();
        assert!(!map.has(&["zzz"]));
        assert!(!map.delete(&["a", "zzz"]));
        assert_eq!(map.stats().key_keylets.live, 1);
    }

    #[test]
    fn test_delete_keeps_relative_order() {
        let mut map = Plain::new();
        for (i, part) in ["a", "b", "c", "d"].into_iter().enumerate() {
            map.set(&[part], i as u32).unwrap();
        }
        map.delete(&["b"]);
        let keys: Vec<Vec<&str>> = map.keys().collect();
        assert_eq!(keys, vec![vec!["a"], vec!["c"], vec!["d"]]);
        assert_eq!(map.values().copied().collect::<Vec<_>>(), vec![0, 2, 3]);
    }

    #[test]
    fn test_clear_unwinds_everything() {
        let mut map: AssocMap<Ordered<&str>, Interned<&str>, QueryableKeys> = AssocMap::new();
        map.set(&["a", "b"], "v").unwrap();
        map.set(&["b", "c"], "w").unwrap();
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.stats().key_keylets.live, 0);
        assert_eq!(map.stats().value_keylets.live, 0);
        assert!(map.query_indexed_with(&["b"]).is_empty());

        map.set(&["fresh"], "x").unwrap();
        assert_eq!(map.get(&["fresh"]), Some(&"x"));
    }

    #[test]
    fn test_overwrite_rebinds_values() {
        let mut map: AssocMap<Ordered<&str>, Interned<&str>> = AssocMap::new();
        map.set(&["k"], "old").unwrap();
        map.set(&["j"], "shared").unwrap();
        map.set(&["k"], "shared").unwrap();
        assert_eq!(map.stats().value_keylets.live, 1);

        // Same value again must not reclaim it.
        map.set(&["k"], "shared").unwrap();
        assert_eq!(map.get(&["k"]), Some(&"shared"));
        assert_eq!(map.get(&["j"]), Some(&"shared"));
    }

    #[test]
    fn test_rejected_key_leaves_no_keylets() {
        let config = AssocConfig {
            max_key_arity: 2,
            ..AssocConfig::default()
        };
        let mut map = Plain::with_config(config).unwrap();
        assert_eq!(map.set(&["a", "b", "c"], 1), Err(AssocError::KeyTooWide { arity: 3, limit: 2 }));
        assert!(map.is_empty());
        assert_eq!(map.stats().key_keylets.live, 0);
    }

    #[test]
    fn test_with_config_validates() {
        let config = AssocConfig {
            max_key_arity: 0,
            ..AssocConfig::default()
        };
        assert!(matches!(Plain::with_config(config), Err(AssocError::InvalidConfig { .. })));
        let map = Plain::with_config(AssocConfig::compact()).unwrap();
        assert_eq!(map.config(), &AssocConfig::compact());
    }

    #[test]
    fn test_empty_key() {
        let mut map = Plain::new();
        map.set(&[], 7).unwrap();
        map.set(&["a"], 8).unwrap();
        assert_eq!(map.get(&[]), Some(&7));
        assert_eq!(map.len(), 2);
        assert!(map.delete(&[]));
        assert_eq!(map.get(&["a"]), Some(&8));
    }

    #[test]
    fn test_unordered_permutations() {
        let mut map: AssocMap<Unordered<&str>, Raw<u32>> = AssocMap::new();
        map.set(&["a", "b", "c"], 1).unwrap();
        assert!(!map.set(&["c", "a", "b"], 2).unwrap());
        assert_eq!(map.get(&["b", "c", "a"]), Some(&2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_query_indexed_with_is_containment() {
        let mut map = Indexed::new();
        map.set(&["A", "B"], 1).unwrap();
        map.set(&["C", "D"], 2).unwrap();
        map.set(&["B", "C"], 3).unwrap();

        let mut values: Vec<u32> = map.query_indexed_with(&["B"]).into_iter().map(|r| *r.value).collect();
        values.sort();
        assert_eq!(values, vec![1, 3]);

        let hits = map.query_indexed_with(&["B", "A"]);
        assert_eq!(hits, vec![QueryResult { key: vec!["A", "B"], value: &1 }]);
        assert!(map.query_indexed_with(&["D", "B"]).is_empty());
        assert!(map.query_indexed_with(&["Q"]).is_empty());
        assert!(map.query_indexed_with(&[]).is_empty());
    }

    #[test]
    fn test_query_matching_is_positional() {
        let mut map = Indexed::new();
        map.set(&["A", "B", "C", "D"], 1).unwrap();
        map.set(&["B", "X", "Y", "D"], 2).unwrap();
        map.set(&["A", "B"], 3).unwrap();

        let mut values: Vec<u32> = map
            .query_matching(&[None, Some("B")])
            .into_iter()
            .map(|r| *r.value)
            .collect();
        values.sort();
        assert_eq!(values, vec![1, 3]);

        let hits = map.query_matching(&[Some("B"), None, None, Some("D")]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, &2);
        assert!(map.query_matching(&[None, None]).is_empty());
        assert!(map.query_matching(&[Some("nope")]).is_empty());
    }

    #[test]
    fn test_query_ordered_fragment() {
        let mut map = Indexed::new();
        map.set(&["A", "B", "C", "D"], 1).unwrap();
        map.set(&["D", "C", "B", "A"], 2).unwrap();

        let hits = map.query_ordered_fragment(&["B", "D"]);
        assert_eq!(hits, vec![QueryResult { key: vec!["A", "B", "C", "D"], value: &1 }]);
        assert_eq!(map.query_ordered_fragment(&["A"]).len(), 2);
        assert!(map.query_ordered_fragment(&[]).is_empty());
    }

    #[test]
    fn test_holds_in_order() {
        let k = |i| Keylet::from_index(i).unwrap();
        let abcd = Composite::from_keylets([k(0), k(1), k(2), k(3)]);
        assert!(holds_in_order(&abcd, &[k(1), k(3)]));
        assert!(holds_in_order(&abcd, &[]));
        assert!(!holds_in_order(&abcd, &[k(3), k(1)]));
    }

    #[test]
    fn test_debug_output() {
        let mut map = Plain::new();
        map.set(&["a"], 1).unwrap();
        let rendered = format!("{:?}", map);
        assert!(rendered.starts_with("AssocMap"));
        assert!(rendered.contains("entries: 1"));
    }
}
