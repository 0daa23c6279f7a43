use std::collections::HashSet;

use associum_core::{
    ArrayValued, AssocMap, Occurrence, Ordered, OrderedMap, QueryableKeys, QueryableOrderedMap, QueryableValues,
    UnorderedMap,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum MapOp {
    Set { key: Vec<u8>, value: u32 },
    Delete { key: Vec<u8> },
    Clear,
}

#[derive(Debug, Clone)]
enum ArrayOp {
    Push(Vec<u8>),
    Unshift(Vec<u8>),
    Pop,
    Shift,
    Splice { start: usize, delete_count: usize, items: Vec<u8> },
    Purge { item: u8, occurrence: Occurrence },
}

fn arb_key() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..6, 0..=4)
}

fn arb_map_op() -> impl Strategy<Value = MapOp> {
    prop_oneof![
        6 => (arb_key(), any::<u32>()).prop_map(|(key, value)| MapOp::Set { key, value }),
        3 => arb_key().prop_map(|key| MapOp::Delete { key }),
        1 => Just(MapOp::Clear),
    ]
}

fn arb_occurrence() -> impl Strategy<Value = Occurrence> {
    prop_oneof![Just(Occurrence::First), Just(Occurrence::Last), Just(Occurrence::All)]
}

fn arb_array_op() -> impl Strategy<Value = ArrayOp> {
    let items = || prop::collection::vec(0u8..5, 0..=3);
    prop_oneof![
        items().prop_map(ArrayOp::Push),
        items().prop_map(ArrayOp::Unshift),
        Just(ArrayOp::Pop),
        Just(ArrayOp::Shift),
        (0usize..8, 0usize..4, items())
            .prop_map(|(start, delete_count, items)| ArrayOp::Splice { start, delete_count, items }),
        (0u8..5, arb_occurrence()).prop_map(|(item, occurrence)| ArrayOp::Purge { item, occurrence }),
    ]
}

/// Insertion-ordered reference model of a map.
#[derive(Default)]
struct Model {
    entries: Vec<(Vec<u8>, u32)>,
}

impl Model {
    fn set(&mut self, key: Vec<u8>, value: u32) -> bool {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => {
                entry.1 = value;
                false
            }
            None => {
                self.entries.push((key, value));
                true
            }
        }
    }

    fn delete(&mut self, key: &[u8]) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| k != key);
        before != self.entries.len()
    }

    fn distinct_parts(&self) -> usize {
        self.entries.iter().flat_map(|(k, _)| k.iter()).collect::<HashSet<_>>().len()
    }
}

proptest! {
    #[test]
    fn prop_ordered_map_matches_model(ops in prop::collection::vec(arb_map_op(), 1..80)) {
        let mut map: OrderedMap<u8, u32> = OrderedMap::new();
        let mut model = Model::default();

        for op in ops {
            match op {
                MapOp::Set { key, value } => {
                    prop_assert_eq!(map.set(&key, value).unwrap(), model.set(key, value));
                }
                MapOp::Delete { key } => {
                    prop_assert_eq!(map.delete(&key), model.delete(&key));
                }
                MapOp::Clear => {
                    map.clear();
                    model.entries.clear();
                }
            }
            prop_assert_eq!(map.len(), model.entries.len());
            prop_assert_eq!(map.stats().key_keylets.live, model.distinct_parts());
        }

        let entries: Vec<(Vec<u8>, u32)> = map.iter().map(|(key, value)| (key, *value)).collect();
        prop_assert_eq!(entries, model.entries.clone());
        for (key, value) in &model.entries {
            prop_assert_eq!(map.get(key), Some(value));
        }
    }

    #[test]
    fn prop_unordered_keys_ignore_permutation(
        (key, shuffled) in prop::collection::vec(0u8..10, 0..6)
            .prop_flat_map(|key| (Just(key.clone()), Just(key).prop_shuffle())),
        value in any::<u32>()
    ) {
        let mut map: UnorderedMap<u8, u32> = UnorderedMap::new();
        map.set(&key, value).unwrap();
        prop_assert_eq!(map.get(&shuffled), Some(&value));
        prop_assert!(!map.set(&shuffled, value).unwrap());
        prop_assert_eq!(map.len(), 1);
    }

    #[test]
    fn prop_queries_match_brute_force(
        keys in prop::collection::vec(arb_key(), 1..30),
        parts in prop::collection::vec(0u8..6, 1..=2),
        template in prop::collection::vec(prop::option::of(0u8..6), 1..=3)
    ) {
        let mut map: QueryableOrderedMap<u8, usize> = QueryableOrderedMap::new();
        for (i, key) in keys.iter().enumerate() {
            map.set(key, i).unwrap();
        }
        let stored: Vec<(Vec<u8>, usize)> = map.iter().map(|(key, value)| (key, *value)).collect();

        let mut expected: Vec<usize> = stored
            .iter()
            .filter(|(key, _)| parts.iter().all(|part| key.contains(part)))
            .map(|(_, value)| *value)
            .collect();
        let mut found: Vec<usize> = map.query_indexed_with(&parts).into_iter().map(|r| *r.value).collect();
        expected.sort();
        found.sort();
        prop_assert_eq!(found, expected);

        let constrained = template.iter().any(Option::is_some);
        let mut expected: Vec<usize> = stored
            .iter()
            .filter(|(key, _)| {
                constrained
                    && template
                        .iter()
                        .enumerate()
                        .all(|(position, slot)| slot.map_or(true, |part| key.get(position) == Some(&part)))
            })
            .map(|(_, value)| *value)
            .collect();
        let mut found: Vec<usize> = map.query_matching(&template).into_iter().map(|r| *r.value).collect();
        expected.sort();
        found.sort();
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn prop_array_ops_match_vec(ops in prop::collection::vec(arb_array_op(), 1..60)) {
        let mut map: AssocMap<Ordered<u8>, ArrayValued<u8>, QueryableKeys, QueryableValues> = AssocMap::new();
        let key = [7u8];
        let mut model: Option<Vec<u8>> = None;

        for op in ops {
            match op {
                ArrayOp::Push(items) => {
                    let array = model.get_or_insert_with(Vec::new);
                    array.extend(&items);
                    prop_assert_eq!(map.push(&key, &items).unwrap(), array.len());
                }
                ArrayOp::Unshift(items) => {
                    let array = model.get_or_insert_with(Vec::new);
                    array.splice(0..0, items.iter().copied());
                    prop_assert_eq!(map.unshift(&key, &items).unwrap(), array.len());
                }
                ArrayOp::Pop => {
                    let expected = model.as_mut().and_then(|array| array.pop());
                    prop_assert_eq!(map.pop(&key), expected);
                }
                ArrayOp::Shift => {
                    let expected = model
                        .as_mut()
                        .and_then(|array| if array.is_empty() { None } else { Some(array.remove(0)) });
                    prop_assert_eq!(map.shift(&key), expected);
                }
                ArrayOp::Splice { start, delete_count, items } => {
                    let expected: Vec<u8> = match model.as_mut() {
                        Some(array) => {
                            let start = start.min(array.len());
                            let end = start + delete_count.min(array.len() - start);
                            array.splice(start..end, items.iter().copied()).collect()
                        }
                        None => Vec::new(),
                    };
                    prop_assert_eq!(map.splice(&key, start, delete_count, &items).unwrap(), expected);
                }
                ArrayOp::Purge { item, occurrence } => {
                    let expected = match model.as_mut() {
                        Some(array) => {
                            let before = array.len();
                            match occurrence {
                                Occurrence::First => {
                                    if let Some(position) = array.iter().position(|&e| e == item) {
                                        array.remove(position);
                                    }
                                }
                                Occurrence::Last => {
                                    if let Some(position) = array.iter().rposition(|&e| e == item) {
                                        array.remove(position);
                                    }
                                }
                                Occurrence::All => array.retain(|&e| e != item),
                            }
                            before != array.len()
                        }
                        None => false,
                    };
                    prop_assert_eq!(map.purge(&key, &item, occurrence), expected);
                }
            }

            prop_assert_eq!(map.get(&key), model.clone());
            let distinct = model.iter().flatten().collect::<HashSet<_>>().len();
            prop_assert_eq!(map.stats().value_keylets.live, distinct);
            for element in 0u8..5 {
                let held = model.as_ref().is_some_and(|array| array.contains(&element));
                prop_assert_eq!(map.query_values_containing(&[element]).len(), usize::from(held));
            }
        }
    }
}
