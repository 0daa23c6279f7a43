//! Reverse key index
//!
//! With [`QueryableKeys`] selected, every key keylet knows the live
//! composites that contain it. Containment queries intersect those buckets;
//! positional queries scan only the buckets of the constrained keylets and
//! check each candidate slot by slot.

use std::hash::{BuildHasher, Hash};

use hashbrown::{hash_map, hash_set, HashMap, HashSet};

use crate::keylet::{Composite, Keylet};

/// Hooks run by the container when a composite becomes live or dies.
pub trait KeyIndexing: Default {
    /// A composite was inserted.
    fn on_insert(&mut self, composite: &Composite);
    /// A composite was removed.
    fn on_remove(&mut self, composite: &Composite);
    /// Every composite was removed.
    fn clear(&mut self);
}

/// No reverse index; key queries are not available.
#[derive(Debug, Default)]
pub struct PlainKeys;

impl KeyIndexing for PlainKeys {
    fn on_insert(&mut self, _composite: &Composite) {}
    fn on_remove(&mut self, _composite: &Composite) {}
    fn clear(&mut self) {}
}

/// Reverse index from key keylet to the composites containing it.
#[derive(Debug, Default)]
pub struct QueryableKeys {
    buckets: HashMap<Keylet, HashSet<Composite>>,
}

impl QueryableKeys {
    /// Live composites containing `keylet`.
    pub fn bucket(&self, keylet: Keylet) -> Option<&HashSet<Composite>> {
        self.buckets.get(&keylet)
    }

    /// Composites containing every keylet, in any position.
    pub fn containing_all(&self, keylets: &[Keylet]) -> Vec<&Composite> {
        let mut buckets = Vec::with_capacity(keylets.len());
        for keylet in keylets {
            match self.buckets.get(keylet) {
                Some(bucket) => buckets.push(bucket),
                None => return Vec::new(),
            }
        }
        intersect(buckets)
    }

    /// Composites holding exactly the given keylet at every constrained
    /// position of `template`. Open positions match anything.
    pub fn matching(&self, template: &[Option<Keylet>]) -> Vec<&Composite> {
        let constrained: Vec<(usize, Keylet)> = template
            .iter()
            .enumerate()
            .filter_map(|(position, slot)| slot.map(|keylet| (position, keylet)))
            .collect();

        let mut checked: HashSet<&Composite> = HashSet::new();
        let mut matches = Vec::new();
        for (_, keylet) in &constrained {
            let Some(bucket) = self.buckets.get(keylet) else {
                return Vec::new();
            };
            for composite in bucket {
                if !checked.insert(composite) {
                    continue;
                }
                if constrained.iter().all(|&(position, keylet)| composite.slot(position) == Some(keylet)) {
                    matches.push(composite);
                }
            }
        }
        matches
    }

    /// Number of keylets with a non-empty bucket.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

impl KeyIndexing for QueryableKeys {
    fn on_insert(&mut self, composite: &Composite) {
        for keylet in composite.distinct_keylets() {
            self.buckets.entry(keylet).or_default().insert(composite.clone());
        }
    }

    fn on_remove(&mut self, composite: &Composite) {
        for keylet in composite.distinct_keylets() {
            if let Some(bucket) = self.buckets.get_mut(&keylet) {
                bucket.remove(composite);
                if bucket.is_empty() {
                    self.buckets.remove(&keylet);
                }
            }
        }
    }

    fn clear(&mut self) {
        self.buckets.clear();
    }
}

/// A set-like bucket: key buckets hold composites, value owner buckets map
/// composites to occurrence counts.
pub(crate) trait Bucket {
    type Member: Eq + Hash;
    type Members<'a>: Iterator<Item = &'a Self::Member>
    where
        Self: 'a;

    fn size(&self) -> usize;
    fn holds(&self, member: &Self::Member) -> bool;
    fn members(&self) -> Self::Members<'_>;
}

impl<T, S> Bucket for HashSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    type Member = T;
    type Members<'a> = hash_set::Iter<'a, T> where Self: 'a;

    fn size(&self) -> usize {
        self.len()
    }

    fn holds(&self, member: &T) -> bool {
        self.contains(member)
    }

    fn members(&self) -> hash_set::Iter<'_, T> {
        self.iter()
    }
}

impl<K, V, S> Bucket for HashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Member = K;
    type Members<'a> = hash_map::Keys<'a, K, V> where Self: 'a;

    fn size(&self) -> usize {
        self.len()
    }

    fn holds(&self, member: &K) -> bool {
        self.contains_key(member)
    }

    fn members(&self) -> hash_map::Keys<'_, K, V> {
        self.keys()
    }
}

/// Members present in every bucket. Walks the smallest bucket and probes
/// the others, so cost follows the most selective bucket.
pub(crate) fn intersect<'a, B: Bucket>(mut buckets: Vec<&'a B>) -> Vec<&'a B::Member> {
    if buckets.is_empty() {
        return Vec::new();
    }
    buckets.sort_by_key(|bucket| bucket.size());
    let (smallest, rest) = buckets.split_at(1);
    smallest[0]
        .members()
        .filter(|member| rest.iter().all(|bucket| bucket.holds(member)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(index: usize) -> Keylet {
        Keylet::from_index(index).unwrap()
    }

    fn indexed(composites: &[Composite]) -> QueryableKeys {
        let mut index = QueryableKeys::default();
        for composite in composites {
            index.on_insert(composite);
        }
        index
    }

    #[test]
    fn test_intersect() {
        let a: HashSet<u32> = [1, 2, 3, 4].into_iter().collect();
        let b: HashSet<u32> = [2, 4, 6].into_iter().collect();
        let c: HashSet<u32> = [4, 2].into_iter().collect();
        let mut common: Vec<u32> = intersect(vec![&a, &b, &c]).into_iter().copied().collect();
        common.sort();
        assert_eq!(common, vec![2, 4]);
        assert!(intersect(Vec::<&HashSet<u32>>::new()).is_empty());
    }

    #[test]
    fn test_intersect_map_keys() {
        let a: HashMap<u32, u32> = [(1, 2), (2, 1), (3, 1)].into_iter().collect();
        let b: HashMap<u32, u32> = [(3, 5), (1, 1)].into_iter().collect();
        let mut common: Vec<u32> = intersect(vec![&a, &b]).into_iter().copied().collect();
        common.sort();
        assert_eq!(common, vec![1, 3]);
    }

    #[test]
    fn test_buckets_follow_inserts_and_removes() {
        let ab = Composite::from_keylets([k(0), k(1)]);
        let bc = Composite::from_keylets([k(1), k(2)]);
        let mut index = indexed(&[ab.clone(), bc.clone()]);
        assert_eq!(index.bucket(k(1)).map(|b| b.len()), Some(2));
        assert_eq!(index.bucket_count(), 3);

        index.on_remove(&ab);
        assert!(index.bucket(k(0)).is_none());
        assert_eq!(index.bucket(k(1)).map(|b| b.len()), Some(1));

        index.clear();
        assert_eq!(index.bucket_count(), 0);
    }

    #[test]
    fn test_repeated_keylet_indexed_once() {
        let aa = Composite::from_keylets([k(0), k(0)]);
        let mut index = indexed(&[aa.clone()]);
        assert_eq!(index.bucket(k(0)).map(|b| b.len()), Some(1));
        index.on_remove(&aa);
        assert_eq!(index.bucket_count(), 0);
    }

    #[test]
    fn test_containing_all() {
        let ab = Composite::from_keylets([k(0), k(1)]);
        let cd = Composite::from_keylets([k(2), k(3)]);
        let index = indexed(&[ab.clone(), cd]);
        assert_eq!(index.containing_all(&[k(1), k(0)]), vec![&ab]);
        assert!(index.containing_all(&[k(3), k(1)]).is_empty());
        assert!(index.containing_all(&[k(9)]).is_empty());
        assert!(index.containing_all(&[]).is_empty());
    }

    #[test]
    fn test_matching() {
        let abcd = Composite::from_keylets([k(0), k(1), k(2), k(3)]);
        let bxxd = Composite::from_keylets([k(1), k(4), k(4), k(3)]);
        let index = indexed(&[abcd.clone(), bxxd.clone()]);

        assert_eq!(index.matching(&[None, Some(k(1)), None, Some(k(3))]), vec![&abcd]);
        assert_eq!(index.matching(&[Some(k(1)), None, None, Some(k(3))]), vec![&bxxd]);
        assert!(index.matching(&[Some(k(3)), None, None, Some(k(1))]).is_empty());
        assert!(index.matching(&[None, None]).is_empty());
    }
}
