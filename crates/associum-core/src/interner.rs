//! Keylet interner
//!
//! Maps payloads to keylets and back, with one use count per keylet.
//! A keylet lives while something binds it: composites bind the keylets of
//! their sub-keys, collections bind the keylets of their elements. When the
//! count drops to zero the payload, the keylet and both mappings are removed
//! and the identifier goes on a free list for reuse.

use std::hash::Hash;

use hashbrown::HashMap;
use tracing::trace;

use crate::error::{AssocError, AssocResult};
use crate::keylet::Keylet;

/// Counters kept by an interner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InternerStats {
    /// Keylets currently live
    pub live: usize,
    /// Fresh keylets issued since creation
    pub issued: u64,
    /// `intern` calls answered from an existing keylet
    pub hits: u64,
    /// Keylets reclaimed after their use count reached zero
    pub reclaimed: u64,
}

impl InternerStats {
    /// Share of `intern` calls answered without issuing a keylet.
    pub fn hit_rate(&self) -> f64 {
        let calls = self.hits + self.issued;
        if calls == 0 {
            return 0.0;
        }
        self.hits as f64 / calls as f64
    }
}

#[derive(Debug)]
struct Interned<P> {
    payload: P,
    uses: u32,
}

/// Payload <-> keylet table with reference counts.
#[derive(Debug)]
pub struct Interner<P> {
    by_payload: HashMap<P, Keylet>,
    /// Indexed by `Keylet::index`; `None` marks a free identifier.
    table: Vec<Option<Interned<P>>>,
    free: Vec<Keylet>,
    stats: InternerStats,
}

impl<P> Default for Interner<P> {
    fn default() -> Self {
        Self {
            by_payload: HashMap::new(),
            table: Vec::new(),
            free: Vec::new(),
            stats: InternerStats::default(),
        }
    }
}

impl<P> Interner<P>
where
    P: Eq + Hash + Clone,
{
    /// Create an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the keylet for `payload`, issuing a fresh one with a use count
    /// of zero if the payload is not interned yet.
    pub fn intern(&mut self, payload: &P) -> AssocResult<Keylet> {
        if let Some(&keylet) = self.by_payload.get(payload) {
            self.stats.hits += 1;
            return Ok(keylet);
        }

        let keylet = match self.free.pop() {
            Some(keylet) => keylet,
            None => Keylet::from_index(self.table.len()).ok_or(AssocError::KeyletSpaceExhausted {
                issued: self.stats.issued,
            })?,
        };

        let slot = Some(Interned { payload: payload.clone(), uses: 0 });
        if keylet.index() == self.table.len() {
            self.table.push(slot);
        } else {
            self.table[keylet.index()] = slot;
        }
        self.by_payload.insert(payload.clone(), keylet);
        self.stats.issued += 1;
        self.stats.live += 1;
        trace!(%keylet, "issued keylet");
        Ok(keylet)
    }

    /// Keylet for `payload` without interning it.
    pub fn lookup(&self, payload: &P) -> Option<Keylet> {
        self.by_payload.get(payload).copied()
    }

    /// Payload behind a live keylet.
    pub fn try_resolve(&self, keylet: Keylet) -> Option<&P> {
        self.table
            .get(keylet.index())
            .and_then(|slot| slot.as_ref())
            .map(|interned| &interned.payload)
    }

    /// Payload behind a keylet this interner issued and still holds.
    ///
    /// # Panics
    ///
    /// Panics if the keylet is not live: containers only keep keylets they
    /// have bound, so a miss here is a bookkeeping bug.
    pub fn resolve(&self, keylet: Keylet) -> &P {
        match self.try_resolve(keylet) {
            Some(payload) => payload,
            None => panic!("keylet {} is not live in this interner", keylet),
        }
    }

    /// Current use count of a keylet, `None` if it is not live.
    pub fn use_count(&self, keylet: Keylet) -> Option<u32> {
        self.table
            .get(keylet.index())
            .and_then(|slot| slot.as_ref())
            .map(|interned| interned.uses)
    }

    /// Increment the use count of each keylet.
    pub fn bind<I: IntoIterator<Item = Keylet>>(&mut self, keylets: I) {
        for keylet in keylets {
            self.slot_mut(keylet).uses += 1;
        }
    }

    /// Decrement the use count of each keylet, reclaiming those that reach
    /// zero. Returns the number of keylets reclaimed.
    pub fn release<I: IntoIterator<Item = Keylet>>(&mut self, keylets: I) -> usize {
        let mut reclaimed = 0;
        for keylet in keylets {
            let interned = self.slot_mut(keylet);
            interned.uses = interned.uses.saturating_sub(1);
            if interned.uses == 0 {
                self.reclaim(keylet);
                reclaimed += 1;
            }
        }
        reclaimed
    }

    /// Reclaim keylets that were interned but never bound, e.g. by an insert
    /// that failed after interning part of its key.
    pub fn forget_unbound<I: IntoIterator<Item = Keylet>>(&mut self, keylets: I) {
        for keylet in keylets {
            if self.use_count(keylet) == Some(0) {
                self.reclaim(keylet);
            }
        }
    }

    /// Drop every keylet and shrink the table back to empty.
    pub fn reset(&mut self) {
        self.by_payload.clear();
        self.table.clear();
        self.free.clear();
        self.stats.live = 0;
    }

    /// Number of live keylets.
    pub fn len(&self) -> usize {
        self.stats.live
    }

    /// True when no keylet is live.
    pub fn is_empty(&self) -> bool {
        self.stats.live == 0
    }

    /// Snapshot of the interner's counters.
    pub fn stats(&self) -> InternerStats {
        self.stats
    }

    fn slot_mut(&mut self, keylet: Keylet) -> &mut Interned<P> {
        match self.table.get_mut(keylet.index()).and_then(|slot| slot.as_mut()) {
            Some(interned) => interned,
            None => panic!("keylet {} is not live in this interner", keylet),
        }
    }

    fn reclaim(&mut self, keylet: Keylet) {
        if let Some(interned) = self.table[keylet.index()].take() {
            self.by_payload.remove(&interned.payload);
            self.free.push(keylet);
            self.stats.live -= 1;
            self.stats.reclaimed += 1;
            trace!(%keylet, "reclaimed keylet");
        }
    }
}
