//! Keylets and composite keys
//!
//! A keylet is the compact identifier an interner hands out for one payload.
//! A composite is the storage key of an entry: one slot per key position,
//! each slot holding the keylet of that position's sub-key, or nothing for a
//! structured-key field the entry does not set.

use std::fmt;
use std::num::NonZeroU32;

use smallvec::SmallVec;

/// Digits used when rendering a keylet as text.
const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Separator between slots in a rendered composite.
pub const KEYLET_SEPARATOR: char = '_';

/// Interned identifier for one payload.
///
/// Ordering follows issue order within one interner. It carries no meaning
/// across interners.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Keylet(NonZeroU32);

impl Keylet {
    /// Keylet for slot `index` of an interner's table.
    pub(crate) fn from_index(index: usize) -> Option<Self> {
        let raw = u32::try_from(index).ok()?.checked_add(1)?;
        NonZeroU32::new(raw).map(Keylet)
    }

    /// Slot of this keylet in its interner's table.
    pub(crate) fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }

    /// Raw numeric identifier.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for Keylet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut n = self.0.get();
        let mut buf = [0u8; 6];
        let mut pos = buf.len();
        while n > 0 {
            pos -= 1;
            buf[pos] = ALPHABET[(n % 62) as usize];
            n /= 62;
        }
        // ALPHABET is ASCII
        f.write_str(std::str::from_utf8(&buf[pos..]).map_err(|_| fmt::Error)?)
    }
}

impl fmt::Debug for Keylet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keylet({})", self)
    }
}

/// One position of a composite key.
pub type Slot = Option<Keylet>;

/// Storage key of an entry: the keylets of its sub-keys, by position.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Composite(SmallVec<[Slot; 4]>);

impl Composite {
    /// Composite with every position occupied.
    pub fn from_keylets<I: IntoIterator<Item = Keylet>>(keylets: I) -> Self {
        Composite(keylets.into_iter().map(Some).collect())
    }

    /// Composite from raw slots. Trailing empty slots are dropped so that
    /// equal keys always produce equal composites.
    pub fn from_slots<I: IntoIterator<Item = Slot>>(slots: I) -> Self {
        let mut slots: SmallVec<[Slot; 4]> = slots.into_iter().collect();
        while matches!(slots.last(), Some(None)) {
            slots.pop();
        }
        Composite(slots)
    }

    /// All slots, including empty ones.
    pub fn slots(&self) -> &[Slot] {
        &self.0
    }

    /// Keylet at `position`, `None` when the slot is empty or out of range.
    pub fn slot(&self, position: usize) -> Slot {
        self.0.get(position).copied().flatten()
    }

    /// Number of slots.
    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// True for the composite of the empty key.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Occupied slots in positional order, with repeats.
    pub fn keylets(&self) -> impl Iterator<Item = Keylet> + '_ {
        self.0.iter().filter_map(|slot| *slot)
    }

    /// Occupied slots without repeats, sorted by identifier.
    pub fn distinct_keylets(&self) -> SmallVec<[Keylet; 4]> {
        let mut keylets: SmallVec<[Keylet; 4]> = self.keylets().collect();
        keylets.sort_unstable();
        keylets.dedup();
        keylets
    }

    /// Sort occupied slots by identifier (unordered keys).
    pub(crate) fn sort(&mut self) {
        self.0.sort_unstable();
    }
}

impl fmt::Display for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, slot) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", KEYLET_SEPARATOR)?;
            }
            if let Some(keylet) = slot {
                write!(f, "{}", keylet)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Composite({})", self)
    }
}
