//! Value layouts and the value index
//!
//! A [`ValueLayout`] decides how an entry's value is stored:
//!
//! - [`Raw`]: the value itself, untouched
//! - [`Interned`]: a scalar interned through the value interner
//! - [`ArrayValued`]: an ordered sequence of interned elements
//! - [`SetValued`]: an insertion-ordered set of interned elements
//!
//! Interned elements are reference counted exactly like key sub-keys, in a
//! separate interner owned by the same container. With [`QueryableValues`]
//! selected, each element keylet also records which entries hold it and how
//! many times.

mod array;
mod raw;
mod set;

pub use array::{ArrayValued, Occurrence};
pub use raw::{Interned, Raw};
pub use set::SetValued;

use std::hash::Hash;

use hashbrown::HashMap;

use crate::codec::KeyCodec;
use crate::config::AssocConfig;
use crate::container::{AssocMap, QueryResult};
use crate::error::AssocResult;
use crate::index::{intersect, KeyIndexing};
use crate::interner::Interner;
use crate::keylet::{Composite, Keylet};

/// How an entry's value is stored and handed back.
pub trait ValueLayout {
    /// Value as passed to `set`.
    type Input;
    /// Interned element type; `Infallible` for layouts that intern nothing.
    type Element: Eq + Hash + Clone;
    /// Stored representation.
    type Stored;
    /// Value as returned by `get`, iteration and queries.
    type Output<'a>
    where
        Self: 'a;
    /// Element keylets held by a stored value, with repeats.
    type Elements<'a>: Iterator<Item = Keylet>
    where
        Self: 'a;

    /// Convert an input value, interning its elements (unbound).
    fn encode(input: Self::Input, interner: &mut Interner<Self::Element>, config: &AssocConfig) -> AssocResult<Self::Stored>;

    /// Rebuild the caller-facing value.
    fn decode<'a>(stored: &'a Self::Stored, interner: &'a Interner<Self::Element>) -> Self::Output<'a>
    where
        Self: 'a;

    /// Element keylets to bind or release for a stored value.
    fn elements<'a>(stored: &'a Self::Stored) -> Self::Elements<'a>
    where
        Self: 'a;
}

/// Layouts whose elements are interned, so values can be queried by content.
pub trait ElementLayout: ValueLayout {}

/// Hooks run whenever a value element is bound to or released from an entry.
pub trait ValueIndexing: Default {
    /// One occurrence of `element` now belongs to `owner`.
    fn bind(&mut self, element: Keylet, owner: &Composite);
    /// One occurrence of `element` no longer belongs to `owner`.
    fn release(&mut self, element: Keylet, owner: &Composite);
    /// Forget everything.
    fn clear(&mut self);
}

/// No value index; value queries are not available.
#[derive(Debug, Default)]
pub struct PlainValues;

impl ValueIndexing for PlainValues {
    fn bind(&mut self, _element: Keylet, _owner: &Composite) {}
    fn release(&mut self, _element: Keylet, _owner: &Composite) {}
    fn clear(&mut self) {}
}

/// Index from value element keylet to the entries holding it, with an
/// occurrence count per entry.
#[derive(Debug, Default)]
pub struct QueryableValues {
    owners: HashMap<Keylet, HashMap<Composite, u32>>,
}

impl QueryableValues {
    /// Entries whose value holds `element`, with occurrence counts.
    pub fn owners(&self, element: Keylet) -> Option<&HashMap<Composite, u32>> {
        self.owners.get(&element)
    }

    /// How many times `owner`'s value holds `element`.
    pub fn occurrences(&self, element: Keylet, owner: &Composite) -> u32 {
        self.owners
            .get(&element)
            .and_then(|owners| owners.get(owner))
            .copied()
            .unwrap_or(0)
    }

    /// Entries whose value holds every element.
    pub fn containing_all(&self, elements: &[Keylet]) -> Vec<&Composite> {
        let mut buckets = Vec::with_capacity(elements.len());
        for element in elements {
            match self.owners.get(element) {
                Some(owners) => buckets.push(owners),
                None => return Vec::new(),
            }
        }
        intersect(buckets)
    }
}

impl ValueIndexing for QueryableValues {
    fn bind(&mut self, element: Keylet, owner: &Composite) {
        let owners = self.owners.entry(element).or_default();
        match owners.get_mut(owner) {
            Some(count) => *count += 1,
            None => {
                owners.insert(owner.clone(), 1);
            }
        }
    }

    fn release(&mut self, element: Keylet, owner: &Composite) {
        let Some(owners) = self.owners.get_mut(&element) else {
            return;
        };
        if let Some(count) = owners.get_mut(owner) {
            *count -= 1;
            if *count == 0 {
                owners.remove(owner);
            }
        }
        if owners.is_empty() {
            self.owners.remove(&element);
        }
    }

    fn clear(&mut self) {
        self.owners.clear();
    }
}

/// Value interner plus value index, bound and released together.
#[derive(Debug, Default)]
pub(crate) struct ValueStore<E, VQ> {
    pub(crate) interner: Interner<E>,
    pub(crate) index: VQ,
}

impl<E, VQ> ValueStore<E, VQ>
where
    E: Eq + Hash + Clone,
    VQ: ValueIndexing,
{
    pub(crate) fn bind<I: IntoIterator<Item = Keylet>>(&mut self, owner: &Composite, elements: I) {
        for element in elements {
            self.interner.bind([element]);
            self.index.bind(element, owner);
        }
    }

    pub(crate) fn release<I: IntoIterator<Item = Keylet>>(&mut self, owner: &Composite, elements: I) {
        for element in elements {
            self.index.release(element, owner);
            self.interner.release([element]);
        }
    }
}

impl<C, L, KQ> AssocMap<C, L, KQ, QueryableValues>
where
    C: KeyCodec,
    L: ElementLayout,
    KQ: KeyIndexing,
{
    /// Entries whose value holds every given element, in any position.
    /// An element that was never stored yields no results.
    pub fn query_values_containing(&self, elements: &[L::Element]) -> Vec<QueryResult<C::Key, L::Output<'_>>> {
        let Some(keylets) = elements
            .iter()
            .map(|element| self.values.interner.lookup(element))
            .collect::<Option<Vec<Keylet>>>()
        else {
            return Vec::new();
        };
        self.values
            .index
            .containing_all(&keylets)
            .into_iter()
            .map(|composite| self.result_for(composite))
            .collect()
    }
}
