//! Composite key codecs
//!
//! A codec turns a caller's key (a tuple, a record of named fields, or a
//! single value) into a [`Composite`] of keylets and back. Inserting paths
//! intern sub-keys; probing paths only look them up, so a key containing a
//! sub-key that was never stored cannot match anything.
//!
//! | Codec          | Key shape  | Positions     | Positional templates |
//! |----------------|------------|---------------|----------------------|
//! | [`Ordered`]    | `[T]`      | significant   | yes                  |
//! | [`Unordered`]  | `[T]`      | ignored       | no                   |
//! | [`Structured`] | `[(F, T)]` | by field name | yes                  |
//! | [`Scalar`]     | `T`        | one           | no                   |

mod ordered;
mod scalar;
mod structured;
mod unordered;

pub use ordered::Ordered;
pub use scalar::Scalar;
pub use structured::Structured;
pub use unordered::Unordered;

use std::hash::Hash;

use crate::config::AssocConfig;
use crate::error::AssocResult;
use crate::interner::Interner;
use crate::keylet::{Composite, Keylet};

/// Sparse positional keylet array produced from a query template.
pub type KeyletTemplate = Vec<Option<Keylet>>;

/// Strategy for encoding keys into composites.
pub trait KeyCodec: Default {
    /// Type of one sub-key.
    type Part: Eq + Hash + Clone;
    /// Key as accepted by `set`/`get`.
    type KeyRef: ?Sized;
    /// Key as handed back by iteration and queries.
    type Key;

    /// Encode a key for storage, interning sub-keys that are not interned
    /// yet. Fails on keys the container must reject.
    ///
    /// The codec itself is left untouched; anything it has to remember about
    /// a stored key is recorded by [`commit`](KeyCodec::commit).
    fn encode_for_insert(
        &self,
        key: &Self::KeyRef,
        interner: &mut Interner<Self::Part>,
        config: &AssocConfig,
    ) -> AssocResult<Composite>;

    /// Called once the entry for `key` is stored. Must leave the positions
    /// `encode_for_insert` produced for `key` unchanged.
    fn commit(&mut self, _key: &Self::KeyRef) {}

    /// Encode a key for lookup. `None` when any sub-key was never interned.
    fn encode_for_probe(&self, key: &Self::KeyRef, interner: &Interner<Self::Part>) -> Option<Composite>;

    /// Rebuild the key of a stored composite.
    fn decode(&self, composite: &Composite, interner: &Interner<Self::Part>) -> Self::Key;
}

/// Codecs whose positions carry meaning, so sparse templates can be matched
/// slot by slot.
pub trait PositionalCodec: KeyCodec {
    /// Partial key with some positions left open.
    type Template: ?Sized;

    /// Resolve a template into keylets by position. `None` when a constrained
    /// position names a sub-key (or field) that was never stored.
    fn normalize_query(&self, template: &Self::Template, interner: &Interner<Self::Part>) -> Option<KeyletTemplate>;
}

/// Intern every part, undoing the batch if the interner runs out of
/// identifiers halfway.
pub(crate) fn intern_parts<T>(parts: &[T], interner: &mut Interner<T>) -> AssocResult<Vec<Keylet>>
where
    T: Eq + Hash + Clone,
{
    let mut keylets = Vec::with_capacity(parts.len());
    for part in parts {
        match interner.intern(part) {
            Ok(keylet) => keylets.push(keylet),
            Err(err) => {
                interner.forget_unbound(keylets);
                return Err(err);
            }
        }
    }
    Ok(keylets)
}

/// Look up every part of a tuple key, failing on the first unknown part.
fn probe_parts<'a, T, I>(parts: I, interner: &Interner<T>) -> Option<Vec<Keylet>>
where
    T: Eq + Hash + Clone + 'a,
    I: IntoIterator<Item = &'a T>,
{
    parts.into_iter().map(|part| interner.lookup(part)).collect()
}

/// Decode every occupied slot in positional order.
fn decode_parts<T>(composite: &Composite, interner: &Interner<T>) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    composite.keylets().map(|keylet| interner.resolve(keylet).clone()).collect()
}

/// Resolve the constrained positions of a positional template.
fn normalize_positions<T>(template: &[Option<T>], interner: &Interner<T>) -> Option<KeyletTemplate>
where
    T: Eq + Hash + Clone,
{
    template
        .iter()
        .map(|position| match position {
            Some(part) => interner.lookup(part).map(Some),
            None => Some(None),
        })
        .collect()
}
