use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use indexmap::IndexSet;
use tracing::trace;

use crate::codec::{KeyCodec, KeyletTemplate, PositionalCodec};
use crate::config::AssocConfig;
use crate::error::{AssocError, AssocResult};
use crate::interner::Interner;
use crate::keylet::{Composite, Keylet, Slot};

/// Record keys made of named fields, e.g. `[("user", "u1"), ("role", "admin")]`.
///
/// Each field name gets a fixed position the first time a stored key uses
/// it; the position never changes afterwards. Keys are projected onto those
/// positions, leaving fields a key does not set empty, so records with
/// different field sets coexist in one container. Field order within a key
/// does not matter.
pub struct Structured<F, T> {
    /// Field name -> position (the index in the set). Append-only.
    fields: IndexSet<F>,
    _parts: PhantomData<fn() -> T>,
}

impl<F, T> Default for Structured<F, T> {
    fn default() -> Self {
        Self {
            fields: IndexSet::new(),
            _parts: PhantomData,
        }
    }
}

impl<F: fmt::Debug, T> fmt::Debug for Structured<F, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Structured").field("fields", &self.fields).finish()
    }
}

impl<F, T> Structured<F, T>
where
    F: Eq + Hash + Clone + fmt::Debug,
{
    /// Position assigned to `field`, if any stored key ever used it.
    pub fn field_position(&self, field: &F) -> Option<usize> {
        self.fields.get_index_of(field)
    }

    /// Registered field names in position order.
    pub fn fields(&self) -> impl Iterator<Item = &F> {
        self.fields.iter()
    }

    /// Positions `key` would occupy, assigning unseen fields the next free
    /// positions in key order without registering them.
    fn planned_positions(&self, key: &[(F, T)]) -> Vec<usize> {
        let mut next = self.fields.len();
        key.iter()
            .map(|(field, _)| {
                self.fields.get_index_of(field).unwrap_or_else(|| {
                    next += 1;
                    next - 1
                })
            })
            .collect()
    }
}

/// First field that appears twice in `key`.
fn repeated_field<F: PartialEq, T>(key: &[(F, T)]) -> Option<&F> {
    key.iter()
        .enumerate()
        .find(|(i, (field, _))| key[..*i].iter().any(|(seen, _)| seen == field))
        .map(|(_, (field, _))| field)
}

fn width<'a, I: IntoIterator<Item = &'a usize>>(positions: I) -> usize {
    positions.into_iter().max().map_or(0, |max| max + 1)
}

impl<F, T> KeyCodec for Structured<F, T>
where
    F: Eq + Hash + Clone + fmt::Debug,
    T: Eq + Hash + Clone,
{
    type Part = T;
    type KeyRef = [(F, T)];
    type Key = Vec<(F, T)>;

    fn encode_for_insert(
        &self,
        key: &[(F, T)],
        interner: &mut Interner<T>,
        config: &AssocConfig,
    ) -> AssocResult<Composite> {
        config.check_arity(key.len())?;
        if let Some(field) = repeated_field(key) {
            return Err(AssocError::DuplicateField { field: format!("{:?}", field) });
        }

        let positions = self.planned_positions(key);
        let mut slots: Vec<Slot> = vec![None; width(&positions)];
        let mut interned: Vec<Keylet> = Vec::with_capacity(key.len());
        for (&position, (_, part)) in positions.iter().zip(key) {
            match interner.intern(part) {
                Ok(keylet) => {
                    slots[position] = Some(keylet);
                    interned.push(keylet);
                }
                Err(err) => {
                    interner.forget_unbound(interned);
                    return Err(err);
                }
            }
        }
        Ok(Composite::from_slots(slots))
    }

    fn commit(&mut self, key: &[(F, T)]) {
        for (field, _) in key {
            if self.fields.contains(field) {
                continue;
            }
            let (position, _) = self.fields.insert_full(field.clone());
            trace!(?field, position, "registered field");
        }
    }

    fn encode_for_probe(&self, key: &[(F, T)], interner: &Interner<T>) -> Option<Composite> {
        if repeated_field(key).is_some() {
            return None;
        }
        let positions = key
            .iter()
            .map(|(field, _)| self.fields.get_index_of(field))
            .collect::<Option<Vec<usize>>>()?;
        let mut slots: Vec<Slot> = vec![None; width(&positions)];
        for (&position, (_, part)) in positions.iter().zip(key) {
            slots[position] = Some(interner.lookup(part)?);
        }
        Some(Composite::from_slots(slots))
    }

    fn decode(&self, composite: &Composite, interner: &Interner<T>) -> Vec<(F, T)> {
        composite
            .slots()
            .iter()
            .enumerate()
            .filter_map(|(position, slot)| {
                let keylet = (*slot)?;
                let field = self.fields.get_index(position)?;
                Some((field.clone(), interner.resolve(keylet).clone()))
            })
            .collect()
    }
}

impl<F, T> PositionalCodec for Structured<F, T>
where
    F: Eq + Hash + Clone + fmt::Debug,
    T: Eq + Hash + Clone,
{
    /// Partial record: the fields that must match.
    type Template = [(F, T)];

    fn normalize_query(&self, template: &[(F, T)], interner: &Interner<T>) -> Option<KeyletTemplate> {
        let mut constrained = Vec::with_capacity(template.len());
        for (field, part) in template {
            let position = self.fields.get_index_of(field)?;
            constrained.push((position, interner.lookup(part)?));
        }

        let mut keylets: KeyletTemplate = vec![None; width(constrained.iter().map(|(p, _)| p))];
        for (position, keylet) in constrained {
            let existing = keylets[position];
            match existing {
                // Same field constrained to two different values.
                Some(other) if other != keylet => return None,
                _ => keylets[position] = Some(keylet),
            }
        }
        Some(keylets)
    }
}
