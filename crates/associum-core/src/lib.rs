//! Associum Core — Composite-Key Associative Containers
//!
//! Maps keyed by tuples or by records of named fields, where every sub-key
//! is interned once into a compact keylet and shared by reference count
//! across all keys that use it.
//!
//! # Architecture
//!
//! - **Interning**: each distinct sub-key (and each distinct collection
//!   element) gets one keylet, reclaimed when the last user goes away
//! - **Codecs**: ordered tuples, unordered tuples, structured records and
//!   scalars all encode to the same positional [`Composite`]
//! - **Indices**: opt-in reverse indices answer containment and positional
//!   queries over keys, and over array, set or interned values
//!
//! ```
//! use associum_core::QueryableOrderedMap;
//!
//! let mut map = QueryableOrderedMap::<&str, u32>::new();
//! map.set(&["eu", "web", "prod"], 1).unwrap();
//! map.set(&["us", "web", "dev"], 2).unwrap();
//!
//! assert_eq!(map.get(&["eu", "web", "prod"]), Some(&1));
//! assert_eq!(map.query_indexed_with(&["web"]).len(), 2);
//! assert_eq!(map.query_matching(&[Some("us"), None, None]).len(), 1);
//! ```
//!
//! # No Interior Mutability
//!
//! Containers are plain owned values: mutation takes `&mut self` and there
//! is no internal locking. Wrap a container in a lock to share it.

pub mod codec;
pub mod config;
pub mod container;
pub mod error;
pub mod index;
pub mod interner;
pub mod keylet;
pub mod value;

// Re-export key types for convenience
pub use codec::{KeyCodec, Ordered, PositionalCodec, Scalar, Structured, Unordered};
pub use config::AssocConfig;
pub use container::{AssocMap, AssocStats, QueryResult};
pub use error::{AssocError, AssocResult};
pub use index::{KeyIndexing, PlainKeys, QueryableKeys};
pub use interner::{Interner, InternerStats};
pub use keylet::{Composite, Keylet};
pub use value::{
    ArrayValued, ElementLayout, Interned, Occurrence, PlainValues, QueryableValues, Raw, SetValued, ValueIndexing,
    ValueLayout,
};

/// Tuple keys, position significant, raw values.
pub type OrderedMap<T, V> = AssocMap<Ordered<T>, Raw<V>>;

/// Tuple keys, position ignored, raw values.
pub type UnorderedMap<T, V> = AssocMap<Unordered<T>, Raw<V>>;

/// Record keys of `(field, part)` pairs, raw values.
pub type StructuredMap<F, T, V> = AssocMap<Structured<F, T>, Raw<V>>;

/// [`OrderedMap`] with containment, positional and fragment queries.
pub type QueryableOrderedMap<T, V> = AssocMap<Ordered<T>, Raw<V>, QueryableKeys>;

/// [`UnorderedMap`] with containment queries.
pub type QueryableUnorderedMap<T, V> = AssocMap<Unordered<T>, Raw<V>, QueryableKeys>;

/// [`StructuredMap`] with containment and partial-record queries.
pub type QueryableStructuredMap<F, T, V> = AssocMap<Structured<F, T>, Raw<V>, QueryableKeys>;
