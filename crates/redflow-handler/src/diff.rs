//! Attribute diffing for update gating
//!
//! Tracked attributes are an explicit list of named comparators, built with
//! [`tracked_fields!`](crate::tracked_fields), so a new model field is never
//! compared by accident and a test can enumerate the list.

use std::collections::HashSet;
use std::hash::Hash;

/// A named comparison between two versions of a model
pub struct TrackedField<M> {
    pub name: &'static str,
    pub differs: fn(&M, &M) -> bool,
}

impl<M> Clone for TrackedField<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for TrackedField<M> {}

impl<M> std::fmt::Debug for TrackedField<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedField")
            .field("name", &self.name)
            .finish()
    }
}

/// Build a `&[TrackedField<Model>]` comparing the named fields with `!=`
#[macro_export]
macro_rules! tracked_fields {
    ($model:ty; $($field:ident),+ $(,)?) => {
        &[
            $(
                $crate::diff::TrackedField::<$model> {
                    name: stringify!($field),
                    differs: |a: &$model, b: &$model| a.$field != b.$field,
                },
            )+
        ]
    };
}

/// Names of the tracked fields that differ
pub fn changed_fields<M>(fields: &[TrackedField<M>], desired: &M, previous: &M) -> Vec<&'static str> {
    fields
        .iter()
        .filter(|field| (field.differs)(desired, previous))
        .map(|field| field.name)
        .collect()
}

/// Whether any tracked field changed; no previous model means create
pub fn any_changed<M>(fields: &[TrackedField<M>], desired: &M, previous: Option<&M>) -> bool {
    match previous {
        None => true,
        Some(previous) => fields.iter().any(|field| (field.differs)(desired, previous)),
    }
}

/// Diff gate for a single value; no previous model means create
pub fn value_changed<M, T: PartialEq>(desired: &M, previous: Option<&M>, get: impl Fn(&M) -> T) -> bool {
    match previous {
        None => true,
        Some(previous) => get(desired) != get(previous),
    }
}

/// Order-insensitive equality
pub fn set_eq<T: Eq + Hash>(a: &[T], b: &[T]) -> bool {
    let left: HashSet<&T> = a.iter().collect();
    let right: HashSet<&T> = b.iter().collect();
    left == right
}

/// Items of `a` not present in `b`, in `a`'s order
pub fn set_difference<'a, T: Eq + Hash>(a: &'a [T], b: &[T]) -> Vec<&'a T> {
    let right: HashSet<&T> = b.iter().collect();
    a.iter().filter(|item| !right.contains(item)).collect()
}
