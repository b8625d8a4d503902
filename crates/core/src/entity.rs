//! Entity trait: identity + continuity across state changes.

use std::collections::HashSet;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Returns the first identifier that appears more than once in `items`.
pub fn find_duplicate_id<E: Entity>(items: &[E]) -> Option<&E::Id> {
    let mut seen = HashSet::with_capacity(items.len());
    items.iter().map(|item| item.id()).find(|id| !seen.insert(*id))
}
