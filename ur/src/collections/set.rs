// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

use core::hash::{BuildHasher, Hash};

/// An unordered set.
pub trait Set<T>: Clone + Default + Extend<T> {
    /// Iterator over borrowed elements.
    type Iter<'a>: Iterator<Item = &'a T>
    where
        T: 'a,
        Self: 'a;

    /// Insert `value`, returning whether it was newly added. Fails with the
    /// rejected value when the set is at capacity.
    fn insert(&mut self, value: T) -> Result<bool, T>;

    /// Remove `value`, returning whether it was present.
    fn remove(&mut self, value: &T) -> bool;

    /// Whether `value` is present.
    fn contains(&self, value: &T) -> bool;

    /// Some element of the set, when non-empty.
    fn first(&self) -> Option<&T>;

    /// Whether every element of `self` is contained in `other`.
    fn is_subset(&self, other: &Self) -> bool;

    /// Elements of `self` that are not in `other`, as a new set.
    fn difference(&self, other: &Self) -> Self;

    /// Number of elements.
    fn len(&self) -> usize;

    /// Whether the set is empty.
    #[must_use]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all elements.
    fn clear(&mut self);

    /// Iterate over the elements.
    fn iter(&self) -> Self::Iter<'_>;
}

#[cfg(feature = "alloc")]
impl<T> Set<T> for alloc::collections::BTreeSet<T>
where
    T: Clone + Ord,
{
    type Iter<'a> = alloc::collections::btree_set::Iter<'a, T> where T: 'a, Self: 'a;

    fn insert(&mut self, value: T) -> Result<bool, T> {
        Ok(alloc::collections::BTreeSet::insert(self, value))
    }

    fn remove(&mut self, value: &T) -> bool {
        alloc::collections::BTreeSet::remove(self, value)
    }

    fn contains(&self, value: &T) -> bool {
        alloc::collections::BTreeSet::contains(self, value)
    }

    fn first(&self) -> Option<&T> {
        alloc::collections::BTreeSet::first(self)
    }

    fn is_subset(&self, other: &Self) -> bool {
        alloc::collections::BTreeSet::is_subset(self, other)
    }

    fn difference(&self, other: &Self) -> Self {
        alloc::collections::BTreeSet::difference(self, other)
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        alloc::collections::BTreeSet::len(self)
    }

    fn clear(&mut self) {
        alloc::collections::BTreeSet::clear(self);
    }

    fn iter(&self) -> Self::Iter<'_> {
        alloc::collections::BTreeSet::iter(self)
    }
}

impl<T, S, const N: usize> Set<T> for heapless::IndexSet<T, S, N>
where
    T: Clone + Eq + Hash,
    S: BuildHasher + Clone + Default,
{
    type Iter<'a> = heapless::IndexSetIter<'a, T> where T: 'a, Self: 'a;

    fn insert(&mut self, value: T) -> Result<bool, T> {
        heapless::IndexSet::insert(self, value)
    }

    fn remove(&mut self, value: &T) -> bool {
        heapless::IndexSet::remove(self, value)
    }

    fn contains(&self, value: &T) -> bool {
        heapless::IndexSet::contains(self, value)
    }

    fn first(&self) -> Option<&T> {
        heapless::IndexSet::first(self)
    }

    fn is_subset(&self, other: &Self) -> bool {
        heapless::IndexSet::is_subset(self, other)
    }

    fn difference(&self, other: &Self) -> Self {
        let mut out = Self::default();
        out.extend(heapless::IndexSet::difference(self, other).cloned());
        out
    }

    fn len(&self) -> usize {
        heapless::IndexSet::len(self)
    }

    fn clear(&mut self) {
        heapless::IndexSet::clear(self);
    }

    fn iter(&self) -> Self::Iter<'_> {
        heapless::IndexSet::iter(self)
    }
}
