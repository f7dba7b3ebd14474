use core::fmt;
use core::iter::FromIterator;
use core::ops::{Index, IndexMut};
use core::slice;

use allocator_api2::vec::Vec;

use super::Value;
use crate::allocator::{self, AllocError, Allocator, Global};

/// A JSON array: a growable, contiguous sequence of [`Value`]s.
#[derive(Clone)]
pub struct Array<A: Allocator = Global> {
    items: Vec<Value<A>, A>,
}

impl<A: Allocator> Array<A> {
    /// Creates an empty array. Doesn't allocate.
    pub fn new_in(alloc: A) -> Self {
        Array {
            items: Vec::new_in(alloc),
        }
    }

    /// Creates an empty array with room for `capacity` elements.
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, AllocError> {
        let mut items = Vec::new_in(alloc);
        allocator::reserve_exact(&mut items, capacity)?;
        Ok(Array { items })
    }

    /// Deep copy into `alloc`, with the same capacity as `self`.
    pub fn try_clone_in(&self, alloc: A) -> Result<Self, AllocError> {
        let mut items = Vec::new_in(alloc.clone());
        allocator::reserve_exact(&mut items, self.items.capacity())?;
        for item in self.iter() {
            items.push(item.try_clone_in(alloc.clone())?);
        }
        Ok(Array { items })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of elements the array can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Reserves room for at least `additional` more elements.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        allocator::reserve(&mut self.items, additional)
    }

    /// Appends `value`, growing the buffer geometrically when it is full.
    ///
    /// On allocation failure the array is unchanged and `value` is dropped.
    pub fn push_back(&mut self, value: Value<A>) -> Result<(), AllocError> {
        allocator::reserve(&mut self.items, 1)?;
        self.items.push(value);
        Ok(())
    }

    /// Removes and returns the last element.
    pub fn pop(&mut self) -> Option<Value<A>> {
        self.items.pop()
    }

    /// Checked read access.
    pub fn get(&self, index: usize) -> Option<&Value<A>> {
        self.items.get(index)
    }

    /// Checked write access.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Value<A>> {
        self.items.get_mut(index)
    }

    /// The elements as a slice.
    pub fn as_slice(&self) -> &[Value<A>] {
        &self.items
    }

    /// The elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [Value<A>] {
        &mut self.items
    }

    /// Iterates over the elements in index order.
    pub fn iter(&self) -> slice::Iter<'_, Value<A>> {
        self.items.iter()
    }

    /// Iterates mutably over the elements in index order.
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, Value<A>> {
        self.items.iter_mut()
    }

    /// The allocator backing this array.
    pub fn allocator(&self) -> &A {
        self.items.allocator()
    }
}

impl<A: Allocator> Drop for Array<A> {
    fn drop(&mut self) {
        let alloc = self.items.allocator().clone();
        super::walk::release(self.items.iter_mut(), &alloc);
    }
}

impl Array<Global> {
    /// Creates an empty array in the global allocator.
    pub fn new() -> Self {
        Array::new_in(Global)
    }
}

impl Default for Array<Global> {
    fn default() -> Self {
        Array::new()
    }
}

impl FromIterator<Value<Global>> for Array<Global> {
    fn from_iter<I: IntoIterator<Item = Value<Global>>>(iter: I) -> Self {
        let mut items = Vec::new_in(Global);
        for value in iter {
            items.push(value);
        }
        Array { items }
    }
}

impl<A: Allocator> Index<usize> for Array<A> {
    type Output = Value<A>;

    fn index(&self, index: usize) -> &Value<A> {
        &self.items[index]
    }
}

impl<A: Allocator> IndexMut<usize> for Array<A> {
    fn index_mut(&mut self, index: usize) -> &mut Value<A> {
        &mut self.items[index]
    }
}

impl<'a, A: Allocator> IntoIterator for &'a Array<A> {
    type Item = &'a Value<A>;
    type IntoIter = slice::Iter<'a, Value<A>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<A: Allocator> PartialEq for Array<A> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a.equals(b))
    }
}

impl<A: Allocator> fmt::Debug for Array<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_back_keeps_order() {
        let mut array = Array::new();
        for i in 0..100 {
            array.push_back(Value::Integer(i)).unwrap();
        }
        assert_eq!(array.len(), 100);
        for (i, item) in array.iter().enumerate() {
            assert_eq!(*item, Value::Integer(i as i64));
        }
        assert!(array.capacity() >= 100);
    }

    #[test]
    fn indexed_access() {
        let mut array: Array = vec_of(&[1, 2, 3]);
        array[1] = Value::Boolean(true);
        assert_eq!(array[1], Value::Boolean(true));
        assert_eq!(array.get(3), None);
        *array.get_mut(0).unwrap() = Value::Null;
        assert_eq!(array.as_slice()[0], Value::Null);
    }

    #[test]
    fn presized() {
        let array = Array::try_with_capacity_in(16, Global).unwrap();
        assert_eq!(array.len(), 0);
        assert!(array.capacity() >= 16);
        let copy = array.try_clone_in(Global).unwrap();
        assert!(copy.capacity() >= 16);
    }

    #[test]
    fn equality() {
        assert_eq!(vec_of(&[1, 2]), vec_of(&[1, 2]));
        assert_ne!(vec_of(&[1, 2]), vec_of(&[2, 1]));
        assert_ne!(vec_of(&[1, 2]), vec_of(&[1, 2, 3]));
    }

    fn vec_of(ints: &[i64]) -> Array {
        ints.iter().map(|&i| Value::Integer(i)).collect()
    }
}
