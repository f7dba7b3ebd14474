// Tree walks that keep their work list on the heap. A parsed tree can be nested as deep as
// memory allows, so dropping, copying and comparing it must not recurse once per level.

use allocator_api2::vec::Vec;

use super::{Array, Object, Value};
use crate::allocator::{self, AllocError, Allocator};

// Moves every non-empty container among `children` onto `stack`, leaving `Null` behind. Stops
// early when the stack can't grow; whatever is left is dropped with its parent.
fn detach<'a, A, I>(children: I, stack: &mut Vec<Value<A>, A>)
where
    A: Allocator + 'a,
    I: Iterator<Item = &'a mut Value<A>>,
{
    for child in children {
        let nested = match child {
            Value::Array(array) => !array.is_empty(),
            Value::Object(object) => !object.is_empty(),
            _ => false,
        };
        if nested {
            if allocator::reserve(stack, 1).is_err() {
                return;
            }
            stack.push(child.take());
        }
    }
}

/// Drops the values behind `children` one container at a time.
///
/// Each container taken off the work stack is emptied of nested containers before it is
/// dropped, so its own `Drop` finds nothing left to walk.
pub(super) fn release<'a, A, I>(children: I, alloc: &A)
where
    A: Allocator + 'a,
    I: Iterator<Item = &'a mut Value<A>>,
{
    let mut stack = Vec::new_in(alloc.clone());
    detach(children, &mut stack);
    while let Some(mut value) = stack.pop() {
        match &mut value {
            Value::Array(array) => detach(array.iter_mut(), &mut stack),
            Value::Object(object) => detach(object.iter_mut().map(|(_, v)| v), &mut stack),
            _ => {}
        }
    }
}

// A container whose copy is being filled in.
enum Frame<'v, A: Allocator> {
    Array {
        source: &'v Array<A>,
        next: usize,
        copy: Array<A>,
    },
    Object {
        source: &'v Object<A>,
        next: usize,
        copy: Object<A>,
    },
}

impl<'v, A: Allocator> Frame<'v, A> {
    fn next_child(&mut self) -> Option<&'v Value<A>> {
        match self {
            Frame::Array { source, next, .. } => {
                let source: &'v Array<A> = *source;
                let item = source.get(*next);
                if item.is_some() {
                    *next += 1;
                }
                item
            }
            Frame::Object { source, next, .. } => {
                let source: &'v Object<A> = *source;
                let slots = source.slots();
                while *next < slots.len() {
                    let slot = &slots[*next];
                    *next += 1;
                    if slot.is_active() {
                        return Some(slot.value());
                    }
                }
                None
            }
        }
    }

    // Stores the copy of the child last returned by `next_child`.
    fn attach(&mut self, value: Value<A>, alloc: &A) -> Result<(), AllocError> {
        match self {
            Frame::Array { copy, .. } => copy.push_back(value),
            Frame::Object { source, next, copy } => {
                let index = *next - 1;
                let key = source.slots()[index].key().try_clone_in(alloc.clone())?;
                copy.set_slot(index, key, value);
                Ok(())
            }
        }
    }

    fn finish(self) -> Value<A> {
        match self {
            Frame::Array { copy, .. } => Value::Array(copy),
            Frame::Object { copy, .. } => Value::Object(copy),
        }
    }
}

/// Deep copy of `source` into `alloc`. Arrays keep their capacity, objects their table layout.
pub(super) fn copy<A: Allocator>(source: &Value<A>, alloc: A) -> Result<Value<A>, AllocError> {
    let mut stack: Vec<Frame<'_, A>, A> = Vec::new_in(alloc.clone());
    let mut pending = Some(source);
    let mut carry = None;
    loop {
        if let Some(value) = pending.take() {
            let frame = match value {
                Value::Array(array) => Some(Frame::Array {
                    source: array,
                    next: 0,
                    copy: Array::try_with_capacity_in(array.capacity(), alloc.clone())?,
                }),
                Value::Object(object) => Some(Frame::Object {
                    source: object,
                    next: 0,
                    copy: Object::try_with_table_size_in(object.table_size(), alloc.clone())?,
                }),
                Value::String(s) => {
                    carry = Some(Value::String(s.try_clone_in(alloc.clone())?));
                    None
                }
                scalar => {
                    carry = scalar.copy_scalar();
                    None
                }
            };
            if let Some(frame) = frame {
                allocator::reserve(&mut stack, 1)?;
                stack.push(frame);
            }
        }

        let top = match stack.last_mut() {
            Some(top) => top,
            None => return Ok(carry.unwrap_or(Value::Null)),
        };
        if let Some(value) = carry.take() {
            top.attach(value, &alloc)?;
        }
        match top.next_child() {
            Some(child) => pending = Some(child),
            None => carry = stack.pop().map(Frame::finish),
        }
    }
}

fn same_leaf<A: Allocator>(a: &Value<A>, b: &Value<A>) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Decimal(a), Value::Decimal(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        _ => false,
    }
}

/// Structural equality, see [`Value::equals`].
///
/// Child pairs wait on a stack drawn from `a`'s allocator. A pair that can't be pushed is
/// compared on the spot instead.
pub(super) fn equal<A: Allocator>(a: &Value<A>, b: &Value<A>) -> bool {
    let mut stack = match a.allocator() {
        Some(alloc) => Vec::new_in(alloc.clone()),
        None => return same_leaf(a, b),
    };
    let mut pair = (a, b);
    loop {
        match pair {
            (Value::Array(a), Value::Array(b)) => {
                if a.len() != b.len() {
                    return false;
                }
                if allocator::reserve(&mut stack, a.len()).is_ok() {
                    stack.extend(a.iter().zip(b.iter()));
                } else if a != b {
                    return false;
                }
            }
            (Value::Object(a), Value::Object(b)) => {
                if a.len() != b.len() {
                    return false;
                }
                for (key, ours) in a.iter() {
                    let theirs = match b.lookup(key.as_bytes()) {
                        Some(theirs) => theirs,
                        None => return false,
                    };
                    if allocator::reserve(&mut stack, 1).is_ok() {
                        stack.push((ours, theirs));
                    } else if !ours.equals(theirs) {
                        return false;
                    }
                }
            }
            (a, b) => {
                if !same_leaf(a, b) {
                    return false;
                }
            }
        }
        pair = match stack.pop() {
            Some(next) => next,
            None => return true,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Budget, Global};

    // `[[...[{"k": [leaf]}]...]]`, built without the parser.
    fn nested(depth: usize, leaf: i64) -> Value {
        let mut object = Object::new();
        object
            .insert(b"k", Value::Array([Value::Integer(leaf)].iter().cloned().collect()))
            .unwrap();
        let mut value = Value::Object(object);
        for _ in 0..depth {
            let mut array = Array::new();
            array.push_back(value).unwrap();
            value = Value::Array(array);
        }
        value
    }

    #[test]
    fn deep_tree_copies_compares_and_drops() {
        let depth = 200_000;
        let value = nested(depth, 7);
        let copy = value.try_clone().unwrap();
        assert!(copy == value);

        let mut other = nested(depth - 1, 7);
        assert!(other != value);
        assert!(nested(depth, 8) != value);
        other = Value::Array([other].iter().cloned().collect());
        assert!(other == value);

        drop(copy);
        drop(other);
        drop(value);
    }

    #[test]
    fn deep_tree_in_a_budget_is_released() {
        let budget = Budget::new(Global, 64 << 20);
        let mut value = Value::Null;
        for i in 0..100_000 {
            let mut array = Array::try_with_capacity_in(1, &budget).unwrap();
            array.push_back(value).unwrap();
            if i % 2 == 0 {
                value = Value::Array(array);
            } else {
                let mut object = Object::try_with_table_size_in(1, &budget).unwrap();
                object.insert(b"a", Value::Array(array)).unwrap();
                value = Value::Object(object);
            }
        }
        assert!(budget.in_use() > 0);
        drop(value);
        assert_eq!(budget.in_use(), 0);
    }

    #[test]
    fn copy_keeps_object_layout() {
        let mut object = Object::try_with_table_size_in(8, Global).unwrap();
        object.insert(b"a", Value::from("x")).unwrap();
        object.insert(b"b", Value::Array(Array::new())).unwrap();
        let value = Value::Object(object);

        let copy = copy(&value, Global).unwrap();
        let (ours, theirs) = (value.as_object().unwrap(), copy.as_object().unwrap());
        assert_eq!(theirs.table_size(), 8);
        assert_eq!(theirs.len(), 2);
        for (a, b) in ours.slots().iter().zip(theirs.slots()) {
            assert_eq!(a.is_active(), b.is_active());
            assert_eq!(a.key(), b.key());
        }
    }

    #[test]
    fn failed_copy_releases_partial_work() {
        let roomy = Budget::new(Global, 1 << 20);
        let tight = Budget::new(Global, 200);
        let value = crate::from_slice_in(br#"[[1, 2], {"a": "bcdefgh"}, [[[]]]]"#, &roomy).unwrap();
        assert!(value.try_clone_in(&tight).is_err());
        assert_eq!(tight.in_use(), 0);
    }
}
