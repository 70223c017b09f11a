use std::{
    cell::Cell,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    ops::Deref,
    ptr::{self, NonNull},
};

use crate::Address;

/// The heap cell shared by all handles that alias a value
///
/// The count and the value live in a single allocation so that the
/// free-if-zero protocol releases everything with one deallocation.
struct Inner<T> {
    count: Cell<usize>,
    value: T,
}

/// A reference-counted handle providing shared ownership of a heap value
///
/// Cloning a `Shared` produces another handle aliasing the same heap cell and
/// increments the shared count; the value is freed when the last aliasing
/// handle is dropped or [reset](Shared::reset). A handle can also be empty
/// (default-constructed, reset, or drained by [`Shared::take`]), in which case
/// it owns nothing.
///
/// The count is non-atomic, so `Shared` is `!Send` and `!Sync`; sharing values
/// across threads requires an atomically counted pointer instead.
///
/// Handle operations are associated functions rather than methods, so that
/// they never shadow methods of the pointee reached through `Deref`.
///
/// See also: [`Rc`](std::rc::Rc)
pub struct Shared<T> {
    inner: Option<NonNull<Inner<T>>>,
    phantom: PhantomData<Inner<T>>,
}

impl<T> Shared<T> {
    /// Allocates a heap cell owning `value`, with a count of 1
    pub fn new(value: T) -> Self {
        let cell = Box::new(Inner {
            count: Cell::new(1),
            value,
        });
        Self {
            inner: Some(NonNull::from(Box::leak(cell))),
            phantom: PhantomData,
        }
    }

    /// Returns true if the handle owns nothing
    pub fn is_empty(this: &Self) -> bool {
        this.inner.is_none()
    }

    /// Returns the number of live handles aliasing the owned value
    ///
    /// Returns 0 for an empty handle.
    ///
    /// See also: [`Rc::strong_count`](std::rc::Rc::strong_count)
    pub fn ref_count(this: &Self) -> usize {
        match this.inner {
            Some(cell) => unsafe { cell.as_ref() }.count.get(),
            None => 0,
        }
    }

    /// Returns true if the two handles alias the same heap cell
    ///
    /// Two empty handles are considered to alias each other.
    ///
    /// See also: [`Rc::ptr_eq`](std::rc::Rc::ptr_eq)
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.inner == other.inner
    }

    /// Returns a pointer to the owned value, or null if the handle is empty
    ///
    /// The pointer must not be retained beyond the life of the last handle
    /// aliasing the value.
    pub fn as_ptr(this: &Self) -> *const T {
        match this.inner {
            Some(cell) => unsafe { ptr::addr_of!((*cell.as_ptr()).value) },
            None => ptr::null(),
        }
    }

    /// Returns the address of the owned value, or None if the handle is empty
    pub fn address(this: &Self) -> Option<Address> {
        this.inner.map(|_| Self::as_ptr(this).into())
    }

    /// Releases the handle's ownership, leaving it empty
    ///
    /// The shared count is decremented, and the value is freed if this was the
    /// last aliasing handle. Resetting an empty handle is a no-op.
    pub fn reset(this: &mut Self) {
        if let Some(cell) = this.inner.take() {
            unsafe { release(cell) };
        }
    }

    /// Transfers ownership out of `this`, leaving it empty
    ///
    /// The shared count is unchanged: the number of live aliases is the same
    /// before and after the transfer.
    pub fn take(this: &mut Self) -> Self {
        Self {
            inner: this.inner.take(),
            phantom: PhantomData,
        }
    }
}

/// Decrements the count of `cell`, freeing it when the count reaches zero
///
/// # Safety
/// The caller relinquishes its alias of `cell`; `cell` must not be accessed
/// through the releasing handle afterwards.
unsafe fn release<T>(cell: NonNull<Inner<T>>) {
    let count = unsafe { cell.as_ref() }.count.get();
    if count == 1 {
        // Last alias out frees the cell, value and count together
        drop(unsafe { Box::from_raw(cell.as_ptr()) });
    } else {
        unsafe { cell.as_ref() }.count.set(count - 1);
    }
}

impl<T> Default for Shared<T> {
    /// Produces an empty handle, without allocating
    fn default() -> Self {
        Self {
            inner: None,
            phantom: PhantomData,
        }
    }
}

impl<T> From<T> for Shared<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T> From<Box<T>> for Shared<T> {
    /// Takes over an existing heap value
    ///
    /// The value is moved into a fresh cell with a count of 1; the original
    /// allocation is released.
    fn from(boxed: Box<T>) -> Self {
        Self::new(*boxed)
    }
}

impl<T> Clone for Shared<T> {
    /// Produces a new handle aliasing the same value, incrementing the count
    fn clone(&self) -> Self {
        if let Some(cell) = self.inner {
            let count = &unsafe { cell.as_ref() }.count;
            count.set(count.get() + 1);
        }
        Self {
            inner: self.inner,
            phantom: PhantomData,
        }
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        if let Some(cell) = self.inner.take() {
            unsafe { release(cell) };
        }
    }
}

impl<T> Deref for Shared<T> {
    type Target = T;

    /// Precondition: the handle must be non-empty.
    ///
    /// Release builds perform no check; debug builds assert.
    fn deref(&self) -> &T {
        debug_assert!(self.inner.is_some(), "dereferenced an empty handle");
        unsafe { &self.inner.unwrap_unchecked().as_ref().value }
    }
}

impl<T> PartialEq for Shared<T> {
    /// Aliasing comparison: equal iff both handles refer to the same cell
    /// (or both are empty), never a value comparison
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl<T> Eq for Shared<T> {}

impl<T> Hash for Shared<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(Self::as_ptr(self) as usize);
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner {
            Some(cell) => f
                .debug_tuple("Shared")
                .field(unsafe { &cell.as_ref().value })
                .finish(),
            None => f.write_str("Shared(empty)"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::rc::Rc;
    use test_case::test_case;

    struct Tally(Rc<Cell<usize>>);

    impl Drop for Tally {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn new_handle_has_count_one() {
        let handle = Shared::new(42);
        assert_eq!(*handle, 42);
        assert_eq!(Shared::ref_count(&handle), 1);
        assert!(!Shared::is_empty(&handle));
    }

    #[test]
    fn from_box_adopts_the_value() {
        let handle: Shared<String> = Shared::from(Box::new("owned".to_string()));
        assert_eq!(handle.as_str(), "owned");
        assert_eq!(Shared::ref_count(&handle), 1);
    }

    #[test_case(0 => 1)]
    #[test_case(1 => 2)]
    #[test_case(3 => 4)]
    fn count_tracks_live_clones(clones: usize) -> usize {
        let origin = Shared::new(0u8);
        let copies: Vec<_> = (0..clones).map(|_| origin.clone()).collect();
        for copy in &copies {
            assert_eq!(Shared::ref_count(copy), Shared::ref_count(&origin));
            assert!(Shared::ptr_eq(copy, &origin));
        }
        Shared::ref_count(&origin)
    }

    #[test]
    fn clones_alias_the_same_cell() {
        let a = Shared::new(1);
        let b = a.clone();
        assert!(Shared::ptr_eq(&a, &b));
        assert_eq!(Shared::address(&a), Shared::address(&b));
        let c = Shared::new(1);
        assert_ne!(a, c);
    }

    #[test]
    fn take_transfers_without_touching_the_count() {
        let mut a = Shared::new(7);
        let _alias = a.clone();
        let b = Shared::take(&mut a);
        assert!(Shared::is_empty(&a));
        assert_eq!(Shared::ref_count(&a), 0);
        assert_eq!(Shared::ref_count(&b), 2);
        assert_eq!(a, Shared::default());
    }

    #[test]
    fn only_the_last_alias_frees() {
        let drops = Rc::new(Cell::new(0));
        let origin = Shared::new(Tally(drops.clone()));
        let copies: Vec<_> = (0..3).map(|_| origin.clone()).collect();
        drop(copies);
        assert_eq!(drops.get(), 0);
        assert_eq!(Shared::ref_count(&origin), 1);
        drop(origin);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn reassigning_a_handle_to_its_own_clone_is_safe() {
        let drops = Rc::new(Cell::new(0));
        let mut handle = Shared::new(Tally(drops.clone()));
        handle = handle.clone();
        assert_eq!(Shared::ref_count(&handle), 1);
        assert_eq!(drops.get(), 0);
        drop(handle);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn reset_releases_and_is_idempotent() {
        let drops = Rc::new(Cell::new(0));
        let mut handle = Shared::new(Tally(drops.clone()));
        Shared::reset(&mut handle);
        assert!(Shared::is_empty(&handle));
        assert_eq!(drops.get(), 1);
        Shared::reset(&mut handle);
        assert!(Shared::is_empty(&handle));
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn empty_handles_compare_equal() {
        let empty_a = Shared::<i32>::default();
        let empty_b = Shared::<i32>::default();
        assert_eq!(empty_a, empty_b);
        assert_ne!(empty_a, Shared::new(0));
        assert!(Shared::address(&empty_a).is_none());
        assert!(Shared::as_ptr(&empty_a).is_null());
    }
}
