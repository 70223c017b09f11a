use std::{
    fmt,
    hash::{Hash, Hasher},
    ops::{Deref, DerefMut},
    ptr,
};

use crate::Address;

/// A handle providing exclusive ownership of a heap value
///
/// Exactly one `Unique` may own a value at a time: the handle can be moved but
/// never duplicated, so the single-owner invariant is enforced by the compiler
/// rather than checked at runtime. Dropping the handle, [resetting
/// it](Unique::reset), or move-assigning over it frees the owned value exactly
/// once.
///
/// Handle operations are associated functions rather than methods, so that
/// they never shadow methods of the pointee reached through `Deref`.
///
/// Duplicating the handle is rejected at compile time:
///
/// ```compile_fail
/// use runtime_memory::Unique;
///
/// let a = Unique::new(42);
/// let b: Unique<i32> = a.clone();
/// ```
///
/// ```compile_fail
/// use runtime_memory::Unique;
///
/// let a = Unique::new(42);
/// let b = a;
/// let c = a;
/// ```
///
/// See also: [`Box`]
pub struct Unique<T> {
    value: Option<Box<T>>,
}

impl<T> Unique<T> {
    /// Allocates a heap value owned by the returned handle
    pub fn new(value: T) -> Self {
        Self {
            value: Some(Box::new(value)),
        }
    }

    /// Returns true if the handle owns nothing
    pub fn is_empty(this: &Self) -> bool {
        this.value.is_none()
    }

    /// Returns true if the two handles refer to the same value address
    ///
    /// Two empty handles are considered equal. Under correct use no two live
    /// `Unique` handles can own the same value, so a non-empty match is only
    /// meaningful as a diagnostic.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Self::as_ptr(this) == Self::as_ptr(other)
    }

    /// Returns a pointer to the owned value, or null if the handle is empty
    ///
    /// The pointer must not be retained beyond the owning handle's life.
    pub fn as_ptr(this: &Self) -> *const T {
        this.value.as_deref().map_or(ptr::null(), |value| value)
    }

    /// Returns a mutable pointer to the owned value, or null if empty
    pub fn as_mut_ptr(this: &mut Self) -> *mut T {
        this.value.as_deref_mut().map_or(ptr::null_mut(), |value| value)
    }

    /// Returns the address of the owned value, or None if the handle is empty
    pub fn address(this: &Self) -> Option<Address> {
        this.value.as_deref().map(|value| Address::from(value as *const T))
    }

    /// Frees the owned value if present, leaving the handle empty
    ///
    /// Resetting an empty handle is a no-op.
    pub fn reset(this: &mut Self) {
        this.value = None;
    }

    /// Transfers ownership out of `this`, leaving it empty
    pub fn take(this: &mut Self) -> Self {
        Self {
            value: this.value.take(),
        }
    }

    /// Relinquishes ownership, returning the value without destroying it
    ///
    /// Returns None if the handle was empty.
    pub fn into_inner(this: Self) -> Option<T> {
        this.value.map(|boxed| *boxed)
    }
}

impl<T> Default for Unique<T> {
    /// Produces an empty handle, without allocating
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T> From<T> for Unique<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T> From<Box<T>> for Unique<T> {
    /// Takes over an existing heap allocation directly, without copying
    fn from(boxed: Box<T>) -> Self {
        Self { value: Some(boxed) }
    }
}

impl<T> Deref for Unique<T> {
    type Target = T;

    /// Precondition: the handle must be non-empty.
    ///
    /// Release builds perform no check; debug builds assert.
    fn deref(&self) -> &T {
        debug_assert!(self.value.is_some(), "dereferenced an empty handle");
        unsafe { self.value.as_deref().unwrap_unchecked() }
    }
}

impl<T> DerefMut for Unique<T> {
    fn deref_mut(&mut self) -> &mut T {
        debug_assert!(self.value.is_some(), "dereferenced an empty handle");
        unsafe { self.value.as_deref_mut().unwrap_unchecked() }
    }
}

impl<T> PartialEq for Unique<T> {
    /// Aliasing comparison by address, never a value comparison
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl<T> Eq for Unique<T> {}

impl<T> Hash for Unique<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(Self::as_ptr(self) as usize);
    }
}

impl<T: fmt::Debug> fmt::Debug for Unique<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.as_deref() {
            Some(value) => f.debug_tuple("Unique").field(value).finish(),
            None => f.write_str("Unique(empty)"),
        }
    }
}
