use std::{
    fmt,
    hash::{Hash, Hasher},
};

/// The address of a handle's heap cell, used for aliasing comparisons
///
/// Two handles alias the same object exactly when their addresses are equal;
/// the value itself is never inspected. The address of an empty handle is
/// represented by the handles returning `None` rather than a null `Address`,
/// so an `Address` in hand always refers to a live allocation at the time it
/// was taken.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Address(*const u8);

impl<T> From<*const T> for Address {
    fn from(pointer: *const T) -> Self {
        Self(pointer.cast())
    }
}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.0 as usize);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}
