//! Ownership handles for a native-memory runtime
//!
//! Two handle types are provided, covering the two ownership intents a runtime
//! needs to express without a garbage collector:
//!
//! - [`Shared<T>`]: reference-counted shared ownership. Any number of handles
//!   may alias the same heap cell; the value is freed when the last one is
//!   dropped or reset.
//! - [`Unique<T>`]: exclusive ownership. The handle can be moved but not
//!   cloned, so at most one owner exists at any time.
//!
//! The reference count is a plain (non-atomic) integer, which keeps handle
//! operations cheap but restricts them to a single thread; both handle types
//! are `!Send` and `!Sync` so the compiler enforces the restriction. An
//! atomically counted variant could be added later behind a feature without
//! changing the API surface.
//!
//! Cycle detection is deliberately absent: ownership graphs are expected to be
//! acyclic or managed externally.

#![warn(missing_docs)]

mod address;
mod shared;
mod unique;

pub use address::Address;
pub use shared::Shared;
pub use unique::Unique;
