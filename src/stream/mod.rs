//! The stream algebra: replayable sequences and their combinators.
//!
//! # Modules
//!
//! - [`core`] - The [`Stream`]/[`Traversal`] contract and primitive
//!   constructors
//! - composites - [`concat`], [`mix`], [`zip_all`] and slicing, each with
//!   its own termination policy
//! - combinators - `map`, `filter`, `bind`, `cycle`, `scan`, `chunk` and
//!   friends, defined as inherent methods on [`Stream`]
//! - memoize/tee - replay support for single-traversal sources
//! - ops - the `>>`/`+`/`*` operator algebra

pub mod core;

mod combinators;
mod composite;
mod memoize;
mod ops;

#[cfg(test)]
mod tests;

pub use composite::{concat, mix, zip_all};
pub use core::{
    cons, constant, count, count_from, empty, finished, from_iter_once, from_vec, once,
    repeat_with, AsAny, BoxTraversal, Source, Step, Stream, Traversal,
};
