// Correctness and logic
#![warn(clippy::unit_cmp)]
#![warn(clippy::match_same_arms)]
// Performance-focused
#![warn(clippy::inefficient_to_string)]
#![warn(clippy::map_clone)]
#![warn(clippy::unnecessary_to_owned)]
#![warn(clippy::box_collection)]
#![warn(clippy::vec_box)]
#![warn(clippy::needless_collect)]
// Style and idiomatic Rust
#![warn(clippy::redundant_clone)]
#![warn(clippy::identity_op)]
#![warn(clippy::needless_return)]
#![warn(clippy::let_unit_value)]
#![warn(clippy::manual_map)]
#![warn(clippy::unwrap_used)]
// Maintainability
#![warn(clippy::missing_panics_doc)]
#![warn(missing_docs)]

//! # audio_streams
//!
//! A lazy, composable stream library for music composition: replayable,
//! possibly-infinite sequences pulled one value at a time, with an operator
//! algebra for combining them and an audio layer (oscillators, envelopes,
//! vari-speed resampling, polyphonic instruments) built on top.
//!
//! ## Overview
//!
//! The central type is [`Stream<T, R>`]: an immutable description of a
//! sequence of `T` values that terminates, if it terminates, with a
//! payload of type `R`. Activating a stream yields a [`Traversal`], an
//! owned cursor stepped by a consumer (an audio callback, a file renderer,
//! a test). Streams are descriptions, not iterators: the same stream can be
//! traversed many times, which is what lets slicing hand back "the rest of
//! the stream" and lets a composition be auditioned repeatedly.
//!
//! Composition is demand-driven and synchronous: nothing computes until the
//! consumer pulls, every composite step is constant-time beyond stepping
//! its children, and an infinite graph runs in bounded memory. Blocking
//! producers live behind the [`live`] adapter on a worker thread.
//!
//! ## Quick start
//!
//! ```
//! use audio_streams::audio::{adsr, osc};
//!
//! // A 440 Hz tone shaped by an ADSR envelope. `*` is elementwise
//! // modulation, so the finite envelope bounds the infinite oscillator.
//! let note = osc(440.0, 44100) * adsr(441, 2205, 8820, 0.6, 4410);
//! assert_eq!(note.to_vec().len(), 441 + 2205 + 8820 + 4410);
//! ```
//!
//! Sequential and parallel composition read like tape splicing and mixing:
//!
//! ```
//! use audio_streams::from_vec;
//!
//! let a = from_vec(vec![1.0, 1.0]);
//! let b = from_vec(vec![2.0, 2.0, 2.0]);
//! // `>>` splices; `+` mixes and keeps going until *all* sides end.
//! assert_eq!((a.clone() >> b.clone()).to_vec(), vec![1.0, 1.0, 2.0, 2.0, 2.0]);
//! assert_eq!((a + b).to_vec(), vec![3.0, 3.0, 2.0]);
//! ```
//!
//! ## Error handling
//!
//! Ordinary termination of a finite stream is a [`Step::Done`] signal, not
//! an error. [`StreamError`] covers genuine failures: contract violations
//! rejected at construction time (bad slice bounds, zero step), recoverable
//! out-of-range indexing, and background-worker faults delivered as
//! terminal payloads.

pub mod audio;
pub mod error;
pub mod instrument;
pub mod live;
pub mod stream;
pub mod traits;
pub mod wav;

pub use error::{StreamError, StreamResult};
pub use stream::{
    concat, cons, constant, count, count_from, empty, finished, from_iter_once, from_vec, mix,
    once, repeat_with, zip_all, BoxTraversal, Source, Step, Stream, Traversal,
};
pub use traits::{Channels, Sample};
