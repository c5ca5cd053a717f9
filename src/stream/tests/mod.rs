//! Tests for the stream algebra.

mod combinator_tests;
mod composite_tests;
mod core_tests;
mod memoize_tests;
