//! Tests for the core stream contract and primitive constructors.

use crate::error::StreamError;
use crate::stream::core::*;

#[test]
fn constant_repeats_forever() {
    let s: Stream<f64> = constant(0.5);
    assert_eq!(s.take(4).to_vec(), vec![0.5, 0.5, 0.5, 0.5]);
}

#[test]
fn count_is_the_naturals() {
    assert_eq!(count().take(5).to_vec(), vec![0, 1, 2, 3, 4]);
    assert_eq!(count_from(10).take(3).to_vec(), vec![10, 11, 12]);
}

#[test]
fn empty_terminates_immediately() {
    let s: Stream<f64> = empty();
    let (values, ()) = s.collect_all();
    assert!(values.is_empty());
}

#[test]
fn finished_carries_its_payload_every_traversal() {
    let s: Stream<f64, &'static str> = finished("leftover");
    assert_eq!(s.run(), "leftover");
    assert_eq!(s.run(), "leftover");
}

#[test]
fn once_and_cons_prepend() {
    assert_eq!(once(7).to_vec(), vec![7]);
    let s = cons(1, from_vec(vec![2, 3]));
    assert_eq!(s.to_vec(), vec![1, 2, 3]);
    // cons leaves the tail's termination untouched.
    let tagged = cons(0, finished::<i32, &'static str>("tail"));
    assert_eq!(tagged.collect_all(), (vec![0], "tail"));
}

#[test]
fn from_vec_replays_identically() {
    let s = from_vec(vec![1, 2, 3]);
    assert_eq!(s.to_vec(), s.to_vec());
}

#[test]
fn streams_are_immutable_under_traversal() {
    let s = from_vec(vec![1, 2, 3]);
    let mut first = s.activate();
    assert_eq!(first.step().value(), Some(1));
    // A second traversal starts from the defining point regardless of the
    // first one's progress.
    let mut second = s.activate();
    assert_eq!(second.step().value(), Some(1));
    assert_eq!(first.step().value(), Some(2));
}

#[test]
fn unfold_is_an_explicit_state_machine() {
    // Collatz from 6, stopping at 1.
    let s = Stream::unfold(6u64, |n| {
        if *n == 1 {
            return Step::Done(());
        }
        let out = *n;
        *n = if *n % 2 == 0 { *n / 2 } else { 3 * *n + 1 };
        Step::Value(out)
    });
    assert_eq!(s.to_vec(), vec![6, 3, 10, 5, 16, 8, 4, 2]);
    // Replayable: the seed is cloned per traversal.
    assert_eq!(s.to_vec().len(), 8);
}

#[test]
fn repeat_with_calls_the_generator_each_step() {
    use std::sync::atomic::{AtomicU32, Ordering};
    let calls = AtomicU32::new(0);
    let s: Stream<u32> = repeat_with(move || calls.fetch_add(1, Ordering::SeqCst));
    assert_eq!(s.take(3).to_vec(), vec![0, 1, 2]);
    // A second traversal keeps drawing from the same generator: this source
    // is deliberately nondeterministic across traversals.
    assert_eq!(s.take(2).to_vec(), vec![3, 4]);
}

#[test]
fn get_extracts_or_reports_out_of_range() {
    let s = from_vec(vec![10, 20, 30]);
    assert_eq!(s.get(0).unwrap(), 10);
    assert_eq!(s.get(2).unwrap(), 30);
    match s.get(5) {
        Err(StreamError::IndexOutOfRange { index, length }) => {
            assert_eq!(index, 5);
            assert_eq!(length, 3);
        }
        other => panic!("expected IndexOutOfRange, got {other:?}"),
    }
}

#[test]
fn freeze_materializes_a_finite_stream() {
    let frozen = count().take(4).freeze();
    assert_eq!(frozen.to_vec(), vec![0, 1, 2, 3]);
    assert_eq!(frozen.to_vec(), vec![0, 1, 2, 3]);
}

#[test]
fn peek_reads_without_consuming() {
    let s = from_vec(vec![5, 6, 7]);
    let (head, rest) = s.peek();
    assert_eq!(head, Some(5));
    // The un-peeked stream re-prepends the peeked value.
    assert_eq!(rest.to_vec(), vec![5, 6, 7]);
}

#[test]
fn peek_of_empty_reports_none_and_keeps_payload() {
    let s: Stream<i32, i32> = finished(42);
    let (head, rest) = s.peek();
    assert_eq!(head, None);
    assert_eq!(rest.collect_all(), (vec![], 42));
}

#[test]
fn single_pass_streams_are_spent_after_one_traversal() {
    let s = from_iter_once(vec![1, 2, 3].into_iter());
    assert_eq!(s.to_vec(), vec![1, 2, 3]);
    // Re-activation after exhaustion is the typed spent-iterator case.
    assert_eq!(s.to_vec(), Vec::<i32>::new());
}

#[test]
fn from_traversal_resumes_a_partial_walk() {
    let source = from_vec(vec![1, 2, 3, 4]);
    let mut walk = source.activate();
    walk.step();
    walk.step();
    let rest = Stream::from_traversal(walk);
    assert_eq!(rest.to_vec(), vec![3, 4]);
}

#[test]
fn stream_collects_from_iterators() {
    let s: Stream<i32> = (1..=3).collect();
    assert_eq!(s.to_vec(), vec![1, 2, 3]);
}

#[test]
fn default_stream_is_empty() {
    let s: Stream<f64> = Stream::default();
    assert!(s.to_vec().is_empty());
}

#[test]
fn scalar_conversion_makes_constant_streams() {
    let s: Stream<f64> = 440.0.into();
    assert_eq!(s.take(2).to_vec(), vec![440.0, 440.0]);
}

#[test]
fn run_returns_the_terminal_payload() {
    let s = from_vec(vec![1, 2]);
    let remainder = s.take(1).run();
    assert_eq!(remainder.to_vec(), vec![2]);
}
