//! Tests for the per-value and structural transform combinators.

use crate::stream::core::*;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[test]
fn map_transforms_values_and_passes_payload_through() {
    let s: Stream<i32, &'static str> = cons(1, cons(2, finished("done")));
    let mapped = s.map(|v| v * 10);
    // The payload is never fed through the transform.
    assert_eq!(mapped.collect_all(), (vec![10, 20], "done"));
}

#[test]
fn filter_keeps_termination_semantics() {
    let s: Stream<i32, &'static str> = cons(1, cons(2, cons(3, finished("done"))));
    let odds = s.filter(|v| v % 2 == 1);
    assert_eq!(odds.collect_all(), (vec![1, 3], "done"));
}

#[test]
fn each_observes_without_changing_values() {
    let seen = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&seen);
    let s = from_vec(vec![1u32, 2, 3]).each(move |v| {
        counter.fetch_add(*v, Ordering::SeqCst);
    });
    assert_eq!(s.to_vec(), vec![1, 2, 3]);
    assert_eq!(seen.load(Ordering::SeqCst), 6);
}

#[test]
fn zip_pairs_positionally_and_stops_short() {
    let s = from_vec(vec![1, 2, 3]).zip(&count());
    assert_eq!(s.to_vec(), vec![(1, 0), (2, 1), (3, 2)]);
}

#[test]
fn zip_with_fuses_the_pair() {
    let a = from_vec(vec![1.0, 2.0]);
    let b = from_vec(vec![10.0, 20.0, 30.0]);
    assert_eq!(a.zip_with(&b, |x, y| x + y).to_vec(), vec![11.0, 22.0]);
}

#[test]
fn bind_continues_from_the_terminal_payload() {
    // Split off two values, then resume the remainder through bind: the
    // dependent-continuation pattern slicing is designed around.
    let s = from_vec(vec![1, 2, 3, 4, 5]);
    let respliced = s.take(2).bind(|rest| rest);
    assert_eq!(respliced.to_vec(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn bind_computes_the_next_stream_lazily() {
    let s: Stream<i32, i32> = finished(21);
    let doubled = s.bind(|payload| cons(payload * 2, empty()));
    assert_eq!(doubled.to_vec(), vec![42]);
}

#[test]
fn join_flattens_a_stream_of_streams() {
    let nested = from_vec(vec![from_vec(vec![1, 2]), from_vec(vec![3])]);
    assert_eq!(nested.join().to_vec(), vec![1, 2, 3]);
}

#[test]
fn cycle_replays_the_whole_traversal() {
    let s = from_vec(vec![1, 2]).cycle();
    assert_eq!(s.take(5).to_vec(), vec![1, 2, 1, 2, 1]);
}

#[test]
fn cycle_of_a_valueless_stream_terminates() {
    let s: Stream<i32> = empty::<i32>().cycle();
    assert!(s.to_vec().is_empty());
}

#[test]
fn cycle_n_repeats_and_propagates_the_final_payload() {
    let s: Stream<i32, &'static str> = cons(7, finished("wrap"));
    let tripled = s.cycle_n(NonZeroUsize::new(3).unwrap());
    assert_eq!(tripled.collect_all(), (vec![7, 7, 7], "wrap"));
}

#[test]
fn hold_repeats_each_value() {
    let s = from_vec(vec![1, 2]).hold(3);
    assert_eq!(s.to_vec(), vec![1, 1, 1, 2, 2, 2]);
}

#[test]
fn scan_emits_intermediate_accumulators() {
    let sums = from_vec(vec![1, 2, 3]).scan(0, |acc, v| acc + v);
    let (values, total) = sums.collect_all();
    assert_eq!(values, vec![0, 1, 3]);
    assert_eq!(total, 6);
}

#[test]
fn fold_reduces_eagerly() {
    let s: Stream<i32, &'static str> = cons(1, cons(2, cons(3, finished("end"))));
    let (sum, payload) = s.fold(0, |acc, v| acc + v);
    assert_eq!(sum, 6);
    assert_eq!(payload, "end");
}

#[test]
fn chunk_batches_with_a_short_final_group() {
    let s = from_vec(vec![1, 2, 3, 4, 5]).chunk(NonZeroUsize::new(2).unwrap());
    assert_eq!(s.to_vec(), vec![vec![1, 2], vec![3, 4], vec![5]]);
}

#[test]
fn chunk_then_flatten_is_identity() {
    let s = from_vec(vec![1, 2, 3, 4, 5]);
    let round = s.chunk(NonZeroUsize::new(2).unwrap()).flatten();
    assert_eq!(round.to_vec(), s.to_vec());
}

#[test]
fn chunk_delivers_payload_after_the_partial_group() {
    let s: Stream<i32, &'static str> = cons(1, cons(2, cons(3, finished("end"))));
    let (groups, payload) = s.chunk(NonZeroUsize::new(2).unwrap()).collect_all();
    assert_eq!(groups, vec![vec![1, 2], vec![3]]);
    assert_eq!(payload, "end");
}

#[test]
fn reverse_replays_backwards() {
    let s = from_vec(vec![1, 2, 3]).reverse();
    assert_eq!(s.to_vec(), vec![3, 2, 1]);
}

#[test]
fn map_return_adapts_payload_types() {
    let s: Stream<i32, i32> = finished(5);
    let stringly = s.map_return(|n| n.to_string());
    assert_eq!(stringly.run(), "5");
}

#[test]
fn pipe_applies_a_stream_function() {
    let doubled = from_vec(vec![1, 2]).pipe(|s| s.map(|v| v * 2));
    assert_eq!(doubled.to_vec(), vec![2, 4]);
}
