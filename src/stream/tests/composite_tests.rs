//! Tests for concat/mix/zip/slice termination and flattening semantics.

use crate::stream::composite::{concat, mix, zip_all, ConcatSource, MixSource};
use crate::stream::core::*;

fn level(value: f64, len: usize) -> Stream<f64> {
    from_vec(vec![value; len])
}

#[test]
fn concat_sequences_children_without_dead_steps() {
    let s = concat(vec![level(1.0, 2), level(2.0, 3)]);
    assert_eq!(s.to_vec(), vec![1.0, 1.0, 2.0, 2.0, 2.0]);
}

#[test]
fn concat_is_associative_in_values() {
    let (a, b, c) = (level(1.0, 1), level(2.0, 2), level(3.0, 1));
    let left = (a.clone() >> b.clone()) >> c.clone();
    let right = a >> (b >> c);
    assert_eq!(left.to_vec(), right.to_vec());
}

#[test]
fn nested_concats_flatten_at_construction() {
    let (a, b, c) = (level(1.0, 1), level(2.0, 1), level(3.0, 1));
    let left = (a.clone() >> b.clone()) >> c.clone();
    let right = a >> (b >> c);
    for s in [left, right] {
        let parts = s
            .source_any()
            .downcast_ref::<ConcatSource<f64, ()>>()
            .expect("concat node")
            .parts
            .len();
        assert_eq!(parts, 3);
    }
}

#[test]
fn concat_propagates_the_last_childs_payload() {
    let tail: Stream<f64, &'static str> = finished("end");
    let head: Stream<f64, &'static str> = cons(1.0, finished("ignored"));
    let s = concat(vec![head, tail]);
    assert_eq!(s.collect_all(), (vec![1.0], "end"));
}

#[test]
fn empty_children_are_skipped_within_one_step() {
    let s = concat(vec![empty(), empty(), level(9.0, 1), empty()]);
    assert_eq!(s.to_vec(), vec![9.0]);
}

#[test]
fn mix_sums_until_all_children_finish() {
    let s = mix(vec![level(1.0, 2), level(10.0, 5)]);
    assert_eq!(s.to_vec(), vec![11.0, 11.0, 10.0, 10.0, 10.0]);
}

#[test]
fn mix_with_empty_is_identity_in_values() {
    let a = level(3.0, 4);
    let s = mix(vec![a.clone(), empty()]);
    assert_eq!(s.to_vec(), a.to_vec());
}

#[test]
fn mix_of_nothing_is_empty() {
    let s: Stream<f64> = mix(vec![]);
    assert!(s.to_vec().is_empty());
}

#[test]
fn nested_mixes_flatten_at_construction() {
    let (a, b, c) = (level(1.0, 1), level(2.0, 1), level(4.0, 1));
    let s = (a + b) + c;
    let parts = s
        .source_any()
        .downcast_ref::<MixSource<f64>>()
        .expect("mix node")
        .parts
        .len();
    assert_eq!(parts, 3);
    // Flattening does not change the sum.
    let s2 = mix(vec![level(1.0, 1), level(2.0, 1), level(4.0, 1)]);
    assert_eq!(s2.to_vec(), vec![7.0]);
}

#[test]
fn zip_all_stops_with_the_shortest_child() {
    let s = zip_all(vec![level(1.0, 3), constant(2.0)]);
    assert_eq!(
        s.to_vec(),
        vec![vec![1.0, 2.0], vec![1.0, 2.0], vec![1.0, 2.0]]
    );
}

#[test]
fn zip_all_of_nothing_is_empty() {
    let s = zip_all(Vec::<Stream<f64>>::new());
    assert!(s.to_vec().is_empty());
}

#[test]
fn slice_round_trip_reassembles_the_stream() {
    let full = from_vec(vec![0, 1, 2, 3, 4]);
    for k in 0..=5 {
        let (head, rest) = full.take(k).collect_all();
        let mut reassembled = head;
        reassembled.extend(rest.to_vec());
        assert_eq!(reassembled, full.to_vec(), "k = {k}");
    }
}

#[test]
fn take_beyond_the_end_keeps_the_round_trip() {
    let full = from_vec(vec![0, 1, 2]);
    let (head, rest) = full.take(10).collect_all();
    assert_eq!(head, vec![0, 1, 2]);
    assert!(rest.to_vec().is_empty());
}

#[test]
fn skip_discards_a_prefix() {
    let s = from_vec(vec![0, 1, 2, 3, 4]).skip(2);
    assert_eq!(s.to_vec(), vec![2, 3, 4]);
}

#[test]
fn slice_window_with_offset() {
    let s = count().slice(2..6).unwrap();
    assert_eq!(s.to_vec(), vec![2, 3, 4, 5]);
    let (_, rest) = s.collect_all();
    // The remainder picks up right after the window.
    assert_eq!(rest.take(2).to_vec(), vec![6, 7]);
}

#[test]
fn stepped_slice_drops_between_elements() {
    let s = count().slice_step(0..10, 3).unwrap();
    // Lossy stepping: skipped elements are consumed, not buffered.
    assert_eq!(s.to_vec(), vec![0, 3, 6, 9]);
    let (_, rest) = s.collect_all();
    assert_eq!(rest.get(0).unwrap(), 10);
}

#[test]
fn slice_of_terminated_child_propagates_through_remainder() {
    let short: Stream<i32, &'static str> = cons(1, finished("tail"));
    let (values, rest) = short.take(5).collect_all();
    assert_eq!(values, vec![1]);
    // The child's payload survives the early termination, one level down.
    assert_eq!(rest.collect_all(), (vec![], "tail"));
}

#[test]
fn skip_past_the_end_terminates_early() {
    let s = from_vec(vec![1, 2]).skip(10);
    let (values, rest) = s.collect_all();
    assert!(values.is_empty());
    assert!(rest.to_vec().is_empty());
}

#[test]
fn invalid_slice_parameters_are_rejected_eagerly() {
    let s = from_vec(vec![1, 2, 3]);
    assert!(s.slice_step(0..2, 0).is_err());
    assert!(s.slice(3..1).is_err());
    // Rejection happens at construction; the child is never traversed.
}

#[test]
fn slice_remainder_is_single_pass() {
    let (_, rest) = from_vec(vec![1, 2, 3]).take(1).collect_all();
    assert_eq!(rest.to_vec(), vec![2, 3]);
    // The remainder wraps a live traversal: a second activation is spent.
    assert_eq!(rest.to_vec(), Vec::<i32>::new());
}

#[test]
fn post_filter_slice_counts_filtered_positions() {
    // Slicing a filtered stream indexes post-filter values. This pins down
    // the documented reading of an otherwise ambiguous interaction.
    let evens = count().filter(|n| n % 2 == 0);
    assert_eq!(evens.take(3).to_vec(), vec![0, 2, 4]);
    assert_eq!(evens.get(4).unwrap(), 8);
}
