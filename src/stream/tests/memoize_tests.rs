//! Tests for memoization and tee semantics.

use crate::stream::core::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// A deliberately nondeterministic source: each step draws a fresh ticket,
/// so direct re-traversal never repeats.
fn ticket_stream() -> Stream<u32> {
    let counter = AtomicU32::new(0);
    repeat_with(move || counter.fetch_add(1, Ordering::SeqCst))
}

#[test]
fn memoize_makes_replay_deterministic() {
    let source = ticket_stream();
    // Direct re-traversal of the raw source diverges...
    assert_ne!(source.take(3).to_vec(), source.take(3).to_vec());
    // ...but every traversal of the memoized stream sees the recording.
    let memo = source.memoize();
    let first = memo.take(4).to_vec();
    let second = memo.take(4).to_vec();
    assert_eq!(first, second);
}

#[test]
fn memoize_extends_the_recording_on_demand() {
    let memo = ticket_stream().memoize();
    let short = memo.take(2).to_vec();
    // A longer traversal replays the prefix, then records further.
    let long = memo.take(5).to_vec();
    assert_eq!(&long[..2], &short[..]);
}

#[test]
fn memoize_records_the_terminal_payload() {
    let source: Stream<i32, &'static str> = cons(1, finished("done"));
    let memo = source.memoize();
    assert_eq!(memo.collect_all(), (vec![1], "done"));
    assert_eq!(memo.collect_all(), (vec![1], "done"));
}

#[test]
fn memoize_only_creates_one_underlying_traversal() {
    let activations = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&activations);
    let source: Stream<u32> = Stream::from_fn(move || {
        seen.fetch_add(1, Ordering::SeqCst);
        from_vec(vec![1, 2, 3]).activate()
    });
    let memo = source.memoize();
    memo.to_vec();
    memo.to_vec();
    memo.to_vec();
    assert_eq!(activations.load(Ordering::SeqCst), 1);
}

#[test]
fn memoized_replay_is_shared_across_threads() {
    let memo = ticket_stream().memoize();
    let worker = {
        let memo = memo.clone();
        std::thread::spawn(move || memo.take(64).to_vec())
    };
    let here = memo.take(64).to_vec();
    let there = worker.join().expect("worker finished");
    assert_eq!(here, there);
}

#[test]
fn split_readers_see_the_same_values_once_each() {
    let handles = ticket_stream().split(2);
    let a = handles[0].take(4).to_vec();
    let b = handles[1].take(4).to_vec();
    // Both readers observe the single underlying traversal's output.
    assert_eq!(a, b);
}

#[test]
fn split_buffers_only_for_the_slowest_reader() {
    let handles = from_vec(vec![1, 2, 3, 4]).split(2);
    // Interleaved advancement: the fast reader runs ahead, the slow one
    // catches up from the buffer.
    assert_eq!(handles[0].take(3).to_vec(), vec![1, 2, 3]);
    assert_eq!(handles[1].take(2).to_vec(), vec![1, 2]);
    assert_eq!(handles[0].take(1).to_vec(), vec![4]);
    assert_eq!(handles[1].take(2).to_vec(), vec![3, 4]);
}

#[test]
fn split_handles_are_live_continuations() {
    let handles = from_vec(vec![1, 2, 3, 4]).split(1);
    // Successive traversals of one handle continue, they do not restart.
    assert_eq!(handles[0].take(2).to_vec(), vec![1, 2]);
    assert_eq!(handles[0].take(2).to_vec(), vec![3, 4]);
}

#[test]
fn split_delivers_the_terminal_payload_to_every_reader() {
    let source: Stream<i32, &'static str> = cons(1, finished("eof"));
    let handles = source.split(2);
    assert_eq!(handles[0].collect_all(), (vec![1], "eof"));
    assert_eq!(handles[1].collect_all(), (vec![1], "eof"));
}
