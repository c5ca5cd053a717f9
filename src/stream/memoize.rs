//! Replay for single-traversal sources: memoization and tee.
//!
//! [`Stream::memoize`] records the output of one shared underlying traversal
//! so that the stream can be re-activated: the way to make a wrapped
//! iterator, live input, or random source behave like a replayable stream.
//! [`Stream::split`] serves the different case of several *concurrently
//! advancing* readers over one traversal, buffering only what the slowest
//! reader has not yet seen.

use super::core::{BoxTraversal, Step, Stream, Traversal};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;

impl<T, R> Stream<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// Record this stream's output so re-activation replays it.
    ///
    /// Exactly one traversal of the underlying stream ever exists; it is
    /// created here. Each traversal of the memoized stream first replays the
    /// recorded prefix, then, once caught up, advances the shared
    /// underlying traversal, appending as it goes. The recorded terminal
    /// payload replays too.
    ///
    /// Advancing the shared cursor and appending to the buffer is a single
    /// critical section (write lock); traversals still inside the recorded
    /// prefix only take the shared read lock, so concurrent replay readers
    /// do not serialize against each other.
    ///
    /// # Examples
    ///
    /// ```
    /// use audio_streams::{repeat_with, Stream};
    /// use std::sync::atomic::{AtomicU64, Ordering};
    ///
    /// let ticket = AtomicU64::new(0);
    /// let source: Stream<u64> = repeat_with(move || ticket.fetch_add(1, Ordering::Relaxed));
    /// let memo = source.memoize();
    /// // Both traversals observe the same recorded values.
    /// assert_eq!(memo.take(3).to_vec(), memo.take(3).to_vec());
    /// ```
    pub fn memoize(&self) -> Stream<T, R> {
        let shared = Arc::new(MemoShared {
            state: RwLock::new(MemoState {
                cursor: Mutex::new(Some(self.activate())),
                recorded: Vec::new(),
                finished: None,
            }),
        });
        Stream::from_fn(move || {
            Box::new(MemoCursor {
                shared: Arc::clone(&shared),
                position: 0,
            })
        })
    }

    /// Split this stream into `count` live handles that together consume one
    /// underlying traversal, buffering values not yet seen by the slowest
    /// handle (tee).
    ///
    /// Unlike [`memoize`](Stream::memoize), the handles are expected to
    /// advance concurrently, and nothing is retained once every handle has
    /// moved past a value. Each handle is a single logical consumer: a fresh
    /// traversal of a handle continues from that handle's position rather
    /// than restarting.
    pub fn split(&self, count: usize) -> Vec<Stream<T, R>> {
        let shared = Arc::new(TeeShared {
            state: Mutex::new(TeeState {
                cursor: Some(self.activate()),
                buffer: VecDeque::new(),
                base: 0,
                finished: None,
                positions: vec![0; count],
            }),
        });
        (0..count)
            .map(|reader| {
                let shared = Arc::clone(&shared);
                Stream::from_fn(move || {
                    Box::new(TeeCursor {
                        shared: Arc::clone(&shared),
                        reader,
                    })
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Memoize
// ---------------------------------------------------------------------------

struct MemoShared<T, R> {
    state: RwLock<MemoState<T, R>>,
}

struct MemoState<T, R> {
    /// The single underlying traversal; dropped once it terminates.
    ///
    /// Wrapped in a `Mutex` so `MemoState` is `Sync` despite the boxed
    /// traversal being `Send`-only: `RwLock<T>: Sync` requires `T: Sync`,
    /// which the bare `BoxTraversal` does not satisfy. The cursor is only
    /// ever touched while the outer write lock is held, so access goes
    /// through `get_mut()` and never actually contends.
    cursor: Mutex<Option<BoxTraversal<T, R>>>,
    /// Every value the underlying traversal has produced, in order.
    recorded: Vec<T>,
    finished: Option<R>,
}

struct MemoCursor<T, R> {
    shared: Arc<MemoShared<T, R>>,
    position: usize,
}

impl<T, R> Traversal for MemoCursor<T, R>
where
    T: Clone + Send + Sync,
    R: Clone + Send + Sync,
{
    type Item = T;
    type Return = R;

    fn step(&mut self) -> Step<T, R> {
        {
            let state = self.shared.state.read();
            if self.position < state.recorded.len() {
                let value = state.recorded[self.position].clone();
                self.position += 1;
                return Step::Value(value);
            }
        }
        let mut state = self.shared.state.write();
        // Another traversal may have advanced the cursor between the locks.
        if self.position < state.recorded.len() {
            let value = state.recorded[self.position].clone();
            self.position += 1;
            return Step::Value(value);
        }
        if let Some(payload) = &state.finished {
            return Step::Done(payload.clone());
        }
        let step = state
            .cursor
            .get_mut()
            .as_mut()
            .expect("memoize cursor present until finished")
            .step();
        match step {
            Step::Value(v) => {
                state.recorded.push(v.clone());
                self.position += 1;
                Step::Value(v)
            }
            Step::Done(payload) => {
                state.finished = Some(payload.clone());
                *state.cursor.get_mut() = None;
                Step::Done(payload)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tee
// ---------------------------------------------------------------------------

struct TeeShared<T, R> {
    state: Mutex<TeeState<T, R>>,
}

struct TeeState<T, R> {
    cursor: Option<BoxTraversal<T, R>>,
    /// Values produced but not yet consumed by every reader.
    buffer: VecDeque<T>,
    /// Absolute index of `buffer[0]`.
    base: usize,
    finished: Option<R>,
    /// Absolute position of each reader.
    positions: Vec<usize>,
}

impl<T, R> TeeState<T, R> {
    fn drop_consumed(&mut self) {
        let slowest = self.positions.iter().copied().min().unwrap_or(self.base);
        while self.base < slowest && !self.buffer.is_empty() {
            self.buffer.pop_front();
            self.base += 1;
        }
    }
}

struct TeeCursor<T, R> {
    shared: Arc<TeeShared<T, R>>,
    reader: usize,
}

impl<T, R> Traversal for TeeCursor<T, R>
where
    T: Clone + Send + Sync,
    R: Clone + Send + Sync,
{
    type Item = T;
    type Return = R;

    fn step(&mut self) -> Step<T, R> {
        let mut state = self.shared.state.lock();
        let position = state.positions[self.reader];
        if position < state.base + state.buffer.len() {
            let value = state.buffer[position - state.base].clone();
            state.positions[self.reader] = position + 1;
            state.drop_consumed();
            return Step::Value(value);
        }
        if let Some(payload) = &state.finished {
            return Step::Done(payload.clone());
        }
        let step = state
            .cursor
            .as_mut()
            .expect("tee cursor present until finished")
            .step();
        match step {
            Step::Value(v) => {
                state.buffer.push_back(v.clone());
                state.positions[self.reader] = position + 1;
                state.drop_consumed();
                Step::Value(v)
            }
            Step::Done(payload) => {
                state.finished = Some(payload.clone());
                state.cursor = None;
                Step::Done(payload)
            }
        }
    }
}
