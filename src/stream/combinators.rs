//! Per-value and structural transform combinators.
//!
//! Everything here preserves the core contract: a combinator builds a new
//! immutable [`Stream`] whose traversals pull from fresh traversals of the
//! children, and composite stepping is O(1) amortized beyond the cost of
//! stepping children. Terminal payloads pass through untouched unless a
//! combinator's documentation says otherwise.

use super::core::{BoxTraversal, Step, Stream, Traversal};
use std::mem;
use std::num::NonZeroUsize;
use std::sync::Arc;

impl<T, R> Stream<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Apply a transform to every value. The terminal payload passes through
    /// unchanged, never through `f`.
    ///
    /// # Examples
    ///
    /// ```
    /// use audio_streams::from_vec;
    ///
    /// let doubled = from_vec(vec![1.0, 2.0]).map(|x| x * 2.0);
    /// assert_eq!(doubled.to_vec(), vec![2.0, 4.0]);
    /// ```
    pub fn map<U, F>(&self, f: F) -> Stream<U, R>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let inner = self.clone();
        let f = Arc::new(f);
        Stream::from_fn(move || {
            Box::new(MapCursor {
                inner: inner.activate(),
                f: Arc::clone(&f),
            })
        })
    }

    /// Invoke a side-effecting observer on every value, yielding the value
    /// unchanged.
    pub fn each<F>(&self, f: F) -> Stream<T, R>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.map(move |v| {
            f(&v);
            v
        })
    }

    /// Drop values failing `predicate`. Termination semantics are unchanged;
    /// note that index- and slice-based combinators downstream count
    /// *post-filter* positions.
    pub fn filter<P>(&self, predicate: P) -> Stream<T, R>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let inner = self.clone();
        let predicate = Arc::new(predicate);
        Stream::from_fn(move || {
            Box::new(FilterCursor {
                inner: inner.activate(),
                predicate: Arc::clone(&predicate),
            })
        })
    }

    /// Transform the terminal payload, leaving values untouched: the glue
    /// for composing streams whose payload types differ.
    pub fn map_return<R2, F>(&self, f: F) -> Stream<T, R2>
    where
        R2: Send + 'static,
        F: Fn(R) -> R2 + Send + Sync + 'static,
    {
        let inner = self.clone();
        let f = Arc::new(f);
        Stream::from_fn(move || {
            Box::new(MapReturnCursor {
                inner: inner.activate(),
                f: Arc::clone(&f),
            })
        })
    }

    /// Discard the terminal payload.
    pub fn strip_return(&self) -> Stream<T, ()> {
        self.map_return(|_| ())
    }

    /// Advance in lockstep with `other`, pairing values positionally.
    /// Terminates as soon as either side terminates.
    ///
    /// # Examples
    ///
    /// ```
    /// use audio_streams::{count, from_vec};
    ///
    /// let labeled = from_vec(vec!["a", "b"]).zip(&count());
    /// assert_eq!(labeled.to_vec(), vec![("a", 0), ("b", 1)]);
    /// ```
    pub fn zip<U, R2>(&self, other: &Stream<U, R2>) -> Stream<(T, U), ()>
    where
        U: Send + 'static,
        R2: Send + 'static,
    {
        let left = self.clone();
        let right = other.clone();
        Stream::from_fn(move || {
            Box::new(ZipCursor {
                left: left.activate(),
                right: right.activate(),
            })
        })
    }

    /// [`zip`](Stream::zip) fused with a combining function.
    pub fn zip_with<U, R2, V, F>(&self, other: &Stream<U, R2>, f: F) -> Stream<V, ()>
    where
        U: Send + 'static,
        R2: Send + 'static,
        V: Send + 'static,
        F: Fn(T, U) -> V + Send + Sync + 'static,
    {
        self.zip(other).map(move |(a, b)| f(a, b))
    }

    /// Monadic bind: run this stream to termination, hand its payload to
    /// `f`, and continue in the stream `f` returns. No dead step is emitted
    /// at the seam.
    ///
    /// This is the primitive beneath dependent sequencing: slicing returns
    /// the unconsumed remainder as its payload, and `bind` lets the next
    /// stage react to it.
    pub fn bind<R2, F>(&self, f: F) -> Stream<T, R2>
    where
        R2: Send + 'static,
        F: Fn(R) -> Stream<T, R2> + Send + Sync + 'static,
    {
        let inner = self.clone();
        let f = Arc::new(f);
        Stream::from_fn(move || {
            Box::new(BindCursor {
                state: BindState::First(inner.activate()),
                f: Arc::clone(&f),
            })
        })
    }

    /// Repeat the stream's full traversal indefinitely.
    ///
    /// Requires replayability: each pass re-activates the stream. A pass
    /// that yields no values ends the cycle (instead of spinning forever);
    /// single-pass sources must be memoized first.
    pub fn cycle(&self) -> Stream<T, ()> {
        let inner = self.clone();
        Stream::from_fn(move || {
            Box::new(CycleCursor {
                current: inner.activate(),
                stream: inner.clone(),
                yielded_this_pass: false,
            })
        })
    }

    /// Repeat the stream's full traversal a fixed number of times,
    /// propagating the final pass's terminal payload.
    pub fn cycle_n(&self, times: NonZeroUsize) -> Stream<T, R> {
        let inner = self.clone();
        let times = times.get();
        Stream::from_fn(move || {
            Box::new(CycleNCursor {
                current: inner.activate(),
                stream: inner.clone(),
                remaining: times - 1,
            })
        })
    }

    /// Repeat each value `times` times.
    ///
    /// `hold(0)` yields nothing and drains the child to its terminal
    /// payload, which only terminates for finite children.
    pub fn hold(&self, times: usize) -> Stream<T, R>
    where
        T: Clone,
    {
        let inner = self.clone();
        Stream::from_fn(move || {
            Box::new(HoldCursor {
                inner: inner.activate(),
                times,
                current: None,
            })
        })
    }

    /// Left fold with intermediate emission: yields the accumulator before
    /// each update, one value per child value; the terminal payload is the
    /// final accumulator. The child's own payload is discarded.
    pub fn scan<A, F>(&self, init: A, f: F) -> Stream<A, A>
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(A, T) -> A + Send + Sync + 'static,
    {
        let inner = self.clone();
        let f = Arc::new(f);
        Stream::from_fn(move || {
            Box::new(ScanCursor {
                inner: inner.activate(),
                acc: init.clone(),
                f: Arc::clone(&f),
            })
        })
    }

    /// Eager final-only left fold over a finite stream, returning the final
    /// accumulator together with the terminal payload.
    pub fn fold<A, F>(&self, init: A, f: F) -> (A, R)
    where
        F: Fn(A, T) -> A,
    {
        let mut traversal = self.activate();
        let mut acc = init;
        loop {
            match traversal.step() {
                Step::Value(v) => acc = f(acc, v),
                Step::Done(payload) => return (acc, payload),
            }
        }
    }

    /// Batch values into fixed-size groups; the final group may be shorter.
    /// The child's terminal payload follows the last group.
    pub fn chunk(&self, size: NonZeroUsize) -> Stream<Vec<T>, R> {
        let inner = self.clone();
        let size = size.get();
        Stream::from_fn(move || {
            Box::new(ChunkCursor {
                inner: inner.activate(),
                size,
                pending: None,
            })
        })
    }

    /// Materialize the stream at activation time and replay it backwards.
    /// Activating the result of `reverse` on an unbounded stream never
    /// returns.
    pub fn reverse(&self) -> Stream<T, ()> {
        let inner = self.clone();
        Stream::from_fn(move || {
            let mut values = inner.to_vec();
            values.reverse();
            Box::new(DrainCursor {
                iter: values.into_iter(),
            })
        })
    }

    /// Function-composition convenience: `s.pipe(f)` is `f(s)`, so stream
    /// transformations written as free functions chain left to right.
    pub fn pipe<Out, F>(&self, f: F) -> Out
    where
        F: FnOnce(Stream<T, R>) -> Out,
    {
        f(self.clone())
    }
}

impl<T, R2, R> Stream<Stream<T, R2>, R>
where
    T: Send + 'static,
    R2: Send + 'static,
    R: Send + 'static,
{
    /// Sequence a stream of streams end-to-end. Inner payloads are
    /// discarded; the outer stream's payload is propagated.
    pub fn join(&self) -> Stream<T, R> {
        let outer = self.clone();
        Stream::from_fn(move || {
            Box::new(JoinCursor {
                outer: outer.activate(),
                current: None,
            })
        })
    }
}

impl<T, R> Stream<Vec<T>, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Flatten a stream of batches back into a stream of values, the
    /// inverse of [`chunk`](Stream::chunk). The terminal payload passes
    /// through.
    pub fn flatten(&self) -> Stream<T, R> {
        let inner = self.clone();
        Stream::from_fn(move || {
            Box::new(FlattenCursor {
                inner: inner.activate(),
                buffer: Vec::new().into_iter(),
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Cursors
// ---------------------------------------------------------------------------

struct MapCursor<T, R, F> {
    inner: BoxTraversal<T, R>,
    f: Arc<F>,
}

impl<T, U, R, F> Traversal for MapCursor<T, R, F>
where
    F: Fn(T) -> U + Send + Sync,
{
    type Item = U;
    type Return = R;

    fn step(&mut self) -> Step<U, R> {
        match self.inner.step() {
            Step::Value(v) => Step::Value((self.f)(v)),
            Step::Done(payload) => Step::Done(payload),
        }
    }
}

struct FilterCursor<T, R, P> {
    inner: BoxTraversal<T, R>,
    predicate: Arc<P>,
}

impl<T, R, P> Traversal for FilterCursor<T, R, P>
where
    P: Fn(&T) -> bool + Send + Sync,
{
    type Item = T;
    type Return = R;

    fn step(&mut self) -> Step<T, R> {
        loop {
            match self.inner.step() {
                Step::Value(v) => {
                    if (self.predicate)(&v) {
                        return Step::Value(v);
                    }
                }
                Step::Done(payload) => return Step::Done(payload),
            }
        }
    }
}

struct MapReturnCursor<T, R, F> {
    inner: BoxTraversal<T, R>,
    f: Arc<F>,
}

impl<T, R, R2, F> Traversal for MapReturnCursor<T, R, F>
where
    F: Fn(R) -> R2 + Send + Sync,
{
    type Item = T;
    type Return = R2;

    fn step(&mut self) -> Step<T, R2> {
        match self.inner.step() {
            Step::Value(v) => Step::Value(v),
            Step::Done(payload) => Step::Done((self.f)(payload)),
        }
    }
}

struct ZipCursor<T, Ra, U, Rb> {
    left: BoxTraversal<T, Ra>,
    right: BoxTraversal<U, Rb>,
}

impl<T, Ra, U, Rb> Traversal for ZipCursor<T, Ra, U, Rb> {
    type Item = (T, U);
    type Return = ();

    fn step(&mut self) -> Step<(T, U), ()> {
        let a = match self.left.step() {
            Step::Value(v) => v,
            Step::Done(_) => return Step::Done(()),
        };
        match self.right.step() {
            Step::Value(b) => Step::Value((a, b)),
            Step::Done(_) => Step::Done(()),
        }
    }
}

enum BindState<T, R, R2> {
    First(BoxTraversal<T, R>),
    Second(BoxTraversal<T, R2>),
}

struct BindCursor<T, R, R2, F> {
    state: BindState<T, R, R2>,
    f: Arc<F>,
}

impl<T, R, R2, F> Traversal for BindCursor<T, R, R2, F>
where
    T: Send + 'static,
    R: Send + 'static,
    R2: Send + 'static,
    F: Fn(R) -> Stream<T, R2> + Send + Sync,
{
    type Item = T;
    type Return = R2;

    fn step(&mut self) -> Step<T, R2> {
        loop {
            match &mut self.state {
                BindState::First(traversal) => match traversal.step() {
                    Step::Value(v) => return Step::Value(v),
                    Step::Done(payload) => {
                        let next = (self.f)(payload);
                        self.state = BindState::Second(next.activate());
                    }
                },
                BindState::Second(traversal) => return traversal.step(),
            }
        }
    }
}

struct CycleCursor<T, R> {
    current: BoxTraversal<T, R>,
    stream: Stream<T, R>,
    yielded_this_pass: bool,
}

impl<T, R> Traversal for CycleCursor<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    type Item = T;
    type Return = ();

    fn step(&mut self) -> Step<T, ()> {
        loop {
            match self.current.step() {
                Step::Value(v) => {
                    self.yielded_this_pass = true;
                    return Step::Value(v);
                }
                Step::Done(_) => {
                    if !self.yielded_this_pass {
                        tracing::warn!("cycling a stream that yields no values; terminating");
                        return Step::Done(());
                    }
                    self.yielded_this_pass = false;
                    self.current = self.stream.activate();
                }
            }
        }
    }
}

struct CycleNCursor<T, R> {
    current: BoxTraversal<T, R>,
    stream: Stream<T, R>,
    remaining: usize,
}

impl<T, R> Traversal for CycleNCursor<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    type Item = T;
    type Return = R;

    fn step(&mut self) -> Step<T, R> {
        loop {
            match self.current.step() {
                Step::Value(v) => return Step::Value(v),
                Step::Done(payload) => {
                    if self.remaining == 0 {
                        return Step::Done(payload);
                    }
                    self.remaining -= 1;
                    self.current = self.stream.activate();
                }
            }
        }
    }
}

struct HoldCursor<T, R> {
    inner: BoxTraversal<T, R>,
    times: usize,
    current: Option<(T, usize)>,
}

impl<T, R> Traversal for HoldCursor<T, R>
where
    T: Clone + Send,
{
    type Item = T;
    type Return = R;

    fn step(&mut self) -> Step<T, R> {
        loop {
            if let Some((value, left)) = &mut self.current {
                if *left > 0 {
                    *left -= 1;
                    return Step::Value(value.clone());
                }
                self.current = None;
            }
            match self.inner.step() {
                Step::Value(v) => self.current = Some((v, self.times)),
                Step::Done(payload) => return Step::Done(payload),
            }
        }
    }
}

struct ScanCursor<T, A, R, F> {
    inner: BoxTraversal<T, R>,
    acc: A,
    f: Arc<F>,
}

impl<T, A, R, F> Traversal for ScanCursor<T, A, R, F>
where
    A: Clone + Send,
    F: Fn(A, T) -> A + Send + Sync,
{
    type Item = A;
    type Return = A;

    fn step(&mut self) -> Step<A, A> {
        match self.inner.step() {
            Step::Value(v) => {
                let next = (self.f)(self.acc.clone(), v);
                let emitted = mem::replace(&mut self.acc, next);
                Step::Value(emitted)
            }
            Step::Done(_) => Step::Done(self.acc.clone()),
        }
    }
}

struct ChunkCursor<T, R> {
    inner: BoxTraversal<T, R>,
    size: usize,
    pending: Option<R>,
}

impl<T, R> Traversal for ChunkCursor<T, R>
where
    T: Send,
    R: Send,
{
    type Item = Vec<T>;
    type Return = R;

    fn step(&mut self) -> Step<Vec<T>, R> {
        if let Some(payload) = self.pending.take() {
            return Step::Done(payload);
        }
        let mut batch = Vec::with_capacity(self.size);
        loop {
            match self.inner.step() {
                Step::Value(v) => {
                    batch.push(v);
                    if batch.len() == self.size {
                        return Step::Value(batch);
                    }
                }
                Step::Done(payload) => {
                    if batch.is_empty() {
                        return Step::Done(payload);
                    }
                    self.pending = Some(payload);
                    return Step::Value(batch);
                }
            }
        }
    }
}

struct JoinCursor<T, R2, R> {
    outer: BoxTraversal<Stream<T, R2>, R>,
    current: Option<BoxTraversal<T, R2>>,
}

impl<T, R2, R> Traversal for JoinCursor<T, R2, R>
where
    T: Send + 'static,
    R2: Send + 'static,
{
    type Item = T;
    type Return = R;

    fn step(&mut self) -> Step<T, R> {
        loop {
            if let Some(traversal) = &mut self.current {
                match traversal.step() {
                    Step::Value(v) => return Step::Value(v),
                    Step::Done(_) => self.current = None,
                }
            }
            match self.outer.step() {
                Step::Value(stream) => self.current = Some(stream.activate()),
                Step::Done(payload) => return Step::Done(payload),
            }
        }
    }
}

struct FlattenCursor<T, R> {
    inner: BoxTraversal<Vec<T>, R>,
    buffer: std::vec::IntoIter<T>,
}

impl<T, R> Traversal for FlattenCursor<T, R>
where
    T: Send,
{
    type Item = T;
    type Return = R;

    fn step(&mut self) -> Step<T, R> {
        loop {
            if let Some(v) = self.buffer.next() {
                return Step::Value(v);
            }
            match self.inner.step() {
                Step::Value(batch) => self.buffer = batch.into_iter(),
                Step::Done(payload) => return Step::Done(payload),
            }
        }
    }
}

struct DrainCursor<T> {
    iter: std::vec::IntoIter<T>,
}

impl<T: Send> Traversal for DrainCursor<T> {
    type Item = T;
    type Return = ();

    fn step(&mut self) -> Step<T, ()> {
        match self.iter.next() {
            Some(v) => Step::Value(v),
            None => Step::Done(()),
        }
    }
}
