//! Composite stream types: concatenation, mixing, N-ary zip, and slicing.
//!
//! Each composite is a small state machine over the traversals of its
//! children with its own termination policy:
//!
//! - [`concat`]: children in sequence; terminal when all are exhausted,
//!   propagating the last child's payload.
//! - [`mix`]: elementwise sum; children that terminate drop out (absent ⇒
//!   zero) and the mix continues until **all** have terminated.
//! - [`zip_all`]: lockstep; terminates as soon as **any** child terminates.
//! - [`Stream::slice`]: an index window over one child; the terminal payload
//!   is the still-traversable remainder of the child.
//!
//! Nested concats and mixes are flattened at construction so that operator
//! chains never build up traversal-time nesting depth.

use super::core::{BoxTraversal, ReturnCursor, Source, Step, Stream, Traversal};
use crate::error::{StreamError, StreamResult};
use crate::traits::Sample;
use std::ops::{Bound, RangeBounds};

/// Sequence `parts` end-to-end: all of the first stream's values, then the
/// next's, and so on. When one child's traversal terminates, the next child
/// is activated and stepped within the same step; no dead step is emitted
/// at the seams. The terminal payload is the last child's payload; earlier
/// children's payloads are dropped.
///
/// Nested concatenations are flattened here, so `(a >> b) >> c` and
/// `a >> (b >> c)` build the identical three-child node.
///
/// # Panics
///
/// Panics if `parts` is empty (there would be no terminal payload to
/// propagate).
pub fn concat<T, R>(parts: Vec<Stream<T, R>>) -> Stream<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    assert!(!parts.is_empty(), "concat requires at least one stream");
    let mut flat = Vec::with_capacity(parts.len());
    for part in parts {
        match part.source_any().downcast_ref::<ConcatSource<T, R>>() {
            Some(nested) => flat.extend(nested.parts.iter().cloned()),
            None => flat.push(part),
        }
    }
    Stream::from_source(ConcatSource { parts: flat })
}

/// Sum `parts` elementwise. Children that terminate during a step simply
/// stop contributing (an absent child counts as zero), and the mix keeps
/// going until every child has terminated. Child terminal payloads are
/// erased; the mix's own payload is unit and deliberately carries no
/// information.
///
/// Nested mixes are flattened; `mix` of an empty list is the empty stream.
pub fn mix<T>(parts: Vec<Stream<T, ()>>) -> Stream<T, ()>
where
    T: Sample,
{
    let mut flat = Vec::with_capacity(parts.len());
    for part in parts {
        match part.source_any().downcast_ref::<MixSource<T>>() {
            Some(nested) => flat.extend(nested.parts.iter().cloned()),
            None => flat.push(part),
        }
    }
    Stream::from_source(MixSource { parts: flat })
}

/// Advance `parts` in lockstep, yielding one `Vec` of values per step.
/// Terminates as soon as any child terminates (strict shortest-wins, unlike
/// [`mix`]); children after the terminating one are not stepped that tick.
/// `zip_all` of an empty list terminates immediately.
pub fn zip_all<T, R>(parts: Vec<Stream<T, R>>) -> Stream<Vec<T>, ()>
where
    T: Send + 'static,
    R: Send + 'static,
{
    let source = ZipAllSource { parts };
    Stream::from_source(source)
}

impl<T, R> Stream<T, R>
where
    T: Send + 'static,
    R: Default + Send + 'static,
{
    /// Restrict the stream to the index window `range` (sample counts).
    ///
    /// The sliced stream's terminal payload is the unconsumed remainder of
    /// the child as a single-pass stream, so a consumer can pick up exactly
    /// where the slice stopped:
    ///
    /// ```
    /// use audio_streams::from_vec;
    ///
    /// let s = from_vec(vec![1, 2, 3, 4, 5]);
    /// let (head, rest) = s.take(2).collect_all();
    /// assert_eq!(head, vec![1, 2]);
    /// assert_eq!(rest.to_vec(), vec![3, 4, 5]);
    /// ```
    ///
    /// If the child terminates before the window is filled, its terminal
    /// payload is still reachable through the (empty) remainder stream.
    ///
    /// A window whose start lies beyond its end is rejected here, at
    /// construction.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> StreamResult<Stream<T, Stream<T, R>>> {
        self.slice_step(range, 1)
    }

    /// [`slice`](Stream::slice) with a stride: within the window, only every
    /// `step`-th element is emitted; the elements in between are consumed
    /// and dropped (lossy stepping, not decimate-and-hold).
    ///
    /// A zero `step` or a window whose start lies beyond its end is a
    /// contract violation rejected here, before any traversal begins.
    pub fn slice_step(
        &self,
        range: impl RangeBounds<usize>,
        step: usize,
    ) -> StreamResult<Stream<T, Stream<T, R>>> {
        if step == 0 {
            return Err(StreamError::invalid_parameter("slice step must be positive"));
        }
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s + 1,
            Bound::Unbounded => 0,
        };
        let stop = match range.end_bound() {
            Bound::Included(&e) => Some(e + 1),
            Bound::Excluded(&e) => Some(e),
            Bound::Unbounded => None,
        };
        if let Some(stop) = stop {
            if stop < start {
                return Err(StreamError::invalid_slice(format!(
                    "slice start {start} lies beyond stop {stop}"
                )));
            }
        }
        let inner = self.clone();
        Ok(Stream::from_fn(move || {
            Box::new(SliceCursor {
                inner: Some(inner.activate()),
                phase: SlicePhase::Skip {
                    remaining: start,
                },
                window: stop.map(|stop| stop - start),
                step,
            })
        }))
    }

    /// The first `count` values; the terminal payload is the remainder.
    ///
    /// # Panics
    ///
    /// Never: a `..count` window always passes the slice construction
    /// checks.
    pub fn take(&self, count: usize) -> Stream<T, Stream<T, R>> {
        self.slice_step(..count, 1)
            .expect("a ..count window is always valid")
    }

    /// Everything after the first `count` values.
    ///
    /// # Panics
    ///
    /// Never: a `count..` window always passes the slice construction
    /// checks.
    pub fn skip(&self, count: usize) -> Stream<T, Stream<T, R>> {
        self.slice_step(count.., 1)
            .expect("a count.. window is always valid")
    }
}

// ---------------------------------------------------------------------------
// Concat
// ---------------------------------------------------------------------------

pub(crate) struct ConcatSource<T, R> {
    pub(crate) parts: Vec<Stream<T, R>>,
}

impl<T, R> Source<T, R> for ConcatSource<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    fn activate(&self) -> BoxTraversal<T, R> {
        let mut remaining = self.parts.clone().into_iter();
        let current = remaining
            .next()
            .expect("concat source always has at least one child")
            .activate();
        Box::new(ConcatCursor { current, remaining })
    }
}

struct ConcatCursor<T, R> {
    current: BoxTraversal<T, R>,
    remaining: std::vec::IntoIter<Stream<T, R>>,
}

impl<T, R> Traversal for ConcatCursor<T, R>
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
                Step::Done(payload) => match self.remaining.next() {
                    Some(next) => self.current = next.activate(),
                    None => return Step::Done(payload),
                },
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Mix
// ---------------------------------------------------------------------------

pub(crate) struct MixSource<T> {
    pub(crate) parts: Vec<Stream<T, ()>>,
}

impl<T> Source<T, ()> for MixSource<T>
where
    T: Sample,
{
    fn activate(&self) -> BoxTraversal<T, ()> {
        Box::new(MixCursor {
            active: self.parts.iter().map(Stream::activate).collect(),
        })
    }
}

struct MixCursor<T> {
    active: Vec<BoxTraversal<T, ()>>,
}

impl<T> Traversal for MixCursor<T>
where
    T: Sample,
{
    type Item = T;
    type Return = ();

    fn step(&mut self) -> Step<T, ()> {
        let mut acc: Option<T> = None;
        let mut index = 0;
        while index < self.active.len() {
            match self.active[index].step() {
                Step::Value(v) => {
                    acc = Some(match acc {
                        Some(sum) => sum + v,
                        None => v,
                    });
                    index += 1;
                }
                // Exhausted children are removed, not replaced by fillers.
                Step::Done(()) => {
                    self.active.swap_remove(index);
                }
            }
        }
        match acc {
            Some(sum) => Step::Value(sum),
            None => Step::Done(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Zip (N-ary, homogeneous)
// ---------------------------------------------------------------------------

struct ZipAllSource<T, R> {
    parts: Vec<Stream<T, R>>,
}

impl<T, R> Source<Vec<T>, ()> for ZipAllSource<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    fn activate(&self) -> BoxTraversal<Vec<T>, ()> {
        Box::new(ZipAllCursor {
            children: self.parts.iter().map(Stream::activate).collect(),
        })
    }
}

struct ZipAllCursor<T, R> {
    children: Vec<BoxTraversal<T, R>>,
}

impl<T, R> Traversal for ZipAllCursor<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    type Item = Vec<T>;
    type Return = ();

    fn step(&mut self) -> Step<Vec<T>, ()> {
        if self.children.is_empty() {
            return Step::Done(());
        }
        let mut values = Vec::with_capacity(self.children.len());
        for child in &mut self.children {
            match child.step() {
                Step::Value(v) => values.push(v),
                Step::Done(_) => return Step::Done(()),
            }
        }
        Step::Value(values)
    }
}

// ---------------------------------------------------------------------------
// Slice
// ---------------------------------------------------------------------------

enum SlicePhase {
    Skip { remaining: usize },
    Window { consumed: usize },
    Finished,
}

struct SliceCursor<T, R> {
    inner: Option<BoxTraversal<T, R>>,
    phase: SlicePhase,
    /// `stop - start`; `None` for an unbounded slice.
    window: Option<usize>,
    step: usize,
}

impl<T, R> SliceCursor<T, R>
where
    T: Send + 'static,
    R: Default + Send + 'static,
{
    /// The child terminated inside the slice: the remainder is an empty
    /// stream that still carries the child's payload, keeping terminal
    /// payloads transparent across the slice boundary.
    fn early_remainder(&mut self, payload: R) -> Step<T, Stream<T, R>> {
        self.phase = SlicePhase::Finished;
        self.inner = None;
        Step::Done(Stream::from_traversal(Box::new(ReturnCursor::new(payload))))
    }
}

impl<T, R> Traversal for SliceCursor<T, R>
where
    T: Send + 'static,
    R: Default + Send + 'static,
{
    type Item = T;
    type Return = Stream<T, R>;

    fn step(&mut self) -> Step<T, Stream<T, R>> {
        loop {
            match &mut self.phase {
                SlicePhase::Skip { remaining } => {
                    let mut left = *remaining;
                    while left > 0 {
                        match self.inner.as_mut().expect("slice child present").step() {
                            Step::Value(_) => left -= 1,
                            Step::Done(payload) => return self.early_remainder(payload),
                        }
                    }
                    self.phase = SlicePhase::Window { consumed: 0 };
                }
                SlicePhase::Window { consumed } => {
                    if self.window.is_some_and(|window| *consumed >= window) {
                        let rest = self.inner.take().expect("slice child present");
                        self.phase = SlicePhase::Finished;
                        return Step::Done(Stream::from_traversal(rest));
                    }
                    match self.inner.as_mut().expect("slice child present").step() {
                        Step::Value(v) => {
                            let position = *consumed;
                            *consumed += 1;
                            if position % self.step == 0 {
                                return Step::Value(v);
                            }
                        }
                        Step::Done(payload) => return self.early_remainder(payload),
                    }
                }
                SlicePhase::Finished => {
                    return Step::Done(Stream::default());
                }
            }
        }
    }
}
