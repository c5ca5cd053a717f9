//! The replayable stream abstraction and its primitive constructors.
//!
//! A [`Stream`] is an immutable, cheaply-clonable description of a (possibly
//! infinite) ordered sequence of values. Activating a stream produces a
//! [`Traversal`]: an owned cursor that yields one [`Step`] at a time, either
//! a value or a terminal signal carrying a payload. The same stream may be
//! activated many times; each traversal is independent, and deterministic
//! streams yield the same values every time. Nondeterministic producers
//! (random sources, wrapped iterators, live input) are part of the model
//! too; [`memoize`](Stream::memoize) exists to give them replay capability.
//!
//! Generator-style definitions are expressed as explicit state machines: a
//! cursor struct owns the state, and every step returns [`Step::Value`] or
//! [`Step::Done`]. [`Stream::unfold`] packages the common case.

use crate::error::{StreamError, StreamResult};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// One step of a traversal: either the next value, or the terminal signal
/// with its payload.
///
/// Termination is the ordinary, expected way for a finite stream to end; it
/// is never conflated with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<T, R = ()> {
    /// The next value in the sequence.
    Value(T),
    /// The sequence has ended; carries the terminal payload.
    Done(R),
}

impl<T, R> Step<T, R> {
    /// Returns `true` for [`Step::Value`].
    pub fn is_value(&self) -> bool {
        matches!(self, Step::Value(_))
    }

    /// Extracts the value, discarding a terminal payload.
    pub fn value(self) -> Option<T> {
        match self {
            Step::Value(v) => Some(v),
            Step::Done(_) => None,
        }
    }
}

/// An active, stateful walk through a stream's sequence.
///
/// A traversal exclusively owns its mutable cursor state; the stream it came
/// from is immutable and shared. Stepping must complete synchronously; a
/// blocking producer belongs behind the [`live`](crate::live) adapter, not
/// inside a cursor.
pub trait Traversal: Send {
    /// The value type yielded by this traversal.
    type Item;
    /// The terminal payload type.
    type Return;

    /// Advance by one step.
    fn step(&mut self) -> Step<Self::Item, Self::Return>;
}

/// A boxed traversal trait object.
pub type BoxTraversal<T, R = ()> = Box<dyn Traversal<Item = T, Return = R>>;

impl<Tr: Traversal + ?Sized> Traversal for Box<Tr> {
    type Item = Tr::Item;
    type Return = Tr::Return;

    fn step(&mut self) -> Step<Self::Item, Self::Return> {
        (**self).step()
    }
}

/// Upcast helper so composite constructors can inspect a shared source for
/// flattening. Implemented for every `'static` type.
pub trait AsAny: Any {
    /// View the concrete type as [`Any`].
    fn as_any(&self) -> &dyn Any;
}

impl<A: Any> AsAny for A {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The capability a producer type must satisfy to act as a stream: create a
/// fresh, independent traversal of its sequence.
///
/// Sources are immutable and shared (`Send + Sync`); all mutable state lives
/// in the traversals they hand out.
pub trait Source<T, R = ()>: Send + Sync + AsAny {
    /// Begin a fresh traversal from the stream's defining point.
    fn activate(&self) -> BoxTraversal<T, R>;
}

/// An immutable, replayable producer of an ordered (possibly infinite)
/// sequence of `T` values, terminating, if at all, with a payload of type
/// `R`.
///
/// Streams are cheap to clone (a shared handle) and are composed with the
/// combinators in this module and the operator algebra: `>>` concatenates,
/// `+` mixes, `*` modulates.
///
/// # Examples
///
/// ```
/// use audio_streams::{constant, Stream};
///
/// let ones: Stream<f64> = constant(1.0);
/// let twos = ones.clone() + ones;
/// assert_eq!(twos.take(3).to_vec(), vec![2.0, 2.0, 2.0]);
/// ```
pub struct Stream<T, R = ()> {
    source: Arc<dyn Source<T, R>>,
}

impl<T, R> Clone for Stream<T, R> {
    fn clone(&self) -> Self {
        Stream {
            source: Arc::clone(&self.source),
        }
    }
}

impl<T, R> fmt::Debug for Stream<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream").finish_non_exhaustive()
    }
}

impl<T, R> Stream<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Wrap a [`Source`] implementation in a stream handle.
    pub fn from_source(source: impl Source<T, R> + 'static) -> Self {
        Stream {
            source: Arc::new(source),
        }
    }

    /// Build a stream from an activation closure returning a fresh cursor:
    /// the all-purpose constructor for custom stream types.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> BoxTraversal<T, R> + Send + Sync + 'static,
    {
        Stream::from_source(FnSource { f })
    }

    /// Build a stream from an explicit state machine: `seed` is cloned into
    /// each traversal and `step` advances it, returning the next [`Step`].
    ///
    /// # Examples
    ///
    /// ```
    /// use audio_streams::{Step, Stream};
    ///
    /// let naturals: Stream<u64> = Stream::unfold(0u64, |n| {
    ///     let value = *n;
    ///     *n += 1;
    ///     Step::Value(value)
    /// });
    /// assert_eq!(naturals.take(4).to_vec(), vec![0, 1, 2, 3]);
    /// ```
    pub fn unfold<S, F>(seed: S, step: F) -> Self
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(&mut S) -> Step<T, R> + Send + Sync + 'static,
    {
        let step = Arc::new(step);
        Stream::from_fn(move || {
            Box::new(UnfoldCursor {
                state: seed.clone(),
                f: Arc::clone(&step),
            })
        })
    }

    /// Begin a fresh traversal of this stream.
    pub fn activate(&self) -> BoxTraversal<T, R> {
        self.source.activate()
    }

    pub(crate) fn source_any(&self) -> &dyn Any {
        self.source.as_any()
    }

    /// Collect every value of a finite stream, discarding the terminal
    /// payload. Never returns on an unbounded stream.
    pub fn to_vec(&self) -> Vec<T> {
        self.collect_all().0
    }

    /// Run a finite stream for its side effects, returning the terminal
    /// payload. Never returns on an unbounded stream.
    pub fn run(&self) -> R {
        let mut traversal = self.activate();
        loop {
            if let Step::Done(payload) = traversal.step() {
                return payload;
            }
        }
    }

    /// Collect every value and the terminal payload of a finite stream.
    /// Never returns on an unbounded stream.
    pub fn collect_all(&self) -> (Vec<T>, R) {
        let mut traversal = self.activate();
        let mut values = Vec::new();
        loop {
            match traversal.step() {
                Step::Value(v) => values.push(v),
                Step::Done(payload) => return (values, payload),
            }
        }
    }

    /// Eagerly extract the value at `index`.
    ///
    /// Walking past the end of a finite stream is a recoverable error,
    /// distinct from ordinary termination.
    ///
    /// # Examples
    ///
    /// ```
    /// use audio_streams::from_vec;
    ///
    /// let s = from_vec(vec![10, 20, 30]);
    /// assert_eq!(s.get(1).unwrap(), 20);
    /// assert!(s.get(3).is_err());
    /// ```
    pub fn get(&self, index: usize) -> StreamResult<T> {
        let mut traversal = self.activate();
        let mut seen = 0;
        loop {
            match traversal.step() {
                Step::Value(v) => {
                    if seen == index {
                        return Ok(v);
                    }
                    seen += 1;
                }
                Step::Done(_) => {
                    return Err(StreamError::IndexOutOfRange {
                        index,
                        length: seen,
                    });
                }
            }
        }
    }

    /// Materialize a finite stream into a fixed in-memory sequence.
    ///
    /// The frozen stream replays the recorded values on every activation and
    /// owns them until dropped. Never returns on an unbounded stream.
    pub fn freeze(&self) -> Stream<T, ()>
    where
        T: Clone + Sync,
    {
        from_vec(self.to_vec())
    }

    /// Read one value without consuming it destructively.
    ///
    /// Returns the first value (if any) together with an equivalent stream
    /// that re-prepends it ("un-peek"). The returned stream continues the
    /// traversal begun here, so it is single-pass past the peeked value.
    pub fn peek(&self) -> (Option<T>, Stream<T, R>)
    where
        T: Clone + Sync,
        R: Clone + Default + Sync,
    {
        let mut traversal = self.activate();
        match traversal.step() {
            Step::Value(v) => (Some(v.clone()), cons(v, Stream::from_traversal(traversal))),
            Step::Done(payload) => (None, finished(payload)),
        }
    }

    /// Wrap an already-running traversal as a single-pass stream.
    ///
    /// The first activation continues the traversal; once it has been handed
    /// out, further activations terminate immediately with `R::default()`,
    /// the typed analogue of re-iterating a spent iterator.
    pub fn from_traversal(traversal: BoxTraversal<T, R>) -> Self
    where
        R: Default,
    {
        Stream::from_source(SinglePassSource {
            cell: Mutex::new(Some(traversal)),
        })
    }
}

impl<T, R> Default for Stream<T, R>
where
    T: Send + 'static,
    R: Default + Send + 'static,
{
    /// The empty stream: terminates immediately with `R::default()`.
    fn default() -> Self {
        Stream::from_fn(|| {
            Box::new(ReturnCursor {
                payload: None,
                _item: PhantomData,
            })
        })
    }
}

impl<T> FromIterator<T> for Stream<T, ()>
where
    T: Clone + Send + Sync + 'static,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        from_vec(iter.into_iter().collect())
    }
}

impl<R: Send + 'static> From<f64> for Stream<f64, R> {
    /// A bare number used where a stream is expected becomes a constant
    /// stream, the typed version of "scalar or stream" parameters.
    fn from(value: f64) -> Self {
        constant(value)
    }
}

// ---------------------------------------------------------------------------
// Primitive constructors
// ---------------------------------------------------------------------------

/// A stream that yields `value` forever.
///
/// Infinite streams never produce a terminal payload, so the payload type is
/// free to unify with whatever the surrounding composition requires.
pub fn constant<T, R>(value: T) -> Stream<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
    Stream::from_fn(move || {
        Box::new(ConstantCursor {
            value: value.clone(),
            _return: PhantomData,
        })
    })
}

/// A stream that invokes a generator function for every value, forever.
///
/// The generator may be side-effecting or nondeterministic; each step calls
/// it afresh.
pub fn repeat_with<T, R, F>(generator: F) -> Stream<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    let generator = Arc::new(generator);
    Stream::from_fn(move || {
        Box::new(RepeatWithCursor {
            f: Arc::clone(&generator),
            _return: PhantomData,
        })
    })
}

/// The counting stream: `0, 1, 2, ...`.
pub fn count() -> Stream<u64> {
    count_from(0)
}

/// A counting stream beginning at `start`.
pub fn count_from(start: u64) -> Stream<u64> {
    Stream::unfold(start, |next| {
        let value = *next;
        *next += 1;
        Step::Value(value)
    })
}

/// The empty stream: yields nothing and terminates immediately.
pub fn empty<T: Send + 'static>() -> Stream<T, ()> {
    finished(())
}

/// A stream that yields nothing and terminates immediately with `payload`:
/// an empty stream that still carries a value for
/// [`bind`](Stream::bind).
pub fn finished<T, R>(payload: R) -> Stream<T, R>
where
    T: Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    Stream::from_fn(move || {
        Box::new(FinishedCursor {
            payload: payload.clone(),
            _item: PhantomData,
        })
    })
}

/// A stream of exactly one value.
pub fn once<T>(value: T) -> Stream<T, ()>
where
    T: Clone + Send + Sync + 'static,
{
    cons(value, empty())
}

/// Prepend a value to a stream, leaving its termination untouched.
pub fn cons<T, R>(head: T, tail: Stream<T, R>) -> Stream<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
    Stream::from_fn(move || {
        Box::new(ConsCursor {
            head: Some(head.clone()),
            tail: tail.clone(),
            active: None,
        })
    })
}

/// A replayable stream over an owned sequence of values.
pub fn from_vec<T>(values: Vec<T>) -> Stream<T, ()>
where
    T: Clone + Send + Sync + 'static,
{
    let values: Arc<[T]> = values.into();
    Stream::from_fn(move || {
        Box::new(VecCursor {
            values: Arc::clone(&values),
            index: 0,
        })
    })
}

/// Wrap a one-shot iterator as a single-pass stream.
///
/// The iterator is consumed by the first activation; use
/// [`memoize`](Stream::memoize) on the result if replay is needed.
pub fn from_iter_once<T, I>(iterator: I) -> Stream<T, ()>
where
    T: Send + 'static,
    I: Iterator<Item = T> + Send + 'static,
{
    Stream::from_traversal(Box::new(IterCursor { iter: iterator }))
}

// ---------------------------------------------------------------------------
// Sources and cursors
// ---------------------------------------------------------------------------

struct FnSource<F> {
    f: F,
}

impl<T, R, F> Source<T, R> for FnSource<F>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn() -> BoxTraversal<T, R> + Send + Sync + 'static,
{
    fn activate(&self) -> BoxTraversal<T, R> {
        (self.f)()
    }
}

struct ConstantCursor<T, R> {
    value: T,
    _return: PhantomData<fn() -> R>,
}

impl<T, R> Traversal for ConstantCursor<T, R>
where
    T: Clone + Send,
{
    type Item = T;
    type Return = R;

    fn step(&mut self) -> Step<T, R> {
        Step::Value(self.value.clone())
    }
}

struct RepeatWithCursor<F, R> {
    f: Arc<F>,
    _return: PhantomData<fn() -> R>,
}

impl<T, R, F> Traversal for RepeatWithCursor<F, R>
where
    F: Fn() -> T + Send + Sync,
{
    type Item = T;
    type Return = R;

    fn step(&mut self) -> Step<T, R> {
        Step::Value((self.f)())
    }
}

struct UnfoldCursor<S, F> {
    state: S,
    f: Arc<F>,
}

impl<S, T, R, F> Traversal for UnfoldCursor<S, F>
where
    S: Send,
    F: Fn(&mut S) -> Step<T, R> + Send + Sync,
{
    type Item = T;
    type Return = R;

    fn step(&mut self) -> Step<T, R> {
        (self.f)(&mut self.state)
    }
}

/// Terminates immediately; yields the stored payload once, then
/// `R::default()` on any further step.
pub(crate) struct ReturnCursor<T, R> {
    pub(crate) payload: Option<R>,
    pub(crate) _item: PhantomData<fn() -> T>,
}

impl<T, R> ReturnCursor<T, R> {
    pub(crate) fn new(payload: R) -> Self {
        ReturnCursor {
            payload: Some(payload),
            _item: PhantomData,
        }
    }
}

impl<T, R> Traversal for ReturnCursor<T, R>
where
    R: Default + Send,
{
    type Item = T;
    type Return = R;

    fn step(&mut self) -> Step<T, R> {
        Step::Done(self.payload.take().unwrap_or_default())
    }
}

struct FinishedCursor<T, R> {
    payload: R,
    _item: PhantomData<fn() -> T>,
}

impl<T, R> Traversal for FinishedCursor<T, R>
where
    R: Clone + Send,
{
    type Item = T;
    type Return = R;

    fn step(&mut self) -> Step<T, R> {
        Step::Done(self.payload.clone())
    }
}

struct ConsCursor<T, R> {
    head: Option<T>,
    tail: Stream<T, R>,
    active: Option<BoxTraversal<T, R>>,
}

impl<T, R> Traversal for ConsCursor<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    type Item = T;
    type Return = R;

    fn step(&mut self) -> Step<T, R> {
        if let Some(head) = self.head.take() {
            return Step::Value(head);
        }
        self.active
            .get_or_insert_with(|| self.tail.activate())
            .step()
    }
}

struct VecCursor<T> {
    values: Arc<[T]>,
    index: usize,
}

impl<T> Traversal for VecCursor<T>
where
    T: Clone + Send + Sync,
{
    type Item = T;
    type Return = ();

    fn step(&mut self) -> Step<T, ()> {
        match self.values.get(self.index) {
            Some(v) => {
                self.index += 1;
                Step::Value(v.clone())
            }
            None => Step::Done(()),
        }
    }
}

struct IterCursor<I> {
    iter: I,
}

impl<T, I> Traversal for IterCursor<I>
where
    I: Iterator<Item = T> + Send,
{
    type Item = T;
    type Return = ();

    fn step(&mut self) -> Step<T, ()> {
        match self.iter.next() {
            Some(v) => Step::Value(v),
            None => Step::Done(()),
        }
    }
}

struct SinglePassSource<T, R> {
    cell: Mutex<Option<BoxTraversal<T, R>>>,
}

impl<T, R> Source<T, R> for SinglePassSource<T, R>
where
    T: Send + 'static,
    R: Default + Send + 'static,
{
    fn activate(&self) -> BoxTraversal<T, R> {
        match self.cell.lock().take() {
            Some(traversal) => traversal,
            None => Box::new(ReturnCursor {
                payload: None,
                _item: PhantomData,
            }),
        }
    }
}
