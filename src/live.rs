//! Running blocking streams without stalling the pull loop.
//!
//! The core algebra is synchronous: every step must return promptly, which
//! is a hard real-time constraint when the consumer is an audio callback.
//! Streams whose steps may take unbounded wall-clock time (file readers,
//! sockets, live input devices) are *blocking streams* and must not be
//! stepped from the audio thread directly.
//!
//! The adapter here, [`background`], runs a blocking stream's traversal on
//! a worker thread and surfaces it as a non-blocking stream: values arrive
//! in production order, never reordered, with gap samples interleaved
//! whenever the worker has not produced the next value yet. The *contract*
//! form of a non-blocking source (it yields `Some(value)` or a `None`
//! "not ready" sentinel, promptly) is the plain type
//! `Stream<Option<T>, R>`, and [`fill_gaps`] resolves it to a solid signal.

use crate::error::StreamError;
use crate::stream::{BoxTraversal, Step, Stream, Traversal};
use crossbeam::channel::{bounded, Receiver, TryRecvError};

/// Gap policy for resolving "not ready" into a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill<T> {
    /// Yield this fixed filler value during gaps.
    Value(T),
    /// Repeat the last delivered value; the wrapped value is used before
    /// anything has arrived.
    Hold(T),
}

/// Resolve a non-blocking stream's `None` sentinels with a [`Fill`] policy,
/// leaving real values and the terminal payload untouched.
pub fn fill_gaps<T, R>(stream: &Stream<Option<T>, R>, fill: Fill<T>) -> Stream<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
    let stream = stream.clone();
    Stream::from_fn(move || {
        Box::new(FillCursor {
            inner: stream.activate(),
            fill: fill.clone(),
        })
    })
}

struct FillCursor<T, R> {
    inner: BoxTraversal<Option<T>, R>,
    fill: Fill<T>,
}

impl<T, R> Traversal for FillCursor<T, R>
where
    T: Clone + Send,
{
    type Item = T;
    type Return = R;

    fn step(&mut self) -> Step<T, R> {
        match self.inner.step() {
            Step::Value(Some(v)) => {
                if let Fill::Hold(last) = &mut self.fill {
                    *last = v.clone();
                }
                Step::Value(v)
            }
            Step::Value(None) => Step::Value(match &self.fill {
                Fill::Value(filler) => filler.clone(),
                Fill::Hold(last) => last.clone(),
            }),
            Step::Done(payload) => Step::Done(payload),
        }
    }
}

/// Run `stream` on a worker thread and consume it without blocking.
///
/// Each activation spawns one worker that steps a fresh traversal of
/// `stream` and feeds a bounded channel of `capacity` values. The consumer
/// side never blocks: when the channel is empty it yields a gap sample per
/// the [`Fill`] policy, and when the worker delivers the terminal payload
/// it terminates with `Ok(payload)`.
///
/// Failure is a terminal payload, not a panic mid-step: if the worker
/// disappears without delivering a result, the stream terminates with
/// `Err(`[`StreamError::WorkerDisconnected`]`)`.
///
/// Dropping the consumer traversal closes the channel; the worker notices
/// on its next send and exits, dropping the blocking traversal and whatever
/// resources it owns.
pub fn background<T, R>(
    stream: &Stream<T, R>,
    fill: Fill<T>,
    capacity: usize,
) -> Stream<T, Result<R, StreamError>>
where
    T: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
    let stream = stream.clone();
    Stream::from_fn(move || {
        let (sender, receiver) = bounded(capacity.max(1));
        let source = stream.clone();
        std::thread::spawn(move || {
            tracing::debug!("background stream worker started");
            let mut traversal = source.activate();
            loop {
                match traversal.step() {
                    Step::Value(v) => {
                        if sender.send(Packet::Sample(v)).is_err() {
                            tracing::debug!("background stream consumer dropped; worker exiting");
                            return;
                        }
                    }
                    Step::Done(payload) => {
                        let _ = sender.send(Packet::End(payload));
                        return;
                    }
                }
            }
        });
        Box::new(BackgroundCursor {
            receiver,
            fill: fill.clone(),
        })
    })
}

enum Packet<T, R> {
    Sample(T),
    End(R),
}

struct BackgroundCursor<T, R> {
    receiver: Receiver<Packet<T, R>>,
    fill: Fill<T>,
}

impl<T, R> Traversal for BackgroundCursor<T, R>
where
    T: Clone + Send,
    R: Send,
{
    type Item = T;
    type Return = Result<R, StreamError>;

    fn step(&mut self) -> Step<T, Result<R, StreamError>> {
        match self.receiver.try_recv() {
            Ok(Packet::Sample(v)) => {
                if let Fill::Hold(last) = &mut self.fill {
                    *last = v.clone();
                }
                Step::Value(v)
            }
            Ok(Packet::End(payload)) => Step::Done(Ok(payload)),
            Err(TryRecvError::Empty) => Step::Value(match &self.fill {
                Fill::Value(filler) => filler.clone(),
                Fill::Hold(last) => last.clone(),
            }),
            Err(TryRecvError::Disconnected) => Step::Done(Err(StreamError::WorkerDisconnected)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{from_vec, once, Stream};

    #[test]
    fn fill_gaps_with_value_and_hold() {
        let sparse: Stream<Option<f64>> =
            from_vec(vec![None, Some(1.0), None, Some(2.0), None]);
        let filled = fill_gaps(&sparse, Fill::Value(0.0));
        assert_eq!(filled.to_vec(), vec![0.0, 1.0, 0.0, 2.0, 0.0]);
        let held = fill_gaps(&sparse, Fill::Hold(-1.0));
        assert_eq!(held.to_vec(), vec![-1.0, 1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn background_preserves_order_and_payload() {
        let source = from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        let live = background(&source, Fill::Value(0.0), 2);
        let (values, payload) = live.collect_all();
        assert_eq!(payload, Ok(()));
        // Gap fillers may be interleaved, but the real values arrive in
        // order with nothing lost.
        let reals: Vec<f64> = values.into_iter().filter(|v| *v != 0.0).collect();
        assert_eq!(reals, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn background_of_slow_source_fills_gaps() {
        let slow = once(7.0).each(|_| std::thread::sleep(std::time::Duration::from_millis(5)));
        let live = background(&slow, Fill::Value(0.0), 4);
        let (values, payload) = live.collect_all();
        assert_eq!(payload, Ok(()));
        assert!(values.contains(&7.0));
        // The consumer kept running during the worker's sleep.
        assert!(values.iter().filter(|v| **v == 0.0).count() > 0);
    }

    #[test]
    fn background_is_replayable_per_activation() {
        let source = from_vec(vec![5.0, 6.0]);
        let live = background(&source, Fill::Value(0.0), 4);
        for _ in 0..2 {
            let (values, payload) = live.collect_all();
            assert_eq!(payload, Ok(()));
            let reals: Vec<f64> = values.into_iter().filter(|v| *v != 0.0).collect();
            assert_eq!(reals, vec![5.0, 6.0]);
        }
    }
}
