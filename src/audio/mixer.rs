//! Dynamic mixing and timeline arrangement.
//!
//! [`Mixer`] supports connecting and disconnecting streams to a live mix
//! while it plays: an imperative escape hatch from the otherwise
//! declarative algebra. [`arrange`] is the declarative cousin: a DAW-style
//! timeline of `(start_sample, stream)` pairs, mixed at their offsets.

use crate::stream::{BoxTraversal, Step, Stream, Traversal};
use crate::traits::Sample;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// A live mixing bus: streams can be connected and disconnected while a
/// consumer pulls from it.
///
/// The mixer's output streams ([`Mixer::take`] and [`Mixer::stream`]) are
/// *live views* over shared traversals, not replayable descriptions:
/// re-activating them continues from wherever the bus currently is. That is
/// the point: a sequencing stream can yield a few seconds of output,
/// connect another part, and keep going.
///
/// Cloning a `Mixer` clones the handle, not the bus.
#[derive(Clone)]
pub struct Mixer<T: Sample> {
    shared: Arc<Mutex<MixerState<T>>>,
    fill: T,
}

/// Identifies one connection for later [`Mixer::disconnect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixerHandle(u64);

struct MixerState<T> {
    channels: Vec<(u64, BoxTraversal<T, ()>)>,
    next_id: u64,
}

impl<T: Sample> Mixer<T> {
    /// An empty bus that yields `fill` while nothing is connected.
    pub fn new(fill: T) -> Self {
        Mixer {
            shared: Arc::new(Mutex::new(MixerState {
                channels: Vec::new(),
                next_id: 0,
            })),
            fill,
        }
    }

    /// Connect a stream to the bus, activating it now. Returns a handle for
    /// [`disconnect`](Mixer::disconnect).
    pub fn connect<R>(&self, stream: &Stream<T, R>) -> MixerHandle
    where
        R: Send + 'static,
    {
        let mut state = self.shared.lock();
        let id = state.next_id;
        state.next_id += 1;
        state
            .channels
            .push((id, stream.strip_return().activate()));
        MixerHandle(id)
    }

    /// Remove a connection. Disconnecting a channel that already finished
    /// (and was dropped from the bus) is a no-op.
    pub fn disconnect(&self, handle: MixerHandle) {
        let mut state = self.shared.lock();
        state.channels.retain(|(id, _)| *id != handle.0);
    }

    /// Exactly `len` mixed samples, yielding `fill` whenever no channel is
    /// connected or all connected channels have finished.
    pub fn take(&self, len: usize) -> Stream<T, ()> {
        let shared = Arc::clone(&self.shared);
        let fill = self.fill;
        Stream::from_fn(move || {
            Box::new(MixerTakeCursor {
                shared: Arc::clone(&shared),
                fill,
                remaining: len,
            })
        })
    }

    /// The rest of the mix: yields until every connected channel has
    /// terminated.
    pub fn stream(&self) -> Stream<T, ()> {
        let shared = Arc::clone(&self.shared);
        Stream::from_fn(move || {
            Box::new(MixerDrainCursor {
                shared: Arc::clone(&shared),
            })
        })
    }
}

fn mix_step<T: Sample>(state: &mut MixerState<T>) -> Option<T> {
    let mut acc: Option<T> = None;
    let mut index = 0;
    while index < state.channels.len() {
        match state.channels[index].1.step() {
            Step::Value(v) => {
                acc = Some(match acc {
                    Some(sum) => sum + v,
                    None => v,
                });
                index += 1;
            }
            Step::Done(()) => {
                state.channels.swap_remove(index);
            }
        }
    }
    acc
}

struct MixerTakeCursor<T: Sample> {
    shared: Arc<Mutex<MixerState<T>>>,
    fill: T,
    remaining: usize,
}

impl<T: Sample> Traversal for MixerTakeCursor<T> {
    type Item = T;
    type Return = ();

    fn step(&mut self) -> Step<T, ()> {
        if self.remaining == 0 {
            return Step::Done(());
        }
        self.remaining -= 1;
        let mut state = self.shared.lock();
        Step::Value(mix_step(&mut state).unwrap_or(self.fill))
    }
}

struct MixerDrainCursor<T: Sample> {
    shared: Arc<Mutex<MixerState<T>>>,
}

impl<T: Sample> Traversal for MixerDrainCursor<T> {
    type Item = T;
    type Return = ();

    fn step(&mut self) -> Step<T, ()> {
        let mut state = self.shared.lock();
        match mix_step(&mut state) {
            Some(v) => Step::Value(v),
            None => Step::Done(()),
        }
    }
}

/// Arrange streams on a timeline: each `(start, stream)` item begins playing
/// `start` samples in, mixed with whatever else is sounding; gaps yield
/// `fill`. Terminates once every item has started and finished. Replayable
/// (each activation builds a fresh arrangement).
///
/// # Examples
///
/// ```
/// use audio_streams::audio::arrange;
/// use audio_streams::from_vec;
///
/// let hits = arrange(
///     vec![
///         (0, from_vec(vec![1.0, 1.0])),
///         (3, from_vec(vec![5.0])),
///     ],
///     0.0,
/// );
/// assert_eq!(hits.to_vec(), vec![1.0, 1.0, 0.0, 5.0]);
/// ```
pub fn arrange<T: Sample>(items: Vec<(usize, Stream<T, ()>)>, fill: T) -> Stream<T, ()> {
    let mut items = items;
    items.sort_by_key(|(start, _)| *start);
    let items: Arc<[(usize, Stream<T, ()>)]> = items.into();
    Stream::from_fn(move || {
        Box::new(ArrangeCursor {
            upcoming: items.iter().cloned().collect(),
            active: Vec::new(),
            now: 0,
            fill,
        })
    })
}

struct ArrangeCursor<T: Sample> {
    upcoming: VecDeque<(usize, Stream<T, ()>)>,
    active: Vec<BoxTraversal<T, ()>>,
    now: usize,
    fill: T,
}

impl<T: Sample> Traversal for ArrangeCursor<T> {
    type Item = T;
    type Return = ();

    fn step(&mut self) -> Step<T, ()> {
        while self
            .upcoming
            .front()
            .is_some_and(|(start, _)| *start <= self.now)
        {
            let (_, stream) = self.upcoming.pop_front().expect("front checked");
            self.active.push(stream.activate());
        }
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
                Step::Done(()) => {
                    self.active.swap_remove(index);
                }
            }
        }
        if acc.is_none() && self.upcoming.is_empty() {
            return Step::Done(());
        }
        self.now += 1;
        Step::Value(acc.unwrap_or(self.fill))
    }
}

/// Spread timed events over a stream: tick `t` yields the event scheduled
/// there, or `filler` otherwise. Terminates after the last event. Events
/// sharing a tick are emitted on consecutive ticks.
pub fn events_in_time<E>(timed: Vec<(usize, E)>, filler: E) -> Stream<E, ()>
where
    E: Clone + Send + Sync + 'static,
{
    let mut timed = timed;
    timed.sort_by_key(|(tick, _)| *tick);
    let timed: Arc<[(usize, E)]> = timed.into();
    Stream::from_fn(move || {
        Box::new(EventsCursor {
            upcoming: timed.iter().cloned().collect(),
            now: 0,
            filler: filler.clone(),
        })
    })
}

struct EventsCursor<E> {
    upcoming: VecDeque<(usize, E)>,
    now: usize,
    filler: E,
}

impl<E> Traversal for EventsCursor<E>
where
    E: Clone + Send,
{
    type Item = E;
    type Return = ();

    fn step(&mut self) -> Step<E, ()> {
        let Some((tick, _)) = self.upcoming.front() else {
            return Step::Done(());
        };
        let out = if *tick <= self.now {
            let (_, event) = self.upcoming.pop_front().expect("front checked");
            event
        } else {
            self.filler.clone()
        };
        self.now += 1;
        Step::Value(out)
    }
}

/// A toy sequencer: `(midi_pitch, duration_in_whole_notes)` pairs become
/// square-wave notes shaped by [`basic_envelope`](super::basic_envelope),
/// played back to back at `bpm` (quarter notes have the beat).
pub fn basic_sequencer(notes: Vec<(u8, f64)>, bpm: f64, sample_rate: u32) -> Stream<f64> {
    let notes = crate::stream::from_vec(notes);
    notes
        .map(move |(pitch, duration)| {
            let seconds = 60.0 / bpm * duration * 4.0;
            let len = super::seconds_to_samples(seconds, sample_rate);
            super::sqr(super::midi_to_freq(pitch as f64), sample_rate)
                * super::basic_envelope(len)
        })
        .join()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::from_vec;

    #[test]
    fn mixer_fills_when_idle_and_sums_when_busy() {
        let bus: Mixer<f64> = Mixer::new(0.0);
        assert_eq!(bus.take(2).to_vec(), vec![0.0, 0.0]);
        bus.connect(&from_vec(vec![1.0, 1.0, 1.0]));
        bus.connect(&from_vec(vec![10.0]));
        assert_eq!(bus.take(2).to_vec(), vec![11.0, 1.0]);
        // One sample of the first stream is still pending.
        assert_eq!(bus.stream().to_vec(), vec![1.0]);
    }

    #[test]
    fn mixer_disconnect_silences_a_channel() {
        let bus: Mixer<f64> = Mixer::new(0.0);
        let keep = bus.connect(&from_vec(vec![1.0, 1.0, 1.0]));
        let drop = bus.connect(&from_vec(vec![10.0, 10.0, 10.0]));
        assert_eq!(bus.take(1).to_vec(), vec![11.0]);
        bus.disconnect(drop);
        assert_eq!(bus.take(1).to_vec(), vec![1.0]);
        bus.disconnect(keep);
        assert_eq!(bus.take(1).to_vec(), vec![0.0]);
    }

    #[test]
    fn arrange_offsets_and_overlaps() {
        let timeline = arrange(
            vec![
                (2, from_vec(vec![1.0, 1.0, 1.0])),
                (3, from_vec(vec![10.0])),
            ],
            0.0,
        );
        assert_eq!(timeline.to_vec(), vec![0.0, 0.0, 1.0, 11.0, 1.0]);
        // Replayable: a second traversal is identical.
        assert_eq!(timeline.to_vec(), vec![0.0, 0.0, 1.0, 11.0, 1.0]);
    }

    #[test]
    fn arrange_of_nothing_is_empty() {
        let timeline: Stream<f64> = arrange(vec![], 0.0);
        assert_eq!(timeline.to_vec(), Vec::<f64>::new());
    }

    #[test]
    fn events_land_on_their_ticks() {
        let events = events_in_time(vec![(2, "snare"), (0, "kick")], "rest");
        assert_eq!(events.to_vec(), vec!["kick", "rest", "snare"]);
    }

    #[test]
    fn sequencer_renders_notes_back_to_back() {
        // Two sixteenth notes at 60 bpm: 0.25s each at 8 kHz.
        let line = basic_sequencer(vec![(69, 1.0 / 16.0), (57, 1.0 / 16.0)], 60.0, 8000);
        assert_eq!(line.to_vec().len(), 4000);
    }
}
