//! Event streams and note-driven instruments.
//!
//! An *event stream* yields a `Vec<Event>` per tick: the events that occur
//! at that sample position (usually none, the empty vector). Timing is
//! positional; events themselves carry no timestamps. Because event streams
//! yield collections, parallel composition is just concatenation of the
//! per-tick vectors.
//!
//! An *instrument* is any function from an event stream to a sample stream.
//! [`mono_instrument`] is a small sine voice with velocity slewing;
//! [`poly`] lifts any monophonic instrument to polyphony by allocating one
//! voice per sounding key, each fed through its own private [`EventSlot`]
//! rather than the outer event stream, so unrelated note events never reach a
//! voice's monophonic logic.

use crate::audio::midi_to_freq;
use crate::stream::{repeat_with, BoxTraversal, Step, Stream, Traversal};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::f64::consts::TAU;
use std::mem;
use std::sync::Arc;

/// A note message. Velocity 0 on a `NoteOn` is treated as a release, per
/// MIDI convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Key pressed.
    NoteOn {
        /// MIDI note number.
        note: u8,
        /// Key velocity, 0-127.
        velocity: u8,
    },
    /// Key released.
    NoteOff {
        /// MIDI note number.
        note: u8,
    },
}

impl Event {
    /// The key this event addresses.
    pub fn note(&self) -> u8 {
        match self {
            Event::NoteOn { note, .. } | Event::NoteOff { note } => *note,
        }
    }
}

/// The events arriving at one tick.
pub type Events = Vec<Event>;

/// A private, externally-mutable mailbox feeding one voice.
///
/// The polyphonic allocator clears every slot at the start of each tick and
/// routes the tick's events into the slots of the keys they address;
/// [`slot_stream`] turns a slot into the infinite event stream a voice
/// consumes.
#[derive(Clone, Default)]
pub struct EventSlot {
    inner: Arc<Mutex<Events>>,
}

impl EventSlot {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event for the voice's next step.
    pub fn put(&self, event: Event) {
        self.inner.lock().push(event);
    }

    /// Drop any pending events.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// The currently pending events.
    pub fn current(&self) -> Events {
        self.inner.lock().clone()
    }
}

/// The infinite event stream read from a slot: each step yields whatever
/// the slot currently holds.
pub fn slot_stream(slot: &EventSlot) -> Stream<Events> {
    let slot = slot.clone();
    repeat_with(move || slot.current())
}

/// A monophonic sine voice.
///
/// Tracks the most recent note event per tick: `NoteOn` retunes the
/// oscillator and sets the target level from velocity, `NoteOff` (or a
/// zero-velocity `NoteOn`) releases. The amplitude slews toward its target
/// asymmetrically (a fast velocity-dependent attack, a slow linear
/// release) so retriggers click less.
///
/// With `persist` false, the voice terminates once it is both released and
/// inaudible; with `persist` true it keeps emitting silence, which is what
/// a live, indeterminate event source needs. Either way, termination of the
/// event stream terminates the voice.
pub fn mono_instrument(events: &Stream<Events>, sample_rate: u32, persist: bool) -> Stream<f64> {
    let events = events.clone();
    Stream::from_fn(move || {
        Box::new(MonoVoiceCursor {
            events: events.activate(),
            sample_rate: sample_rate as f64,
            persist,
            freq: 0.0,
            phase: 0.0,
            amp: 0.0,
            velocity: 0.0,
        })
    })
}

struct MonoVoiceCursor {
    events: BoxTraversal<Events>,
    sample_rate: f64,
    persist: bool,
    freq: f64,
    phase: f64,
    amp: f64,
    velocity: f64,
}

impl Traversal for MonoVoiceCursor {
    type Item = f64;
    type Return = ();

    fn step(&mut self) -> Step<f64, ()> {
        let events = match self.events.step() {
            Step::Value(events) => events,
            Step::Done(()) => return Step::Done(()),
        };
        // Only the most recent event of a tick matters to a mono voice.
        if let Some(event) = events.last() {
            match *event {
                Event::NoteOn { note, velocity } if velocity > 0 => {
                    self.freq = midi_to_freq(note as f64);
                    self.velocity = velocity as f64;
                }
                Event::NoteOn { .. } | Event::NoteOff { .. } => {
                    self.velocity = 0.0;
                }
            }
        }
        let target = self.velocity / 127.0;
        if self.amp > target {
            self.amp = (self.amp - 1e-4).max(target);
        } else {
            self.amp = (self.amp + 1e-6 * self.velocity * self.velocity).min(target);
        }
        self.phase += TAU * self.freq / self.sample_rate;
        if !self.persist && self.amp == 0.0 && self.velocity == 0.0 {
            return Step::Done(());
        }
        Step::Value(self.amp * self.phase.sin())
    }
}

/// Lift a monophonic instrument into a polyphonic one.
///
/// Voice allocation per tick:
///
/// - `NoteOn` for a silent key allocates a fresh voice from `factory`, fed
///   its own slot stream, and steps it immediately (the voice sounds on the
///   tick of its note-on).
/// - `NoteOn` for a sounding key retriggers: the event is routed into the
///   existing voice's slot, no new voice is allocated.
/// - `NoteOff` routes to the key's slot; with `persist_internal` false the
///   key is unbound so the voice can finish its own release and a later
///   note-on starts a fresh voice. A `NoteOff` for an inactive key is a
///   malformed event: it is logged and skipped, never silently absorbed
///   into a voice.
///
/// Every tick clears all slots, applies the tick's events, steps every
/// voice, sums the results, and drops voices whose own step reported
/// termination (releasing their key binding). With `persist` false the
/// instrument terminates once no voices remain after stepping; with
/// `persist` true it outlives silence. Termination of the event stream
/// always terminates the instrument.
pub fn poly<F>(
    factory: F,
    persist_internal: bool,
    persist: bool,
) -> impl Fn(&Stream<Events>) -> Stream<f64>
where
    F: Fn(Stream<Events>) -> Stream<f64> + Clone + Send + Sync + 'static,
{
    move |events: &Stream<Events>| {
        let events = events.clone();
        let factory = factory.clone();
        Stream::from_fn(move || {
            Box::new(PolyCursor {
                events: events.activate(),
                factory: factory.clone(),
                slots: HashMap::new(),
                voices: Vec::new(),
                persist_internal,
                persist,
            })
        })
    }
}

struct PolyCursor<F> {
    events: BoxTraversal<Events>,
    factory: F,
    /// Sounding keys and the mailbox of the voice bound to each.
    slots: HashMap<u8, EventSlot>,
    voices: Vec<(u8, BoxTraversal<f64>)>,
    persist_internal: bool,
    persist: bool,
}

impl<F> Traversal for PolyCursor<F>
where
    F: Fn(Stream<Events>) -> Stream<f64> + Send,
{
    type Item = f64;
    type Return = ();

    fn step(&mut self) -> Step<f64, ()> {
        let events = match self.events.step() {
            Step::Value(events) => events,
            Step::Done(()) => return Step::Done(()),
        };
        for slot in self.slots.values() {
            slot.clear();
        }
        let mut acc = 0.0;
        let mut spawned: Vec<(u8, BoxTraversal<f64>)> = Vec::new();
        for event in events {
            match event {
                Event::NoteOn { note, velocity } if velocity > 0 => {
                    if let Some(slot) = self.slots.get(&note) {
                        // Retrigger the sounding voice instead of stacking a
                        // duplicate on the same key.
                        slot.put(event);
                    } else {
                        let slot = EventSlot::new();
                        slot.put(event);
                        let voice = (self.factory)(slot_stream(&slot));
                        self.slots.insert(note, slot);
                        let mut traversal = voice.activate();
                        match traversal.step() {
                            Step::Value(sample) => {
                                acc += sample;
                                spawned.push((note, traversal));
                            }
                            Step::Done(()) => {
                                self.slots.remove(&note);
                            }
                        }
                    }
                }
                Event::NoteOn { note, .. } | Event::NoteOff { note } => {
                    match self.slots.get(&note) {
                        Some(slot) => {
                            slot.put(event);
                            if !self.persist_internal {
                                self.slots.remove(&note);
                            }
                        }
                        None => {
                            tracing::warn!(note, "note_off for a key with no active voice");
                        }
                    }
                }
            }
        }
        for (note, mut traversal) in mem::take(&mut self.voices) {
            match traversal.step() {
                Step::Value(sample) => {
                    acc += sample;
                    self.voices.push((note, traversal));
                }
                Step::Done(()) => {
                    // The voice ended on its own; release its key binding.
                    self.slots.remove(&note);
                }
            }
        }
        self.voices.extend(spawned);
        if !self.persist && self.voices.is_empty() {
            return Step::Done(());
        }
        Step::Value(acc)
    }
}

/// The stock polyphonic instrument: [`poly`] over [`mono_instrument`]
/// voices that release themselves.
pub fn poly_instrument(events: &Stream<Events>, sample_rate: u32) -> Stream<f64> {
    poly(
        move |voice_events| mono_instrument(&voice_events, sample_rate, false),
        false,
        true,
    )(events)
}

/// Convert a `(midi_pitch, duration_in_beats)` melody into an event stream
/// at `bpm` (quarter notes have the beat): a `NoteOn` at each note's start,
/// a `NoteOff` on its final tick. The stream ends with the last release.
pub fn seq_to_events(notes: &[(u8, f64)], bpm: f64, sample_rate: u32) -> Stream<Events> {
    let mut by_tick: std::collections::BTreeMap<usize, Events> = Default::default();
    let mut time = 0.0;
    for &(pitch, duration) in notes {
        let start = time as usize;
        time += duration * 60.0 / bpm * sample_rate as f64;
        let end = (time as usize).saturating_sub(1).max(start);
        by_tick.entry(start).or_default().push(Event::NoteOn {
            note: pitch,
            velocity: 100,
        });
        by_tick
            .entry(end)
            .or_default()
            .push(Event::NoteOff { note: pitch });
    }
    crate::audio::events_in_time(by_tick.into_iter().collect(), Vec::new())
}
