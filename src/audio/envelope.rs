//! Piecewise-linear envelopes and breakpoint interpolation.
//!
//! Envelopes are just finite streams, so they compose with the same
//! operators as everything else: `osc(440.0, sr) * adsr(...)` shapes a tone,
//! and `>>` splices segments. All lengths are in samples; callers convert
//! from seconds with
//! [`seconds_to_samples`](crate::audio::seconds_to_samples).

use crate::stream::{constant, BoxTraversal, Step, Stream, Traversal};

/// A linear ramp from `start` to `end` over `len` samples (exclusive of
/// `end`; a following segment normally starts there).
pub fn ramp(start: f64, end: f64, len: usize) -> Stream<f64> {
    Stream::unfold(0usize, move |position| {
        if *position >= len {
            return Step::Done(());
        }
        let t = *position as f64 / len as f64;
        *position += 1;
        Step::Value(start + (end - start) * t)
    })
}

/// A flat segment: `value` repeated for `len` samples.
pub fn level(value: f64, len: usize) -> Stream<f64> {
    Stream::unfold(0usize, move |position| {
        if *position >= len {
            return Step::Done(());
        }
        *position += 1;
        Step::Value(value)
    })
}

/// [`ramp`], then hold `end` forever. Useful as a one-shot control signal.
pub fn ramp_hold(start: f64, end: f64, len: usize) -> Stream<f64> {
    ramp(start, end, len) >> constant(end)
}

/// Attack/decay/sustain/release envelope as concatenated linear segments:
/// 0→1 over `attack`, 1→`sustain_level` over `decay`, flat for
/// `sustain_len`, then `sustain_level`→0 over `release`.
///
/// Total length is exactly `attack + decay + sustain_len + release` samples.
pub fn adsr(
    attack: usize,
    decay: usize,
    sustain_len: usize,
    sustain_level: f64,
    release: usize,
) -> Stream<f64> {
    ramp(0.0, 1.0, attack)
        >> ramp(1.0, sustain_level, decay)
        >> level(sustain_level, sustain_len)
        >> ramp(sustain_level, 0.0, release)
}

/// A simple fade-in/sustain/fade-out envelope over `len` samples, with 10%
/// of the length spent on each ramp.
pub fn basic_envelope(len: usize) -> Stream<f64> {
    let ramp_len = len / 10;
    let sustain = len - ramp_len * 2;
    ramp(0.0, 1.0, ramp_len) >> level(1.0, sustain) >> ramp(1.0, 0.0, ramp_len)
}

/// Linearly interpolate a stream of `(seconds, value)` breakpoints into a
/// per-sample control signal.
///
/// Breakpoint times are absolute, measured from the start of the output;
/// the signal starts at value 0 at time 0 and terminates once the
/// breakpoints run out, propagating the breakpoint stream's payload.
pub fn interp<R>(
    breakpoints: &Stream<(f64, f64), R>,
    sample_rate: u32,
) -> Stream<f64, R>
where
    R: Send + 'static,
{
    let breakpoints = breakpoints.clone();
    Stream::from_fn(move || {
        Box::new(InterpCursor {
            breakpoints: breakpoints.activate(),
            sample_rate,
            time: 0,
            prev: (0, 0.0),
            next: (0, 0.0),
        })
    })
}

/// Portamento: for each frequency from `freqs`, glide linearly from the
/// previous target over `transition` samples, then hold for `hold` samples.
pub fn glide<R>(
    freqs: &Stream<f64, R>,
    hold: usize,
    transition: usize,
    start_freq: f64,
) -> Stream<f64>
where
    R: Send + 'static,
{
    let freqs = freqs.clone();
    Stream::from_fn(move || {
        Box::new(GlideCursor {
            freqs: freqs.activate(),
            hold,
            transition,
            current: start_freq,
            segment: None,
        })
    })
}

// ---------------------------------------------------------------------------
// Cursors
// ---------------------------------------------------------------------------

struct InterpCursor<R> {
    breakpoints: BoxTraversal<(f64, f64), R>,
    sample_rate: u32,
    /// Current output position, in samples.
    time: usize,
    /// Last passed breakpoint, as (sample index, value).
    prev: (usize, f64),
    /// Upcoming breakpoint.
    next: (usize, f64),
}

impl<R> Traversal for InterpCursor<R>
where
    R: Send,
{
    type Item = f64;
    type Return = R;

    fn step(&mut self) -> Step<f64, R> {
        self.time += 1;
        while self.time >= self.next.0 {
            match self.breakpoints.step() {
                Step::Value((seconds, value)) => {
                    self.prev = self.next;
                    self.next = (
                        crate::audio::seconds_to_samples(seconds, self.sample_rate),
                        value,
                    );
                }
                Step::Done(payload) => return Step::Done(payload),
            }
        }
        let span = self.next.0 - self.prev.0;
        let progress = if span == 0 {
            0.0
        } else {
            (self.time - self.prev.0) as f64 / span as f64
        };
        Step::Value(self.prev.1 + (self.next.1 - self.prev.1) * progress)
    }
}

struct GlideCursor<R> {
    freqs: BoxTraversal<f64, R>,
    hold: usize,
    transition: usize,
    /// The most recent glide target; the next transition starts here.
    current: f64,
    segment: Option<BoxTraversal<f64, ()>>,
}

impl<R> Traversal for GlideCursor<R>
where
    R: Send + 'static,
{
    type Item = f64;
    type Return = ();

    fn step(&mut self) -> Step<f64, ()> {
        loop {
            if let Some(segment) = &mut self.segment {
                match segment.step() {
                    Step::Value(v) => return Step::Value(v),
                    Step::Done(()) => self.segment = None,
                }
            }
            match self.freqs.step() {
                Step::Value(target) => {
                    let slide =
                        ramp(self.current, target, self.transition) >> level(target, self.hold);
                    self.current = target;
                    self.segment = Some(slide.activate());
                }
                Step::Done(_) => return Step::Done(()),
            }
        }
    }
}
