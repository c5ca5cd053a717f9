//! Oscillators, noise, and waveform-function composition.
//!
//! All oscillators are phase accumulators driven by a frequency that may be
//! a constant or a stream (vibrato, glides, FM at control rate), and they
//! terminate when their frequency stream terminates. The basic shapes alias
//! above Nyquist; [`aa_saw`], [`aa_sqr`] and [`aa_tri`] are additive
//! versions that only generate harmonics up to half the sample rate.

use crate::stream::{count, repeat_with, BoxTraversal, Step, Stream, Traversal};
use std::f64::consts::{PI, TAU};
use std::sync::Arc;

/// Sine oscillator. The first value is `sin(0) = 0.0`; the phase advances
/// by `2π·f/sample_rate` after each emitted sample.
///
/// # Examples
///
/// ```
/// use audio_streams::audio::osc;
///
/// let tone = osc(440.0, 44100);
/// assert_eq!(tone.get(0).unwrap(), 0.0);
/// ```
pub fn osc(freq: impl Into<Stream<f64>>, sample_rate: u32) -> Stream<f64> {
    osc_phase(freq, sample_rate, 0.0)
}

/// [`osc`] with an explicit starting phase in radians.
pub fn osc_phase(freq: impl Into<Stream<f64>>, sample_rate: u32, phase: f64) -> Stream<f64> {
    let freq = freq.into();
    Stream::from_fn(move || {
        Box::new(OscCursor {
            freq: freq.activate(),
            phase,
            sample_rate: sample_rate as f64,
        })
    })
}

/// Sawtooth oscillator rising from -1 to 1 once per period. Aliased.
pub fn saw(freq: impl Into<Stream<f64>>, sample_rate: u32) -> Stream<f64> {
    shaped(freq.into(), sample_rate, WaveShape::Saw)
}

/// Square oscillator with 50% duty cycle. Aliased.
pub fn sqr(freq: impl Into<Stream<f64>>, sample_rate: u32) -> Stream<f64> {
    pulse(freq, 0.5, sample_rate)
}

/// Pulse oscillator: +1 while the phase is below `duty`, -1 after. Aliased.
pub fn pulse(freq: impl Into<Stream<f64>>, duty: f64, sample_rate: u32) -> Stream<f64> {
    shaped(freq.into(), sample_rate, WaveShape::Pulse { duty })
}

/// Triangle oscillator. Aliased.
pub fn tri(freq: impl Into<Stream<f64>>, sample_rate: u32) -> Stream<f64> {
    shaped(freq.into(), sample_rate, WaveShape::Triangle)
}

fn shaped(freq: Stream<f64>, sample_rate: u32, shape: WaveShape) -> Stream<f64> {
    Stream::from_fn(move || {
        Box::new(ShapeCursor {
            freq: freq.activate(),
            t: 0.0,
            sample_rate: sample_rate as f64,
            shape,
        })
    })
}

/// Wavetable oscillator with linear interpolation between adjacent table
/// entries (wrapping at the end).
///
/// # Panics
///
/// Panics if `table` is empty.
pub fn tbl(freq: impl Into<Stream<f64>>, table: Vec<f64>, sample_rate: u32) -> Stream<f64> {
    assert!(!table.is_empty(), "wavetable must not be empty");
    let freq = freq.into();
    let table: Arc<[f64]> = table.into();
    Stream::from_fn(move || {
        Box::new(TableCursor {
            freq: freq.activate(),
            table: Arc::clone(&table),
            phase: 0.0,
            sample_rate: sample_rate as f64,
        })
    })
}

/// Additive synthesis over `(amplitude, frequency)` partials.
pub fn additive(partials: Vec<(f64, f64)>, sample_rate: u32) -> Stream<f64> {
    let partials: Arc<[(f64, f64)]> = partials.into();
    let delta = TAU / sample_rate as f64;
    Stream::from_fn(move || {
        Box::new(AdditiveCursor {
            partials: Arc::clone(&partials),
            phase: 0.0,
            delta,
        })
    })
}

/// Band-limited square wave: odd harmonics up to Nyquist.
pub fn aa_sqr(freq: f64, sample_rate: u32) -> Stream<f64> {
    let top = harmonic_count(freq, sample_rate);
    let partials = (1..=top)
        .step_by(2)
        .map(|k| (4.0 / PI / k as f64, freq * k as f64))
        .collect();
    additive(partials, sample_rate)
}

/// Band-limited triangle wave: odd harmonics up to Nyquist with
/// alternating sign and quadratic rolloff.
pub fn aa_tri(freq: f64, sample_rate: u32) -> Stream<f64> {
    let top = harmonic_count(freq, sample_rate);
    let partials = (1..=top)
        .step_by(2)
        .map(|k| {
            let sign = if ((k - 1) / 2) % 2 == 0 { 1.0 } else { -1.0 };
            (sign * 8.0 / (PI * PI) / (k * k) as f64, freq * k as f64)
        })
        .collect();
    additive(partials, sample_rate)
}

/// Band-limited sawtooth wave: all harmonics up to Nyquist.
pub fn aa_saw(freq: f64, sample_rate: u32) -> Stream<f64> {
    let top = harmonic_count(freq, sample_rate);
    let partials = (1..=top)
        .map(|k| {
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            (sign * 2.0 / PI / k as f64, freq * k as f64)
        })
        .collect();
    additive(partials, sample_rate)
}

fn harmonic_count(freq: f64, sample_rate: u32) -> usize {
    if freq <= 0.0 {
        return 1;
    }
    ((sample_rate as f64 / 2.0 / freq) as usize).max(1)
}

/// Uniform random values in `[0, 1)`, one per sample.
///
/// Nondeterministic by design: every traversal yields a fresh sequence.
/// Memoize it for a repeatable random signal.
pub fn random() -> Stream<f64> {
    repeat_with(rand::random::<f64>)
}

/// Choose one of the weighted `choices` at activation time and play it;
/// falls through to `default` if the weights do not cover the draw.
/// Each traversal draws independently.
pub fn branch<T, R>(choices: Vec<(f64, Stream<T, R>)>, default: Stream<T, R>) -> Stream<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    Stream::from_fn(move || {
        let draw: f64 = rand::random();
        let mut acc = 0.0;
        for (weight, stream) in &choices {
            acc += weight;
            if acc >= draw {
                return stream.activate();
            }
        }
        default.activate()
    })
}

/// A fair coin flip between two streams, drawn at each activation.
pub fn flip<T, R>(heads: Stream<T, R>, tails: Stream<T, R>) -> Stream<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    branch(vec![(0.5, heads)], tails)
}

/// Compose a signal directly from a waveform function of the sample index.
pub fn floatbeat(f: impl Fn(u64) -> f64 + Send + Sync + 'static) -> Stream<f64> {
    count().map(f)
}

/// Classic bytebeat: `f` is evaluated at successive sample indices, wrapped
/// to a byte, and centered to `[-1, 1]`. When `native_rate` differs from
/// `sample_rate`, the result is resampled so the formula plays at its
/// intended speed.
pub fn bytebeat(
    f: impl Fn(u64) -> i64 + Send + Sync + 'static,
    native_rate: Option<u32>,
    sample_rate: u32,
) -> Stream<f64> {
    let base = count().map(move |t| (f(t).rem_euclid(255)) as f64 / 255.0 * 2.0 - 1.0);
    match native_rate {
        Some(native) if native != sample_rate => {
            let rate = native as f64 / sample_rate as f64;
            super::resample(&base, rate).strip_return()
        }
        _ => base,
    }
}

/// [`floatbeat`] over time in seconds instead of sample index.
pub fn kilobeat(f: impl Fn(f64) -> f64 + Send + Sync + 'static, sample_rate: u32) -> Stream<f64> {
    let sample_rate = sample_rate as f64;
    count().map(move |t| f(t as f64 / sample_rate))
}

// ---------------------------------------------------------------------------
// Cursors
// ---------------------------------------------------------------------------

struct OscCursor {
    freq: BoxTraversal<f64>,
    phase: f64,
    sample_rate: f64,
}

impl Traversal for OscCursor {
    type Item = f64;
    type Return = ();

    fn step(&mut self) -> Step<f64, ()> {
        match self.freq.step() {
            Step::Value(freq) => {
                let out = self.phase.sin();
                self.phase += TAU * freq / self.sample_rate;
                Step::Value(out)
            }
            Step::Done(()) => Step::Done(()),
        }
    }
}

#[derive(Clone, Copy)]
enum WaveShape {
    Saw,
    Pulse { duty: f64 },
    Triangle,
}

impl WaveShape {
    fn evaluate(self, t: f64) -> f64 {
        match self {
            WaveShape::Saw => t * 2.0 - 1.0,
            WaveShape::Pulse { duty } => {
                if t < duty {
                    1.0
                } else {
                    -1.0
                }
            }
            WaveShape::Triangle => (t - 0.5).abs() * 4.0 - 1.0,
        }
    }
}

struct ShapeCursor {
    freq: BoxTraversal<f64>,
    t: f64,
    sample_rate: f64,
    shape: WaveShape,
}

impl Traversal for ShapeCursor {
    type Item = f64;
    type Return = ();

    fn step(&mut self) -> Step<f64, ()> {
        match self.freq.step() {
            Step::Value(freq) => {
                let out = self.shape.evaluate(self.t);
                self.t = (self.t + freq / self.sample_rate).rem_euclid(1.0);
                Step::Value(out)
            }
            Step::Done(()) => Step::Done(()),
        }
    }
}

struct TableCursor {
    freq: BoxTraversal<f64>,
    table: Arc<[f64]>,
    phase: f64,
    sample_rate: f64,
}

impl Traversal for TableCursor {
    type Item = f64;
    type Return = ();

    fn step(&mut self) -> Step<f64, ()> {
        match self.freq.step() {
            Step::Value(freq) => {
                let len = self.table.len();
                let index = self.phase * len as f64;
                let prev = (index as usize).min(len - 1);
                let frac = index - prev as f64;
                let a = self.table[prev];
                let b = self.table[(prev + 1) % len];
                self.phase = (self.phase + freq / self.sample_rate).rem_euclid(1.0);
                Step::Value(a + (b - a) * frac)
            }
            Step::Done(()) => Step::Done(()),
        }
    }
}

struct AdditiveCursor {
    partials: Arc<[(f64, f64)]>,
    phase: f64,
    delta: f64,
}

impl Traversal for AdditiveCursor {
    type Item = f64;
    type Return = ();

    fn step(&mut self) -> Step<f64, ()> {
        let out = self
            .partials
            .iter()
            .map(|(amplitude, freq)| (self.phase * freq).sin() * amplitude)
            .sum();
        self.phase += self.delta;
        Step::Value(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    #[test]
    fn osc_starts_at_zero_phase() {
        let tone = osc(440.0, 44100);
        let head = tone.take(3).to_vec();
        assert_eq!(head[0], 0.0);
        let expected = (TAU * 440.0 / 44100.0).sin();
        assert_approx_eq!(head[1], expected, 1e-12);
    }

    #[test]
    fn one_second_of_oscillator_is_sample_rate_samples() {
        use crate::audio::AudioSliceExt;
        let second = osc(440.0, 44100).take_seconds(1.0, 44100);
        let rendered = second.to_vec();
        assert_eq!(rendered.len(), 44100);
        assert_eq!(rendered[0], 0.0);
    }

    #[test]
    fn saw_rises_from_minus_one() {
        let head = saw(4410.0, 44100).take(3).to_vec();
        assert_approx_eq!(head[0], -1.0, 1e-12);
        assert_approx_eq!(head[1], -0.8, 1e-12);
        assert_approx_eq!(head[2], -0.6, 1e-12);
    }

    #[test]
    fn square_flips_at_duty_point() {
        let cycle = sqr(11025.0, 44100).take(4).to_vec();
        assert_eq!(cycle, vec![1.0, 1.0, -1.0, -1.0]);
    }

    #[test]
    fn oscillator_follows_a_frequency_stream() {
        // A finite frequency stream bounds the oscillator.
        let freqs = crate::stream::from_vec(vec![440.0, 440.0, 440.0]);
        let tone = osc(freqs, 44100);
        assert_eq!(tone.to_vec().len(), 3);
    }

    #[test]
    fn wavetable_interpolates_linearly() {
        // Quarter-rate playback of a 4-entry ramp table.
        let head = tbl(11025.0, vec![0.0, 1.0, 2.0, 3.0], 44100).take(4).to_vec();
        assert_eq!(head, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn additive_single_partial_matches_sine() {
        let additive_tone = additive(vec![(1.0, 440.0)], 44100).take(16).to_vec();
        let sine_tone = osc(440.0, 44100).take(16).to_vec();
        for (a, b) in additive_tone.iter().zip(&sine_tone) {
            assert_approx_eq!(*a, *b, 1e-9);
        }
    }

    #[test]
    fn aa_saw_stays_under_nyquist() {
        // 12 kHz fundamental at 44.1 kHz leaves a single partial.
        let s = aa_saw(12000.0, 44100).take(8).to_vec();
        let reference = osc(12000.0, 44100).take(8).to_vec();
        for (a, b) in s.iter().zip(&reference) {
            assert_approx_eq!(*a, -2.0 / PI * b, 1e-9);
        }
    }

    #[test]
    fn random_is_in_unit_interval() {
        for v in random().take(64).to_vec() {
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn branch_certain_weight_always_wins() {
        let s = branch(
            vec![(1.1, crate::stream::from_vec(vec![1]))],
            crate::stream::from_vec(vec![2]),
        );
        for _ in 0..8 {
            assert_eq!(s.to_vec(), vec![1]);
        }
    }

    #[test]
    fn bytebeat_is_centered() {
        let s = bytebeat(|t| (t >> 3) as i64 * t as i64, None, 8000);
        for v in s.take(256).to_vec() {
            assert!((-1.0..=1.0).contains(&v));
        }
    }
}
