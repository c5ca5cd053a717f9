//! Sample-rate-aware helpers and the audio-domain layer built on streams.
//!
//! Everything here treats a stream of `f64` (or [`Frame`]) values as a
//! signal at some sample rate. There is no global sample-rate state: helpers
//! that convert wall-clock time take an explicit `sample_rate` argument, and
//! a graph built against one rate is simply played at that rate.
//!
//! # Modules
//!
//! - [`frame`] - Multi-channel sample frames
//! - [`osc`] - Oscillators and noise sources
//! - [`envelope`] - Piecewise-linear envelopes and interpolation
//! - [`resample`] - Stream-controlled vari-speed resampling
//! - [`mixer`] - Dynamic mixing and timeline arrangement

pub mod envelope;
pub mod frame;
pub mod mixer;
pub mod osc;
pub mod resample;

pub use envelope::{adsr, basic_envelope, glide, interp, level, ramp, ramp_hold};
pub use frame::{stereo, Frame};
pub use mixer::{arrange, basic_sequencer, events_in_time, Mixer, MixerHandle};
pub use osc::{
    aa_saw, aa_sqr, aa_tri, additive, branch, bytebeat, flip, floatbeat, kilobeat, osc, osc_phase,
    pulse, random, saw, sqr, tbl, tri,
};
pub use resample::{fit, resample, resample_loop};

use crate::error::StreamResult;
use crate::stream::{constant, from_vec, Stream};
use crate::traits::Sample;

/// Default sample rate, in Hz. A convenience for tests and examples; every
/// time-aware helper takes the rate explicitly.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Convert fractional seconds to a whole sample count at `sample_rate`
/// (truncating).
pub fn seconds_to_samples(seconds: f64, sample_rate: u32) -> usize {
    let samples = seconds * sample_rate as f64;
    if samples <= 0.0 { 0 } else { samples as usize }
}

/// Convert decibels to a linear amplitude gain.
pub fn db(decibels: f64) -> f64 {
    10.0_f64.powf(decibels / 20.0)
}

/// Convert a MIDI note number (possibly fractional) to a frequency in Hz,
/// with A4 = 69 = 440 Hz.
pub fn midi_to_freq(note: f64) -> f64 {
    2.0_f64.powf((note - 69.0) / 12.0) * 440.0
}

/// The zero signal.
pub fn silence() -> Stream<f64> {
    constant(0.0)
}

/// The unit signal, handy as a modulation baseline.
pub fn ones() -> Stream<f64> {
    constant(1.0)
}

/// Equal-linear stereo panning. `position` runs from 0.0 (hard left) to 1.0
/// (hard right) and may itself be a stream for moving pans; the output stops
/// with the shorter of signal and position.
pub fn pan<R>(stream: &Stream<f64, R>, position: impl Into<Stream<f64>>) -> Stream<Frame<2>>
where
    R: Send + 'static,
{
    let position = position.into();
    stream.zip_with(&position, |x, p| stereo(x * (1.0 - p), x * p))
}

/// Scale a finite stream so its peak magnitude is 1.0. Evaluates the whole
/// stream eagerly; an all-zero stream is returned unchanged.
pub fn normalize<T, R>(stream: &Stream<T, R>) -> Stream<T, ()>
where
    T: Sample,
    R: Send + 'static,
{
    let values = stream.to_vec();
    let peak = values.iter().fold(0.0_f64, |acc, v| acc.max(v.peak()));
    if peak == 0.0 {
        return from_vec(values);
    }
    from_vec(values.into_iter().map(|v| v.scale(1.0 / peak)).collect())
}

/// Seconds-based slicing for signal streams.
///
/// The core slice combinators count in samples; this wrapper is the
/// audio-domain reading where positions are fractional seconds at an
/// explicit sample rate.
pub trait AudioSliceExt<T, R> {
    /// The first `seconds` of signal; terminal payload is the remainder.
    fn take_seconds(&self, seconds: f64, sample_rate: u32) -> Stream<T, Stream<T, R>>;

    /// The window from `start` to `stop` seconds.
    fn slice_seconds(
        &self,
        start: f64,
        stop: f64,
        sample_rate: u32,
    ) -> StreamResult<Stream<T, Stream<T, R>>>;

    /// Everything after the first `seconds` of signal.
    fn skip_seconds(&self, seconds: f64, sample_rate: u32) -> Stream<T, Stream<T, R>>;

    /// Repeat each value for `seconds` worth of samples.
    fn hold_seconds(&self, seconds: f64, sample_rate: u32) -> Stream<T, R>;
}

impl<T, R> AudioSliceExt<T, R> for Stream<T, R>
where
    T: Clone + Send + 'static,
    R: Default + Send + 'static,
{
    fn take_seconds(&self, seconds: f64, sample_rate: u32) -> Stream<T, Stream<T, R>> {
        self.take(seconds_to_samples(seconds, sample_rate))
    }

    fn slice_seconds(
        &self,
        start: f64,
        stop: f64,
        sample_rate: u32,
    ) -> StreamResult<Stream<T, Stream<T, R>>> {
        let start = seconds_to_samples(start, sample_rate);
        let stop = seconds_to_samples(stop, sample_rate);
        self.slice(start..stop)
    }

    fn skip_seconds(&self, seconds: f64, sample_rate: u32) -> Stream<T, Stream<T, R>> {
        self.skip(seconds_to_samples(seconds, sample_rate))
    }

    fn hold_seconds(&self, seconds: f64, sample_rate: u32) -> Stream<T, R> {
        self.hold(seconds_to_samples(seconds, sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    #[test]
    fn seconds_to_samples_truncates() {
        assert_eq!(seconds_to_samples(1.0, 44100), 44100);
        assert_eq!(seconds_to_samples(0.5, 44100), 22050);
        assert_eq!(seconds_to_samples(0.0001, 8000), 0);
        assert_eq!(seconds_to_samples(-1.0, 8000), 0);
    }

    #[test]
    fn db_reference_points() {
        assert_approx_eq!(db(0.0), 1.0, 1e-12);
        assert_approx_eq!(db(-6.0), 0.501187, 1e-5);
        assert_approx_eq!(db(20.0), 10.0, 1e-12);
    }

    #[test]
    fn midi_reference_pitches() {
        assert_approx_eq!(midi_to_freq(69.0), 440.0, 1e-9);
        assert_approx_eq!(midi_to_freq(57.0), 220.0, 1e-9);
        assert_approx_eq!(midi_to_freq(60.0), 261.625565, 1e-5);
    }

    #[test]
    fn pan_hard_left_and_right() {
        let signal = ones();
        let left = pan(&signal, 0.0).take(2).to_vec();
        assert_eq!(left, vec![stereo(1.0, 0.0), stereo(1.0, 0.0)]);
        let right = pan(&signal, 1.0).take(1).to_vec();
        assert_eq!(right, vec![stereo(0.0, 1.0)]);
    }

    #[test]
    fn normalize_scales_to_unit_peak() {
        let s = from_vec(vec![0.25, -0.5, 0.125]);
        assert_eq!(normalize(&s).to_vec(), vec![0.5, -1.0, 0.25]);
        // All-silent input passes through.
        let quiet = from_vec(vec![0.0, 0.0]);
        assert_eq!(normalize(&quiet).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn seconds_slicing_counts_samples() {
        let s = crate::stream::count().map(|n| n as f64);
        let head = s.take_seconds(0.001, 8000);
        assert_eq!(head.to_vec(), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }
}
