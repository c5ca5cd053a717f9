//! Stream-controlled vari-speed resampling.
//!
//! [`resample`] is the mechanism behind pitch-bend and tape-speed effects: a
//! second stream supplies the instantaneous playback rate, and the source is
//! read through a fractional position pointer with linear interpolation.

use crate::stream::{BoxTraversal, Step, Stream, Traversal};
use crate::traits::Sample;

/// Play `source` at a time-varying rate.
///
/// Each output step advances a fractional source position by the current
/// value of `rate` (1.0 = normal speed, 0.5 = half speed / octave down, 2.0
/// = double speed) and linearly interpolates between the two nearest source
/// samples.
///
/// The two inputs terminate independently: the payload is
/// `Some(source_payload)` when the source runs out, and `None` when the rate
/// stream ends first.
///
/// # Examples
///
/// ```
/// use audio_streams::audio::resample;
/// use audio_streams::from_vec;
///
/// let s = from_vec(vec![0.0, 1.0, 2.0, 3.0]);
/// // Unit rate reproduces the source.
/// assert_eq!(resample(&s, 1.0).to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
/// ```
pub fn resample<T, R>(
    source: &Stream<T, R>,
    rate: impl Into<Stream<f64>>,
) -> Stream<T, Option<R>>
where
    T: Sample,
    R: Send + 'static,
{
    let source = source.clone();
    let rate = rate.into();
    Stream::from_fn(move || {
        Box::new(ResampleCursor {
            source: source.activate(),
            rate: rate.activate(),
            position: 0.0,
            current: T::zero(),
            next: None,
        })
    })
}

/// Loop a fixed table at a constant rate with linear interpolation,
/// wrapping at both ends. Infinite.
///
/// # Panics
///
/// Panics if `table` is empty.
pub fn resample_loop<T>(table: Vec<T>, rate: f64, start_index: f64) -> Stream<T>
where
    T: Sample,
{
    assert!(!table.is_empty(), "resample_loop table must not be empty");
    let len = table.len() as f64;
    let table = std::sync::Arc::<[T]>::from(table);
    let start = start_index.rem_euclid(len);
    Stream::unfold(start, move |index| {
        let whole = *index as usize;
        let fraction = *index - whole as f64;
        let a = table[whole];
        let b = table[(whole + 1) % table.len()];
        *index = (*index + rate).rem_euclid(len);
        Step::Value(a.lerp(b, fraction))
    })
}

/// Pad (with silence) or truncate a stream to exactly `len` samples.
pub fn fit<T, R>(stream: &Stream<T, R>, len: usize) -> Stream<T, ()>
where
    T: Sample,
    R: Send + 'static,
{
    (stream.strip_return() >> crate::stream::constant(T::zero()))
        .take(len)
        .strip_return()
}

struct ResampleCursor<T, R> {
    source: BoxTraversal<T, R>,
    rate: BoxTraversal<f64>,
    /// Fractional read position between `current` and `next`.
    position: f64,
    current: T,
    /// The sample ahead of `current`; `None` until the source is first read.
    next: Option<T>,
}

impl<T, R> Traversal for ResampleCursor<T, R>
where
    T: Sample,
    R: Send,
{
    type Item = T;
    type Return = Option<R>;

    fn step(&mut self) -> Step<T, Option<R>> {
        let next = match self.next {
            Some(next) => next,
            None => match self.source.step() {
                Step::Value(v) => {
                    self.next = Some(v);
                    v
                }
                Step::Done(payload) => return Step::Done(Some(payload)),
            },
        };
        let mut next = next;
        match self.rate.step() {
            Step::Value(advance) => {
                self.position += advance;
                while self.position > 1.0 {
                    self.current = next;
                    match self.source.step() {
                        Step::Value(v) => {
                            self.next = Some(v);
                            next = v;
                        }
                        Step::Done(payload) => return Step::Done(Some(payload)),
                    }
                    self.position -= 1.0;
                }
                Step::Value(self.current.lerp(next, self.position))
            }
            Step::Done(()) => Step::Done(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{constant, from_vec};
    use approx_eq::assert_approx_eq;

    #[test]
    fn unit_rate_is_identity() {
        let s = from_vec(vec![0.5, -0.25, 0.75, 1.0]);
        let out = resample(&s, 1.0).to_vec();
        assert_eq!(out, vec![0.5, -0.25, 0.75, 1.0]);
    }

    #[test]
    fn half_rate_interpolates_midpoints() {
        let s = from_vec(vec![0.0, 1.0, 2.0, 3.0]);
        let out = resample(&s, 0.5).to_vec();
        // The read position lags the source by one sample's worth of
        // fractional advance before the first crossing.
        assert_eq!(out, vec![0.0, 0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
    }

    #[test]
    fn double_rate_skips_samples() {
        let s = from_vec(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let out = resample(&s, 2.0).to_vec();
        assert_eq!(out, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn source_termination_reports_payload() {
        let s = from_vec(vec![1.0, 2.0]);
        let (_, payload) = resample(&s, 1.0).collect_all();
        assert_eq!(payload, Some(()));
    }

    #[test]
    fn rate_termination_reports_none() {
        let infinite: Stream<f64> = constant(0.25);
        let rate = from_vec(vec![1.0, 1.0, 1.0]);
        let (values, payload) = resample(&infinite, rate).collect_all();
        assert_eq!(values.len(), 3);
        assert_eq!(payload, None);
    }

    #[test]
    fn looped_table_wraps_with_interpolation() {
        let out = resample_loop(vec![0.0, 2.0], 0.5, 0.0).take(5).to_vec();
        assert_eq!(out, vec![0.0, 1.0, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn fit_pads_and_truncates() {
        let short = from_vec(vec![1.0, 2.0]);
        assert_eq!(fit(&short, 4).to_vec(), vec![1.0, 2.0, 0.0, 0.0]);
        let long = from_vec(vec![1.0, 2.0, 3.0]);
        assert_eq!(fit(&long, 2).to_vec(), vec![1.0, 2.0]);
    }

    #[test]
    fn resampled_ramp_stays_linear() {
        let s = from_vec((0..20).map(f64::from).collect());
        let out = resample(&s, 0.75).to_vec();
        assert_eq!(out[0], 0.0);
        for (i, v) in out.iter().enumerate().skip(1) {
            assert_approx_eq!(*v, 0.75 * i as f64 - 0.25, 1e-9);
        }
    }
}
