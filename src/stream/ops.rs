//! Operator overloads: the signal algebra.
//!
//! - `a >> b`: sequential composition (splicing tape); all of `a`, then all
//!   of `b`. Builds a flattened [`concat`].
//! - `a + b`, `a - b`: parallel composition (mixing tape down); elementwise
//!   sum that continues until *all* sides are exhausted, an absent side
//!   contributing zero. Builds a flattened [`mix`].
//! - `a * b`, `a / b`, `a % b`: elementwise modulation over
//!   [`Stream::zip`], so they stop with the shorter side.
//! - `stream ⊕ scalar` and `scalar ⊕ stream`: broadcast; the stream side's
//!   terminal payload is preserved.
//!
//! Whether an operand is a stream or a plain sample is resolved statically
//! by the trait system; there is no runtime stream-likeness inspection.

use super::composite::{concat, mix, MixSource};
use super::core::Stream;
use crate::audio::Frame;
use crate::traits::Sample;
use std::ops::{Add, Div, Mul, Neg, Rem, Shr, Sub};

/// The mix operands contributed by a stream: a mix node donates its
/// (already flattened) children, anything else joins as a single child with
/// its payload erased.
fn mix_parts<T, R>(stream: &Stream<T, R>) -> Vec<Stream<T, ()>>
where
    T: Sample,
    R: Send + 'static,
{
    match stream.source_any().downcast_ref::<MixSource<T>>() {
        Some(nested) => nested.parts.clone(),
        None => vec![stream.strip_return()],
    }
}

impl<T, R> Shr for Stream<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    type Output = Stream<T, R>;

    /// `a >> b`: `a` followed by `b`.
    fn shr(self, rhs: Stream<T, R>) -> Stream<T, R> {
        concat(vec![self, rhs])
    }
}

impl<T, Ra, Rb> Add<Stream<T, Rb>> for Stream<T, Ra>
where
    T: Sample,
    Ra: Send + 'static,
    Rb: Send + 'static,
{
    type Output = Stream<T, ()>;

    /// `a + b`: `a` and `b` at the same time.
    fn add(self, rhs: Stream<T, Rb>) -> Stream<T, ()> {
        let mut parts = mix_parts(&self);
        parts.extend(mix_parts(&rhs));
        mix(parts)
    }
}

impl<T, Ra, Rb> Sub<Stream<T, Rb>> for Stream<T, Ra>
where
    T: Sample,
    Ra: Send + 'static,
    Rb: Send + 'static,
{
    type Output = Stream<T, ()>;

    /// `a - b` is `a + (-b)`, with mix (not zip) termination semantics.
    fn sub(self, rhs: Stream<T, Rb>) -> Stream<T, ()> {
        self + (-rhs)
    }
}

impl<T, Ra, Rb> Mul<Stream<T, Rb>> for Stream<T, Ra>
where
    T: Sample,
    Ra: Send + 'static,
    Rb: Send + 'static,
{
    type Output = Stream<T, ()>;

    /// Elementwise product, i.e. amplitude modulation. Stops with the shorter
    /// side.
    fn mul(self, rhs: Stream<T, Rb>) -> Stream<T, ()> {
        self.zip_with(&rhs, |a, b| a * b)
    }
}

impl<T, Ra, Rb> Div<Stream<T, Rb>> for Stream<T, Ra>
where
    T: Sample,
    Ra: Send + 'static,
    Rb: Send + 'static,
{
    type Output = Stream<T, ()>;

    fn div(self, rhs: Stream<T, Rb>) -> Stream<T, ()> {
        self.zip_with(&rhs, |a, b| a / b)
    }
}

impl<T, Ra, Rb> Rem<Stream<T, Rb>> for Stream<T, Ra>
where
    T: Sample,
    Ra: Send + 'static,
    Rb: Send + 'static,
{
    type Output = Stream<T, ()>;

    fn rem(self, rhs: Stream<T, Rb>) -> Stream<T, ()> {
        self.zip_with(&rhs, |a, b| a % b)
    }
}

impl<T, R> Add<T> for Stream<T, R>
where
    T: Sample,
    R: Send + 'static,
{
    type Output = Stream<T, R>;

    fn add(self, rhs: T) -> Stream<T, R> {
        self.map(move |v| v + rhs)
    }
}

impl<T, R> Sub<T> for Stream<T, R>
where
    T: Sample,
    R: Send + 'static,
{
    type Output = Stream<T, R>;

    fn sub(self, rhs: T) -> Stream<T, R> {
        self.map(move |v| v - rhs)
    }
}

impl<T, R> Mul<T> for Stream<T, R>
where
    T: Sample,
    R: Send + 'static,
{
    type Output = Stream<T, R>;

    fn mul(self, rhs: T) -> Stream<T, R> {
        self.map(move |v| v * rhs)
    }
}

impl<T, R> Div<T> for Stream<T, R>
where
    T: Sample,
    R: Send + 'static,
{
    type Output = Stream<T, R>;

    fn div(self, rhs: T) -> Stream<T, R> {
        self.map(move |v| v / rhs)
    }
}

impl<T, R> Rem<T> for Stream<T, R>
where
    T: Sample,
    R: Send + 'static,
{
    type Output = Stream<T, R>;

    fn rem(self, rhs: T) -> Stream<T, R> {
        self.map(move |v| v % rhs)
    }
}

impl<T, R> Neg for Stream<T, R>
where
    T: Sample,
    R: Send + 'static,
{
    type Output = Stream<T, R>;

    fn neg(self) -> Stream<T, R> {
        self.map(|v| -v)
    }
}

impl<R> Add<Stream<f64, R>> for f64
where
    R: Send + 'static,
{
    type Output = Stream<f64, R>;

    fn add(self, rhs: Stream<f64, R>) -> Stream<f64, R> {
        rhs.map(move |v| self + v)
    }
}

impl<R> Sub<Stream<f64, R>> for f64
where
    R: Send + 'static,
{
    type Output = Stream<f64, R>;

    fn sub(self, rhs: Stream<f64, R>) -> Stream<f64, R> {
        rhs.map(move |v| self - v)
    }
}

impl<R> Mul<Stream<f64, R>> for f64
where
    R: Send + 'static,
{
    type Output = Stream<f64, R>;

    fn mul(self, rhs: Stream<f64, R>) -> Stream<f64, R> {
        rhs.map(move |v| self * v)
    }
}

impl<R> Div<Stream<f64, R>> for f64
where
    R: Send + 'static,
{
    type Output = Stream<f64, R>;

    fn div(self, rhs: Stream<f64, R>) -> Stream<f64, R> {
        rhs.map(move |v| self / v)
    }
}

impl<const N: usize, R> Mul<Stream<Frame<N>, R>> for f64
where
    R: Send + 'static,
{
    type Output = Stream<Frame<N>, R>;

    /// Broadcast gain over a multi-channel stream.
    fn mul(self, rhs: Stream<Frame<N>, R>) -> Stream<Frame<N>, R> {
        rhs.map(move |v| v * self)
    }
}

impl<T, R> Stream<T, R>
where
    T: Sample,
    R: Send + 'static,
{
    /// Elementwise absolute value.
    pub fn abs(&self) -> Stream<T, R> {
        self.map(|v| v.abs())
    }

    /// Broadcast an `f64` gain factor over every value (channel-wise for
    /// frames).
    pub fn scale(&self, factor: f64) -> Stream<T, R> {
        self.map(move |v| v.scale(factor))
    }
}

impl<R> Stream<f64, R>
where
    R: Send + 'static,
{
    /// Raise every value to the power `exp` (there is no `**` operator to
    /// overload).
    pub fn powf(&self, exp: f64) -> Stream<f64, R> {
        self.map(move |v| v.powf(exp))
    }

    /// Floored division by a constant (there is no `//` operator to
    /// overload).
    pub fn floor_div(&self, divisor: f64) -> Stream<f64, R> {
        self.map(move |v| (v / divisor).floor())
    }
}
