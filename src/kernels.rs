// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The iteration kernels.
//!
//! Every kernel has the same shape: take a starting value `z0`, a
//! parameter `c`, and an iteration budget, apply one recurrence until
//! the orbit escapes (or converges, for Magnet and Newton), and report
//! how many steps that took.  Which of `z0` and `c` comes from the
//! pixel is a property of the fractal, not of the kernel: a
//! Mandelbrot-style image feeds the pixel in as `c`, a Julia-style
//! image feeds it in as `z0`.
//!
//! The caller only learns *how many* iterations ran, never *why* they
//! stopped.  An orbit that produces NaN or an infinite value, or that
//! would divide by zero, simply stops where it is.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use num::Complex;

use error::{Error, Result};
use planes::Window;

/// Squared escape radius of the quadratic family.
pub const BAILOUT: f64 = 4.0;

/// Squared escape radius of the Magnet kernels.
pub const MAGNET_BAILOUT: f64 = 100.0;

/// Squared distance from 1 at which a Magnet orbit counts as converged.
pub const MAGNET_CONVERGENCE: f64 = 0.001;

/// Smallest squared divisor the Magnet kernels accept.  This is
/// `1.0 - 100`, i.e. -99, not `1.0e-100`: a squared magnitude is never
/// below it, so the guard never fires and published Magnet images keep
/// their look.  The zero-divisor check in `magnet` catches the cases
/// the guard would have.
pub const MAGNET_MIN_DIVISOR: f64 = 1.0 - 100.0;

/// Squared distance from a root at which a Newton orbit has converged.
pub const NEWTON_EPSILON: f64 = 0.1;

/// Squared escape radius of the Mandelbox.
pub const MANDELBOX_BAILOUT: f64 = 256.0;

/// Squared escape radius of the `c·sin z` family, 64².
pub const SINE_BAILOUT: f64 = 4096.0;

/// Where an orbit stopped.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Escape {
    /// Number of times the recurrence was applied.  For the closed
    /// form patterns this is the colour index itself.
    pub iterations: u32,
    /// `|z|²` of the value the orbit stopped at.
    pub norm_sqr: f64,
}

impl Escape {
    fn at(iterations: u32, z: Complex<f64>) -> Escape {
        Escape {
            iterations,
            norm_sqr: z.norm_sqr(),
        }
    }

    /// True when the orbit stopped before its budget ran out.
    pub fn escaped(&self, max_iterations: u32) -> bool {
        self.iterations < max_iterations
    }
}

/// The contract every kernel satisfies: `(z0, c, max_iterations)`.
pub type KernelFn = fn(Complex<f64>, Complex<f64>, u32) -> Escape;

#[inline]
fn diverged(norm_sqr: f64, bailout: f64) -> bool {
    norm_sqr > bailout || norm_sqr.is_nan()
}

#[inline]
fn degenerate(divisor: f64) -> bool {
    divisor == 0.0 || !divisor.is_finite()
}

/// Drives a recurrence that escapes past `bailout`.
#[inline]
fn orbit<F>(mut z: Complex<f64>, max_iterations: u32, bailout: f64, mut step: F) -> Escape
where
    F: FnMut(Complex<f64>) -> Complex<f64>,
{
    let mut i = 0;
    while i < max_iterations {
        if diverged(z.norm_sqr(), bailout) {
            break;
        }
        z = step(z);
        i += 1;
    }
    Escape::at(i, z)
}

/// z ← z² + c
pub fn quadratic(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    orbit(z0, max_iterations, BAILOUT, |z| z * z + c)
}

/// z ← z³ + c
pub fn cubic(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    orbit(z0, max_iterations, BAILOUT, |z| z * z * z + c)
}

/// z ← z⁴ + c, as two squarings.
pub fn quartic(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    orbit(z0, max_iterations, BAILOUT, |z| {
        let z2 = z * z;
        z2 * z2 + c
    })
}

/// z ← z² - z + c
pub fn quadratic_minus_z(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    orbit(z0, max_iterations, BAILOUT, |z| z * z - z + c)
}

/// Barnsley's first map: which way the orbit is pushed depends on the
/// side of the imaginary axis it is on.
pub fn barnsley1(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    orbit(z0, max_iterations, BAILOUT, |z| {
        if z.re >= 0.0 {
            z * c - c
        } else {
            z * c + c
        }
    })
}

/// Barnsley's second map: as the first, but split along a line that
/// turns with `c`.
pub fn barnsley2(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    orbit(z0, max_iterations, BAILOUT, |z| {
        if z.re * c.im + z.im * c.re >= 0.0 {
            z * c - c
        } else {
            z * c + c
        }
    })
}

/// Barnsley's third map: z² - 1, plus `c` scaled by the real part of
/// `z` on the left half plane.
pub fn barnsley3(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    orbit(z0, max_iterations, BAILOUT, |z| {
        let z2 = Complex::new(z.re * z.re - z.im * z.im - 1.0, 2.0 * z.re * z.im);
        if z.re > 0.0 {
            z2
        } else {
            z2 + c * z.re
        }
    })
}

/// Shared loop of the Magnet kernels: z ← (top / bottom)².
fn magnet<F>(mut z: Complex<f64>, max_iterations: u32, fraction: F) -> Escape
where
    F: Fn(Complex<f64>) -> (Complex<f64>, Complex<f64>),
{
    let one = Complex::new(1.0, 0.0);
    let mut i = 0;
    while i < max_iterations {
        if diverged(z.norm_sqr(), MAGNET_BAILOUT) {
            break;
        }
        if (z - one).norm_sqr() < MAGNET_CONVERGENCE {
            break;
        }
        let (top, bottom) = fraction(z);
        let divisor = bottom.norm_sqr();
        if divisor < MAGNET_MIN_DIVISOR || degenerate(divisor) {
            break;
        }
        let qx = (top.re * bottom.re + top.im * bottom.im) / divisor;
        let qy = (top.im * bottom.re - top.re * bottom.im) / divisor;
        z = Complex::new((qx + qy) * (qx - qy), 2.0 * qx * qy);
        i += 1;
    }
    Escape::at(i, z)
}

/// Magnet type I: z ← ((z² + c - 1) / (2z + c - 2))²
pub fn magnet1(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    let one = Complex::new(1.0, 0.0);
    let two = Complex::new(2.0, 0.0);
    magnet(z0, max_iterations, |z| (z * z - one + c, z * 2.0 + c - two))
}

/// Magnet type II: the cubic counterpart of type I.
pub fn magnet2(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    let one = Complex::new(1.0, 0.0);
    let c1 = c - one;
    let c2 = c - one * 2.0;
    let c12 = c1 * c2;
    magnet(z0, max_iterations, |z| {
        let z2 = z * z;
        (
            z2 * z + c1 * z * 3.0 + c12,
            z2 * 3.0 + c2 * z * 3.0 + c12 + one,
        )
    })
}

/// z ← z² + z_prev + c, with the previous value seeded from the start.
pub fn manowar(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    let mut prev = z0;
    orbit(z0, max_iterations, BAILOUT, |z| {
        let next = z * z + prev + c;
        prev = z;
        next
    })
}

/// Manowar, starting from the pixel itself.
pub fn manowar_m(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    manowar(z0 + c, c, max_iterations)
}

/// The Phoenix map: z ← z² + Re(c) + Im(c)·z_prev.
pub fn phoenix(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    let mut prev = Complex::new(0.0, 0.0);
    orbit(z0, max_iterations, BAILOUT, |z| {
        let next = z * z + c.re + prev * c.im;
        prev = z;
        next
    })
}

/// Phoenix, starting from the pixel itself.
pub fn phoenix_m(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    phoenix(z0 + c, c, max_iterations)
}

/// The complex logistic map: z ← c·z·(1 - z)
pub fn lambda(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    let one = Complex::new(1.0, 0.0);
    orbit(z0, max_iterations, BAILOUT, |z| c * z * (one - z))
}

/// The logistic map started from its critical point, 1/2.
pub fn lambda_m(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    lambda(z0 + Complex::new(0.5, 0.0), c, max_iterations)
}

/// Newton's method for z³ = root³, stopping when the orbit lands
/// near any of the three cube roots.
fn newton(mut z: Complex<f64>, root: Complex<f64>, max_iterations: u32) -> Escape {
    let omega = Complex::from_polar(&1.0, &(2.0 * PI / 3.0));
    let roots = [root, root * omega, root * omega * omega];
    let cube = root * root * root;
    let mut i = 0;
    while i < max_iterations {
        if roots.iter().any(|r| (z - *r).norm_sqr() < NEWTON_EPSILON) {
            break;
        }
        let z2 = z * z;
        // |z²|² = |z|⁴, the denominator of 1/z² = conj(z²)/|z|⁴
        let divisor = z2.norm_sqr();
        if degenerate(divisor) {
            break;
        }
        z = z * (2.0 / 3.0) + z2.conj() * cube / (3.0 * divisor);
        i += 1;
    }
    Escape::at(i, z)
}

/// Newton for the roots of unity, starting at the pixel.
pub fn newton_m(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    newton(c + z0, Complex::new(1.0, 0.0), max_iterations)
}

/// Newton for the roots of z³ = c³.
pub fn newton_j(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    newton(z0, c, max_iterations)
}

fn fm_pattern(p: Complex<f64>, a: f64, b: f64) -> Escape {
    let value = 100.0 + 100.0 * (p.re / 4.0 + 2.0 * (a * p.re / 15.0 + b * p.im / 40.0).sin()).sin();
    Escape {
        iterations: ((value as i64) & 0xff) as u32,
        norm_sqr: p.norm_sqr(),
    }
}

/// The FM-synthesis pattern with both modulators at 1.  Not a fractal:
/// it only borrows the pixel loop and the palette.
pub fn fm_synth_m(_z0: Complex<f64>, c: Complex<f64>, _max_iterations: u32) -> Escape {
    fm_pattern(c, 1.0, 1.0)
}

/// The FM-synthesis pattern, with `c` choosing the modulators.
pub fn fm_synth_j(z0: Complex<f64>, c: Complex<f64>, _max_iterations: u32) -> Escape {
    fm_pattern(z0, c.re, c.im)
}

/// Concentric rings about the origin: |c|² mod 256.
pub fn circle_m(_z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    circle(Complex::new(0.0, 0.0), c, max_iterations)
}

/// Concentric rings about `c`: |z0 - c|² mod 256.
pub fn circle(z0: Complex<f64>, c: Complex<f64>, _max_iterations: u32) -> Escape {
    let d = z0 - c;
    let norm_sqr = d.re * d.re + d.im * d.im;
    Escape {
        iterations: ((norm_sqr as i64) % 256) as u32,
        norm_sqr,
    }
}

/// z ← c·sin z
pub fn sine(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    orbit(z0, max_iterations, SINE_BAILOUT, |z| c * z.sin())
}

/// The sine map started from the pixel itself.
pub fn sine_m(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    sine(z0 + c, c, max_iterations)
}

#[inline]
fn box_fold(v: f64) -> f64 {
    if v > 1.0 {
        2.0 - v
    } else if v < -1.0 {
        -2.0 - v
    } else {
        v
    }
}

/// The two dimensional Mandelbox: fold into the unit box, fold
/// through the unit ball, scale by two, add `c`.
pub fn mandelbox(z0: Complex<f64>, c: Complex<f64>, max_iterations: u32) -> Escape {
    let mut z = z0;
    let mut i = 0;
    while i < max_iterations {
        z = Complex::new(box_fold(z.re), box_fold(z.im));
        let squared = z.norm_sqr();
        if diverged(squared, MANDELBOX_BAILOUT) {
            break;
        }
        let magnitude = squared.sqrt();
        let scale = if magnitude < 0.5 {
            8.0 * magnitude
        } else if magnitude < 1.0 {
            2.0 / squared
        } else {
            2.0 * magnitude
        };
        z = z * scale + c;
        i += 1;
    }
    Escape::at(i, z)
}

/// Which input the pixel supplies.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Style {
    /// The pixel is `c`; the seed is the starting value.
    Mandelbrot,
    /// The pixel is the starting value; the seed is `c`.
    Julia,
}

/// Every image the crate knows how to draw.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Fractal {
    Mandelbrot,
    Julia,
    Mandelbrot3,
    Julia3,
    Mandelbrot4,
    Julia4,
    MandelbrotZ2MinusZ,
    JuliaZ2MinusZ,
    BarnsleyM1,
    BarnsleyJ1,
    BarnsleyM2,
    BarnsleyJ2,
    BarnsleyM3,
    BarnsleyJ3,
    MagnetM1,
    MagnetJ1,
    MagnetM2,
    MagnetJ2,
    ManowarM,
    ManowarJ,
    PhoenixM,
    PhoenixJ,
    LambdaM,
    LambdaJ,
    NewtonM,
    NewtonJ,
    FmSynthM,
    FmSynthJ,
    CircleM,
    CircleJ,
    SinM,
    SinJ,
    Mandelbox,
}

const ALL: [Fractal; 33] = [
    Fractal::Mandelbrot,
    Fractal::Julia,
    Fractal::Mandelbrot3,
    Fractal::Julia3,
    Fractal::Mandelbrot4,
    Fractal::Julia4,
    Fractal::MandelbrotZ2MinusZ,
    Fractal::JuliaZ2MinusZ,
    Fractal::BarnsleyM1,
    Fractal::BarnsleyJ1,
    Fractal::BarnsleyM2,
    Fractal::BarnsleyJ2,
    Fractal::BarnsleyM3,
    Fractal::BarnsleyJ3,
    Fractal::MagnetM1,
    Fractal::MagnetJ1,
    Fractal::MagnetM2,
    Fractal::MagnetJ2,
    Fractal::ManowarM,
    Fractal::ManowarJ,
    Fractal::PhoenixM,
    Fractal::PhoenixJ,
    Fractal::LambdaM,
    Fractal::LambdaJ,
    Fractal::NewtonM,
    Fractal::NewtonJ,
    Fractal::FmSynthM,
    Fractal::FmSynthJ,
    Fractal::CircleM,
    Fractal::CircleJ,
    Fractal::SinM,
    Fractal::SinJ,
    Fractal::Mandelbox,
];

fn window(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Window {
    Window {
        xmin,
        ymin,
        xmax,
        ymax,
    }
}

impl Fractal {
    /// The whole catalogue, in a stable order.
    pub fn all() -> &'static [Fractal] {
        &ALL
    }

    /// The name used on the command line and in batch files.
    pub fn name(self) -> &'static str {
        match self {
            Fractal::Mandelbrot => "mandelbrot",
            Fractal::Julia => "julia",
            Fractal::Mandelbrot3 => "mandelbrot3",
            Fractal::Julia3 => "julia3",
            Fractal::Mandelbrot4 => "mandelbrot4",
            Fractal::Julia4 => "julia4",
            Fractal::MandelbrotZ2MinusZ => "mandelbrot_z2_minus_z",
            Fractal::JuliaZ2MinusZ => "julia_z2_minus_z",
            Fractal::BarnsleyM1 => "barnsley_m1",
            Fractal::BarnsleyJ1 => "barnsley_j1",
            Fractal::BarnsleyM2 => "barnsley_m2",
            Fractal::BarnsleyJ2 => "barnsley_j2",
            Fractal::BarnsleyM3 => "barnsley_m3",
            Fractal::BarnsleyJ3 => "barnsley_j3",
            Fractal::MagnetM1 => "magnet_m1",
            Fractal::MagnetJ1 => "magnet_j1",
            Fractal::MagnetM2 => "magnet_m2",
            Fractal::MagnetJ2 => "magnet_j2",
            Fractal::ManowarM => "manowar_m",
            Fractal::ManowarJ => "manowar_j",
            Fractal::PhoenixM => "phoenix_m",
            Fractal::PhoenixJ => "phoenix_j",
            Fractal::LambdaM => "lambda_m",
            Fractal::LambdaJ => "lambda_j",
            Fractal::NewtonM => "newton_m",
            Fractal::NewtonJ => "newton_j",
            Fractal::FmSynthM => "fm_synth_m",
            Fractal::FmSynthJ => "fm_synth_j",
            Fractal::CircleM => "circle_m",
            Fractal::CircleJ => "circle_j",
            Fractal::SinM => "sin_m",
            Fractal::SinJ => "sin_j",
            Fractal::Mandelbox => "mandelbox",
        }
    }

    /// Whether the pixel supplies `c` or the starting value.
    pub fn style(self) -> Style {
        match self {
            Fractal::Julia
            | Fractal::Julia3
            | Fractal::Julia4
            | Fractal::JuliaZ2MinusZ
            | Fractal::BarnsleyJ1
            | Fractal::BarnsleyJ2
            | Fractal::BarnsleyJ3
            | Fractal::MagnetJ1
            | Fractal::MagnetJ2
            | Fractal::ManowarJ
            | Fractal::PhoenixJ
            | Fractal::LambdaJ
            | Fractal::NewtonJ
            | Fractal::FmSynthJ
            | Fractal::CircleJ
            | Fractal::SinJ => Style::Julia,
            _ => Style::Mandelbrot,
        }
    }

    /// The part of the plane this fractal is usually drawn over.
    pub fn window(self) -> Window {
        match self {
            Fractal::Mandelbrot
            | Fractal::MandelbrotZ2MinusZ
            | Fractal::NewtonM
            | Fractal::NewtonJ => window(-2.0, -1.5, 1.0, 1.5),
            Fractal::JuliaZ2MinusZ => window(-1.5, -2.0, 2.5, 2.0),
            Fractal::Julia => window(-2.0, -2.0, 2.0, 2.0),
            Fractal::Mandelbrot3 | Fractal::Julia3 | Fractal::Mandelbrot4 | Fractal::Julia4 => {
                window(-1.5, -1.5, 1.5, 1.5)
            }
            Fractal::BarnsleyM1
            | Fractal::BarnsleyJ1
            | Fractal::BarnsleyM2
            | Fractal::BarnsleyJ2
            | Fractal::BarnsleyM3
            | Fractal::BarnsleyJ3
            | Fractal::MagnetM1
            | Fractal::MagnetJ1
            | Fractal::PhoenixM
            | Fractal::PhoenixJ => window(-2.0, -2.0, 2.0, 2.0),
            Fractal::MagnetM2 | Fractal::MagnetJ2 => window(-1.5, -2.0, 2.5, 2.0),
            Fractal::ManowarM | Fractal::ManowarJ => window(-1.5, -1.0, 0.5, 1.0),
            Fractal::LambdaM | Fractal::LambdaJ => window(-2.0, -2.5, 4.0, 2.5),
            Fractal::FmSynthM | Fractal::FmSynthJ => window(-100.0, -100.0, 100.0, 100.0),
            Fractal::CircleM | Fractal::CircleJ => window(-150.0, -150.0, 150.0, 150.0),
            Fractal::SinM | Fractal::SinJ => window(-3.0, -3.0, 3.0, 3.0),
            // One quadrant; the other three are its mirror images.
            Fractal::Mandelbox => window(-4.0, -4.0, 0.0, 0.0),
        }
    }

    /// The iteration budget used when none is asked for.  The
    /// Mandelbox is drawn after only a handful of folds.
    pub fn default_iterations(self) -> u32 {
        match self {
            Fractal::Mandelbox => 6,
            _ => 1000,
        }
    }

    /// Resolve the fractal to the function that iterates it.
    pub fn kernel(self) -> Kernel {
        let func: KernelFn = match self {
            Fractal::Mandelbrot | Fractal::Julia => quadratic,
            Fractal::Mandelbrot3 | Fractal::Julia3 => cubic,
            Fractal::Mandelbrot4 | Fractal::Julia4 => quartic,
            Fractal::MandelbrotZ2MinusZ | Fractal::JuliaZ2MinusZ => quadratic_minus_z,
            Fractal::BarnsleyM1 | Fractal::BarnsleyJ1 => barnsley1,
            Fractal::BarnsleyM2 | Fractal::BarnsleyJ2 => barnsley2,
            Fractal::BarnsleyM3 | Fractal::BarnsleyJ3 => barnsley3,
            Fractal::MagnetM1 | Fractal::MagnetJ1 => magnet1,
            Fractal::MagnetM2 | Fractal::MagnetJ2 => magnet2,
            Fractal::ManowarM => manowar_m,
            Fractal::ManowarJ => manowar,
            Fractal::PhoenixM => phoenix_m,
            Fractal::PhoenixJ => phoenix,
            Fractal::LambdaM => lambda_m,
            Fractal::LambdaJ => lambda,
            Fractal::NewtonM => newton_m,
            Fractal::NewtonJ => newton_j,
            Fractal::FmSynthM => fm_synth_m,
            Fractal::FmSynthJ => fm_synth_j,
            Fractal::CircleM => circle_m,
            Fractal::CircleJ => circle,
            Fractal::SinM => sine_m,
            Fractal::SinJ => sine,
            Fractal::Mandelbox => mandelbox,
        };
        Kernel {
            fractal: self,
            style: self.style(),
            window: self.window(),
            func,
        }
    }
}

impl fmt::Display for Fractal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Fractal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Fractal> {
        ALL.iter()
            .cloned()
            .find(|f| f.name() == s)
            .ok_or_else(|| Error::UnknownFractal(s.to_string()))
    }
}

/// A fractal resolved to its iteration function.  Chosen once per
/// image; the renderer only ever calls `func` through it.
#[derive(Copy, Clone)]
pub struct Kernel {
    /// What this kernel draws.
    pub fractal: Fractal,
    /// How the pixel feeds in.
    pub style: Style,
    /// Default window.
    pub window: Window,
    /// The recurrence.
    pub func: KernelFn,
}

impl Kernel {
    /// Runs the recurrence for one point of the plane.
    #[inline]
    pub fn iterate(&self, point: Complex<f64>, seed: Complex<f64>, max_iterations: u32) -> Escape {
        match self.style {
            Style::Mandelbrot => (self.func)(seed, point, max_iterations),
            Style::Julia => (self.func)(point, seed, max_iterations),
        }
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("fractal", &self.fractal)
            .field("style", &self.style)
            .field("window", &self.window)
            .finish()
    }
}
