#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Escape-time fractal renderer
//!
//! An escape-time fractal colours each pixel by how long a point of
//! the complex plane survives under some recurrence.  Take the pixel's
//! coordinate, feed it into the recurrence (as the constant `c` for a
//! Mandelbrot-style image, as the starting value for a Julia-style
//! one), and iterate until the orbit leaves a disc around the origin,
//! converges on a known attractor, or runs out of budget.  The number
//! of steps, looked up in a 256-colour palette, is the pixel.
//!
//! The crate is layered bottom up: `palette` and `planes` are plain
//! data, `kernels` holds the recurrences, `render` drives a kernel over
//! an image, `sink` writes images out, and `dispatch` runs several
//! renders side by side.  `config` reads batch files for the
//! `escapetime` binary.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

extern crate crossbeam;
extern crate image;
extern crate itertools;
extern crate num;
extern crate rand;
extern crate serde_json;

#[cfg(test)]
extern crate tempfile;

pub mod config;
pub mod dispatch;
pub mod error;
pub mod kernels;
pub mod palette;
pub mod planes;
pub mod render;
pub mod sink;

pub use config::BatchConfig;
pub use dispatch::{dispatch, JobReport, JobSummary, RenderJob};
pub use error::{Error, Result};
pub use kernels::{Escape, Fractal, Kernel, Style};
pub use palette::Palette;
pub use planes::{Mapping, PlaneMapper, Window};
pub use render::{Image, Parameters, Renderer, Shading};
pub use sink::{write_image, Format};
