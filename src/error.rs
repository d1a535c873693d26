// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Everything that can go wrong outside of a kernel.  Kernels
//! themselves never fail: a degenerate orbit is just a short one.

use std::io;
use std::result;

/// Errors raised by the renderer, the sinks, and the dispatcher.
#[derive(Debug, Fail)]
pub enum Error {
    /// An image needs at least one pixel.
    #[fail(display = "image size {}x{} has no pixels", width, height)]
    EmptyImage {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// The window's corners are reversed, collapsed, or not finite.
    #[fail(
        display = "window ({}, {})-({}, {}) is not a proper rectangle",
        xmin, ymin, xmax, ymax
    )]
    InvalidWindow {
        /// Left edge.
        xmin: f64,
        /// Bottom edge.
        ymin: f64,
        /// Right edge.
        xmax: f64,
        /// Top edge.
        ymax: f64,
    },

    /// The pixel buffer could not be reserved.
    #[fail(display = "could not allocate {} bytes for the pixel buffer", bytes)]
    Allocation {
        /// Size of the failed request.
        bytes: usize,
    },

    /// A raw buffer does not hold exactly four bytes per pixel.
    #[fail(display = "pixel buffer holds {} bytes, expected {}", actual, expected)]
    BufferSize {
        /// width * height * 4
        expected: usize,
        /// What was handed over.
        actual: usize,
    },

    /// A palette that is not 256 RGB triples.
    #[fail(display = "bad palette: {}", _0)]
    Palette(String),

    /// A fractal name that is not in the catalogue.
    #[fail(display = "unknown fractal '{}'", _0)]
    UnknownFractal(String),

    /// An output file whose extension has no sink.
    #[fail(display = "no image writer for '{}'", _0)]
    UnknownFormat(String),

    /// A batch file that could not be understood.
    #[fail(display = "bad batch configuration: {}", _0)]
    Config(String),

    /// A dispatch worker died before it could report.
    #[fail(display = "render worker for '{}' panicked", _0)]
    WorkerPanicked(String),

    /// Reading or writing a file failed.
    #[fail(display = "i/o error: {}", _0)]
    Io(#[cause] io::Error),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<::serde_json::Error> for Error {
    fn from(err: ::serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Shorthand used across the crate.
pub type Result<T> = result::Result<T, Error>;
