// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The image renderer walks every pixel of a raster, asks the kernel
//! how quickly that point escapes, and turns the answer into a colour.
//!
//! There are two ways to colour.  `Shading::Palette` looks the count
//! up directly.  `Shading::LogScale` needs the whole image first: it
//! records `|z|²` where each orbit escaped, finds the largest such
//! value, and only then maps every pixel onto a logarithmic ramp.
//! Points that never escape are painted with palette entry 0.

use std::time::Instant;

use crossbeam;
use itertools::iproduct;
use num::Complex;

use error::{Error, Result};
use kernels::{Escape, Fractal, Kernel};
use palette::{Palette, Rgb};
use planes::{Mapping, PlaneMapper, Window};

/// Bytes per pixel in an `Image`.
pub const CHANNELS: usize = 4;

/// The raw value the log-scale pass gives a point that never escaped.
const NEVER_ESCAPED: f64 = -1.0;

/// Reserves a buffer, reporting failure instead of aborting.
fn allocate<T: Clone>(len: usize, fill: T) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| Error::Allocation {
            bytes: len.saturating_mul(::std::mem::size_of::<T>()),
        })?;
    buffer.resize(len, fill);
    Ok(buffer)
}

/// A finished (or in-progress) raster: row-major, top row first, four
/// bytes per pixel in red, green, blue, padding order.  The padding
/// byte is always 255 so the buffer doubles as opaque RGBA.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Image {
    /// A black image.  Fails on a zero dimension or when the buffer
    /// cannot be allocated.
    pub fn new(width: u32, height: u32) -> Result<Image> {
        let len = Image::buffer_len(width, height)?;
        let pixels = allocate(len, 0u8)?;
        Ok(Image {
            width,
            height,
            pixels,
        })
    }

    /// Adopts an existing buffer, which must hold exactly
    /// `width * height * 4` bytes.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Image> {
        let expected = Image::buffer_len(width, height)?;
        if pixels.len() != expected {
            return Err(Error::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Image {
            width,
            height,
            pixels,
        })
    }

    fn buffer_len(width: u32, height: u32) -> Result<usize> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyImage { width, height });
        }
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(CHANNELS))
            .ok_or(Error::Allocation {
                bytes: ::std::usize::MAX,
            })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The raw buffer.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Gives up the raw buffer.
    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "pixel ({}, {}) outside image", x, y);
        ((y as usize) * (self.width as usize) + (x as usize)) * CHANNELS
    }

    /// Writes one pixel.
    #[inline]
    pub fn put(&mut self, x: u32, y: u32, color: Rgb) {
        let offset = self.offset(x, y);
        self.pixels[offset..offset + CHANNELS].copy_from_slice(&[color[0], color[1], color[2], 0xff]);
    }

    /// Reads one pixel back, padding byte included.
    pub fn get(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = self.offset(x, y);
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.pixels[offset..offset + CHANNELS]);
        px
    }

    /// Packed RGB, top row first, for sinks that do not want padding.
    pub fn to_rgb(&self) -> Vec<u8> {
        self.pixels
            .chunks(CHANNELS)
            .flat_map(|px| px[..3].iter().cloned())
            .collect()
    }

    /// Packed BGR, bottom row first, the layout of TGA and BMP bodies.
    pub fn to_bgr_bottom_up(&self) -> Vec<u8> {
        let stride = self.width as usize * CHANNELS;
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for row in self.pixels.chunks(stride).rev() {
            for px in row.chunks(CHANNELS) {
                out.extend_from_slice(&[px[2], px[1], px[0]]);
            }
        }
        out
    }
}

/// The inputs a kernel needs besides the pixel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Parameters {
    /// The fixed half of the kernel's input: the starting value for a
    /// Mandelbrot-style fractal, `c` for a Julia-style one.
    pub seed: Complex<f64>,
    /// Iteration budget per pixel.
    pub max_iterations: u32,
}

impl Parameters {
    /// Constructor.
    pub fn new(seed: Complex<f64>, max_iterations: u32) -> Parameters {
        Parameters {
            seed,
            max_iterations,
        }
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters::new(Complex::new(0.0, 0.0), 1000)
    }
}

/// How iteration results become palette indices.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Shading {
    /// `count * scale`, truncated to a byte.
    Palette {
        /// Spreads small counts across the palette.
        scale: u32,
    },
    /// Logarithm of the escape magnitude against the image's largest.
    LogScale,
}

impl Shading {
    /// How `fractal` is drawn when nothing else is asked for.  The
    /// mandelbox only looks like anything on a logarithmic ramp.
    pub fn default_for(fractal: Fractal) -> Shading {
        match fractal {
            Fractal::Mandelbox => Shading::LogScale,
            _ => Shading::default(),
        }
    }
}

impl Default for Shading {
    fn default() -> Self {
        Shading::Palette { scale: 1 }
    }
}

/// Everything needed to draw one image.  Once built it is only read,
/// so it can be shared between the threads of `render_threaded`.
#[derive(Debug, Clone)]
pub struct Renderer {
    kernel: Kernel,
    plane: PlaneMapper,
    params: Parameters,
    mapping: Mapping,
    shading: Shading,
}

impl Renderer {
    /// Requires the kernel, the image size, the window of the plane to
    /// cover (the kernel's own window when `None`), and the kernel
    /// parameters.
    pub fn new(
        kernel: Kernel,
        width: u32,
        height: u32,
        window: Option<Window>,
        params: Parameters,
    ) -> Result<Renderer> {
        let window = window.unwrap_or(kernel.window);
        let plane = PlaneMapper::new(width as usize, height as usize, window)?;
        Ok(Renderer {
            kernel,
            plane,
            params,
            mapping: Mapping::default(),
            shading: Shading::default(),
        })
    }

    /// Chooses how pixel coordinates are computed.
    pub fn with_mapping(mut self, mapping: Mapping) -> Renderer {
        self.mapping = mapping;
        self
    }

    /// Chooses how counts are coloured.
    pub fn with_shading(mut self, shading: Shading) -> Renderer {
        self.shading = shading;
        self
    }

    /// The kernel this renderer drives.
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// The pixel grid and window.
    pub fn plane(&self) -> &PlaneMapper {
        &self.plane
    }

    /// Iterates every pixel on the calling thread.  Row-major, top row
    /// first.
    pub fn escapes(&self) -> Result<Vec<Escape>> {
        let started = Instant::now();
        let (columns, rows) = (self.plane.columns(self.mapping), self.plane.rows(self.mapping));
        let mut buffer = allocate(self.plane.len(), Escape {
            iterations: 0,
            norm_sqr: 0.0,
        })?;
        for (slot, (y, x)) in buffer
            .iter_mut()
            .zip(iproduct!(0..self.plane.height, 0..self.plane.width))
        {
            *slot = self.iterate(columns[x], rows[y]);
        }
        debug!(
            "{}: {}x{} pixels in {:?}",
            self.kernel.fractal,
            self.plane.width,
            self.plane.height,
            started.elapsed()
        );
        Ok(buffer)
    }

    /// Iterates every pixel, splitting the rows into one contiguous
    /// band per thread.  The result is identical to `escapes`.
    pub fn escapes_threaded(&self, threads: usize) -> Result<Vec<Escape>> {
        // More bands than rows would leave threads with nothing to do.
        let threads = threads.min(self.plane.height);
        if threads <= 1 {
            return self.escapes();
        }
        let started = Instant::now();
        let width = self.plane.width;
        let band_rows = (self.plane.height + threads - 1) / threads;
        let (columns, rows) = (self.plane.columns(self.mapping), self.plane.rows(self.mapping));
        let mut buffer = allocate(self.plane.len(), Escape {
            iterations: 0,
            norm_sqr: 0.0,
        })?;
        {
            let bands: Vec<&mut [Escape]> = buffer.chunks_mut(band_rows * width).collect();
            let (columns, rows) = (&columns, &rows);
            crossbeam::scope(|spawner| {
                for (band, region) in bands.into_iter().enumerate() {
                    spawner.spawn(move |_| {
                        let first_row = band * band_rows;
                        for (offset, slot) in region.iter_mut().enumerate() {
                            let (x, y) = (offset % width, first_row + offset / width);
                            *slot = self.iterate(columns[x], rows[y]);
                        }
                    });
                }
            })
            .map_err(|_| Error::WorkerPanicked(self.kernel.fractal.to_string()))?;
        }
        debug!(
            "{}: {}x{} pixels on {} threads in {:?}",
            self.kernel.fractal,
            self.plane.width,
            self.plane.height,
            threads,
            started.elapsed()
        );
        Ok(buffer)
    }

    #[inline]
    fn iterate(&self, re: f64, im: f64) -> Escape {
        self.kernel
            .iterate(Complex::new(re, im), self.params.seed, self.params.max_iterations)
    }

    /// Palette index for every pixel.
    pub fn indices(&self, escapes: &[Escape]) -> Vec<u32> {
        match self.shading {
            Shading::Palette { scale } => escapes
                .iter()
                .map(|e| e.iterations.wrapping_mul(scale) & 0xff)
                .collect(),
            Shading::LogScale => log_scale(escapes, self.params.max_iterations),
        }
    }

    /// Colours a finished set of escapes.
    pub fn paint(&self, escapes: &[Escape], palette: &Palette) -> Result<Image> {
        let mut image = Image::new(self.plane.width as u32, self.plane.height as u32)?;
        let width = self.plane.width;
        for (i, index) in self.indices(escapes).into_iter().enumerate() {
            image.put((i % width) as u32, (i / width) as u32, palette.color(index));
        }
        Ok(image)
    }

    /// Draws the image on the calling thread.
    pub fn render(&self, palette: &Palette) -> Result<Image> {
        let escapes = self.escapes()?;
        self.paint(&escapes, palette)
    }

    /// Draws the image with its rows spread over `threads` threads.
    pub fn render_threaded(&self, palette: &Palette, threads: usize) -> Result<Image> {
        let escapes = self.escapes_threaded(threads)?;
        self.paint(&escapes, palette)
    }
}

/// The second pass of log-scale shading.  Escaped pixels carry their
/// `|z|²`, the others are flagged with `NEVER_ESCAPED` and end up at 0.
fn log_scale(escapes: &[Escape], max_iterations: u32) -> Vec<u32> {
    let raw: Vec<f64> = escapes
        .iter()
        .map(|e| {
            if e.escaped(max_iterations) {
                e.norm_sqr
            } else {
                NEVER_ESCAPED
            }
        })
        .collect();
    let max = raw
        .iter()
        .cloned()
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max);
    if max <= 1.0 {
        return vec![0; raw.len()];
    }
    let log_max = max.ln();
    raw.into_iter()
        .map(|v| {
            if v == NEVER_ESCAPED {
                0
            } else {
                let scaled = (v.ln() / log_max * 255.0) as i64;
                scaled.max(0).min(255) as u32
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn julia_renderer(size: u32) -> Renderer {
        Renderer::new(
            Fractal::Julia.kernel(),
            size,
            size,
            None,
            Parameters::new(Complex::new(-0.207190825, 0.676656625), 1000),
        )
        .unwrap()
    }

    #[test]
    fn image_keeps_length_invariant() {
        let image = Image::new(7, 3).unwrap();
        assert_eq!(image.pixels().len(), 7 * 3 * 4);
        assert!(Image::new(0, 3).is_err());
        assert!(Image::new(3, 0).is_err());
        assert!(Image::from_raw(2, 2, vec![0; 15]).is_err());
        assert!(Image::from_raw(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn put_and_get_address_the_same_pixel() {
        let mut image = Image::new(4, 4).unwrap();
        image.put(3, 2, [1, 2, 3]);
        assert_eq!(image.get(3, 2), [1, 2, 3, 255]);
        assert_eq!(&image.pixels()[(2 * 4 + 3) * 4..(2 * 4 + 3) * 4 + 4], &[1, 2, 3, 255]);
        assert_eq!(image.get(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    #[should_panic]
    fn writing_outside_the_image_panics() {
        let mut image = Image::new(4, 4).unwrap();
        image.put(4, 0, [0, 0, 0]);
    }

    #[test]
    fn pixel_layout_conversions() {
        let mut image = Image::new(2, 2).unwrap();
        image.put(0, 0, [1, 2, 3]);
        image.put(1, 1, [4, 5, 6]);
        assert_eq!(image.to_rgb(), vec![1, 2, 3, 0, 0, 0, 0, 0, 0, 4, 5, 6]);
        assert_eq!(image.to_bgr_bottom_up(), vec![0, 0, 0, 6, 5, 4, 3, 2, 1, 0, 0, 0]);
    }

    #[test]
    fn mandelbrot_center_never_escapes() {
        let renderer = Renderer::new(
            Fractal::Mandelbrot.kernel(),
            300,
            300,
            None,
            Parameters::default(),
        )
        .unwrap();
        let escapes = renderer.escapes().unwrap();
        assert_eq!(escapes[150 * 300 + 200].iterations, 1000);
    }

    #[test]
    fn julia_reference_center_pixel() {
        let renderer = julia_renderer(64);
        let escapes = renderer.escapes().unwrap();
        assert_eq!(escapes[32 * 64 + 32].iterations, 26);
        assert!(escapes.iter().all(|e| e.iterations <= 1000));
    }

    #[test]
    fn rendering_is_deterministic() {
        let palette = Palette::gradient();
        let a = julia_renderer(48).render(&palette).unwrap();
        let b = julia_renderer(48).render(&palette).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn threaded_rendering_matches_serial() {
        let palette = Palette::random(7);
        let renderer = julia_renderer(37);
        let serial = renderer.render(&palette).unwrap();
        for threads in &[2, 3, 8, 64] {
            assert_eq!(renderer.render_threaded(&palette, *threads).unwrap(), serial);
        }
    }

    #[test]
    fn absurd_thread_counts_are_clamped() {
        let renderer = julia_renderer(5);
        let serial = renderer.escapes().unwrap();
        assert_eq!(renderer.escapes_threaded(usize::max_value()).unwrap(), serial);
        assert_eq!(renderer.escapes_threaded(0).unwrap(), serial);
    }

    #[test]
    fn incremental_mapping_renders_same_size() {
        let palette = Palette::grayscale();
        let image = julia_renderer(16)
            .with_mapping(Mapping::Incremental)
            .render(&palette)
            .unwrap();
        assert_eq!(image.pixels().len(), 16 * 16 * 4);
    }

    #[test]
    fn palette_scale_wraps() {
        let renderer = julia_renderer(4).with_shading(Shading::Palette { scale: 3 });
        let escapes = vec![
            Escape {
                iterations: 100,
                norm_sqr: 5.0,
            };
            2
        ];
        assert_eq!(renderer.indices(&escapes), vec![300 & 0xff, 300 & 0xff]);
    }

    #[test]
    fn log_scale_blacks_out_the_interior() {
        let escapes = vec![
            Escape {
                iterations: 10,
                norm_sqr: 16.0,
            },
            Escape {
                iterations: 10,
                norm_sqr: 4.0,
            },
            Escape {
                iterations: 100,
                norm_sqr: 1.0e6,
            },
        ];
        let indices = log_scale(&escapes, 100);
        assert_eq!(indices, vec![255, 127, 0]);
    }

    #[test]
    fn log_scale_without_escapes_is_all_black() {
        let escapes = vec![
            Escape {
                iterations: 50,
                norm_sqr: 0.5,
            };
            4
        ];
        assert_eq!(log_scale(&escapes, 50), vec![0; 4]);
    }

    #[test]
    fn log_scale_render_paints_interior_with_first_entry() {
        let palette = Palette::gradient();
        let renderer = Renderer::new(
            Fractal::Mandelbrot.kernel(),
            300,
            300,
            None,
            Parameters::new(Complex::new(0.0, 0.0), 200),
        )
        .unwrap()
        .with_shading(Shading::LogScale);
        let image = renderer.render(&palette).unwrap();
        let c = palette.color(0);
        assert_eq!(image.get(200, 150), [c[0], c[1], c[2], 255]);
    }
}
