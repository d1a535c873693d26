//! Contains the PlaneMapper struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0,
//! and a window on the complex plane.  Pixel rows run top to bottom
//! and walk the window from `ymin` to `ymax`.
use error::{Error, Result};

/// The rectangle of the complex plane an image covers.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// Real part of the first column.
    pub xmin: f64,
    /// Imaginary part of the first row.
    pub ymin: f64,
    /// Real edge one column past the last.
    pub xmax: f64,
    /// Imaginary edge one row past the last.
    pub ymax: f64,
}

impl Window {
    /// Constructor.  Rejects windows whose maximum is not strictly
    /// greater than their minimum, on either axis.
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<Window> {
        let window = Window {
            xmin,
            ymin,
            xmax,
            ymax,
        };
        window.validate()?;
        Ok(window)
    }

    /// Checks the invariant on a window built field by field.
    pub fn validate(&self) -> Result<()> {
        let finite = [self.xmin, self.ymin, self.xmax, self.ymax]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.xmax <= self.xmin || self.ymax <= self.ymin {
            return Err(Error::InvalidWindow {
                xmin: self.xmin,
                ymin: self.ymin,
                xmax: self.xmax,
                ymax: self.ymax,
            });
        }
        Ok(())
    }

    /// Width of the window on the real axis.
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Height of the window on the imaginary axis.
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }
}

/// How pixel coordinates become plane coordinates.
///
/// `Direct` computes `min + pixel * (max - min) / size` for every
/// pixel and is exactly reproducible at any resolution.  `Incremental`
/// starts each row at `min` and adds `(max - min) / size` once per
/// pixel; it is what the classic raster loops do, and its rounding
/// drifts slightly along long rows.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mapping {
    /// Multiply per pixel.
    Direct,
    /// Accumulate per pixel.
    Incremental,
}

impl Default for Mapping {
    fn default() -> Self {
        Mapping::Direct
    }
}

/// Contains the definitions of two planes: an integral cartesian
/// plane of `width` x `height` pixels, and a window on the complex
/// plane.  Maps pixels of one to points of the other.
#[derive(Debug, Clone)]
pub struct PlaneMapper {
    /// Width of the pixel grid.
    pub width: usize,
    /// Height of the pixel grid.
    pub height: usize,
    /// The window the grid is laid over.
    pub window: Window,
    // Distance between neighbouring pixels, per axis.
    steps: (f64, f64),
}

impl PlaneMapper {
    /// Constructor.  Fails on an empty grid or an improper window.
    pub fn new(width: usize, height: usize, window: Window) -> Result<PlaneMapper> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyImage {
                width: width as u32,
                height: height as u32,
            });
        }
        window.validate()?;
        Ok(PlaneMapper {
            width,
            height,
            window,
            steps: (
                window.width() / (width as f64),
                window.height() / (height as f64),
            ),
        })
    }

    /// The total number of points in the integral grid.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Describes that the integral plane has no pixels.  Never true
    /// for a mapper that was successfully constructed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Real coordinate of a column.
    #[inline]
    pub fn column_to_re(&self, column: usize) -> f64 {
        self.window.xmin + (column as f64) * self.window.width() / (self.width as f64)
    }

    /// Imaginary coordinate of a row.
    #[inline]
    pub fn row_to_im(&self, row: usize) -> f64 {
        self.window.ymin + (row as f64) * self.window.height() / (self.height as f64)
    }

    /// The imaginary coordinate of every row, in order, computed the
    /// way `mapping` says.
    pub fn rows(&self, mapping: Mapping) -> Vec<f64> {
        self.axis(mapping, self.height, self.window.ymin, self.steps.1, |r| {
            self.row_to_im(r)
        })
    }

    /// The real coordinate of every column, in order, computed the
    /// way `mapping` says.
    pub fn columns(&self, mapping: Mapping) -> Vec<f64> {
        self.axis(mapping, self.width, self.window.xmin, self.steps.0, |c| {
            self.column_to_re(c)
        })
    }

    fn axis<F>(&self, mapping: Mapping, count: usize, start: f64, step: f64, direct: F) -> Vec<f64>
    where
        F: Fn(usize) -> f64,
    {
        match mapping {
            Mapping::Direct => (0..count).map(direct).collect(),
            Mapping::Incremental => {
                let mut values = Vec::with_capacity(count);
                let mut v = start;
                for _ in 0..count {
                    values.push(v);
                    v += step;
                }
                values
            }
        }
    }
}
