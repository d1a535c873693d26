// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Batch files.  A batch is a JSON document naming one palette and
//! any number of jobs:
//!
//! ```json
//! {
//!     "palette": { "kind": "random", "seed": 42 },
//!     "jobs": [
//!         { "fractal": "mandelbrot", "output": "m.ppm" },
//!         { "fractal": "julia", "seed": [-0.207190825, 0.676656625],
//!           "width": 640, "height": 480, "output": "j.png",
//!           "shading": "log_scale" }
//!     ]
//! }
//! ```
//!
//! Everything a job can vary lives in its own record.  Paths are used
//! as written, so relative ones resolve against the working directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use num::Complex;
use serde_json;

use dispatch::RenderJob;
use error::{Error, Result};
use kernels::Fractal;
use palette::Palette;
use planes::{Mapping, Window};
use render::{Parameters, Shading};

/// Where the batch's palette comes from.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaletteConfig {
    /// `Palette::gradient`.
    Gradient,
    /// `Palette::grayscale`.
    Grayscale,
    /// `Palette::random` with a fixed seed.
    Random {
        /// Seed for the generator.
        seed: u64,
    },
    /// A `.map` file of `R G B` lines.
    File {
        /// Location of the map.
        path: PathBuf,
    },
}

impl Default for PaletteConfig {
    fn default() -> Self {
        PaletteConfig::Gradient
    }
}

impl PaletteConfig {
    /// Builds the palette.
    pub fn build(&self) -> Result<Palette> {
        match *self {
            PaletteConfig::Gradient => Ok(Palette::gradient()),
            PaletteConfig::Grayscale => Ok(Palette::grayscale()),
            PaletteConfig::Random { seed } => Ok(Palette::random(seed)),
            PaletteConfig::File { ref path } => Palette::load(path),
        }
    }
}

/// The shading a job asks for by name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadingConfig {
    /// Palette lookup, multiplied by the job's `color_scale`.
    Palette,
    /// Two-pass logarithmic ramp.
    LogScale,
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    600
}

fn default_color_scale() -> u32 {
    1
}

/// One job as written in a batch file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Label for logs; defaults to the output file's stem.
    #[serde(default)]
    pub name: Option<String>,
    /// Catalogue name of the fractal.
    pub fractal: Fractal,
    /// Image width, 800 unless given.
    #[serde(default = "default_width")]
    pub width: u32,
    /// Image height, 600 unless given.
    #[serde(default = "default_height")]
    pub height: u32,
    /// `[re, im]` of the seed.
    #[serde(default)]
    pub seed: [f64; 2],
    /// Iteration budget; the fractal's own default if absent.
    #[serde(default)]
    pub max_iterations: Option<u32>,
    /// Where to write the image.
    pub output: PathBuf,
    /// Palette or log-scale; the fractal's own preference if absent.
    #[serde(default)]
    pub shading: Option<ShadingConfig>,
    /// Pixel-to-plane arithmetic.
    #[serde(default)]
    pub mapping: Mapping,
    /// Multiplier for palette shading.
    #[serde(default = "default_color_scale")]
    pub color_scale: u32,
    /// Replaces the fractal's own window.
    #[serde(default)]
    pub window: Option<Window>,
}

impl JobConfig {
    /// Turns the record into a runnable job.  `index` names jobs whose
    /// output has no usable file stem.
    pub fn to_job(&self, index: usize) -> Result<RenderJob> {
        if let Some(ref window) = self.window {
            window.validate()?;
        }
        let name = match self.name {
            Some(ref name) => name.clone(),
            None => self
                .output
                .file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("job{}", index)),
        };
        let shading = match self.shading {
            None if self.color_scale == 1 => Shading::default_for(self.fractal),
            None | Some(ShadingConfig::Palette) => Shading::Palette {
                scale: self.color_scale,
            },
            Some(ShadingConfig::LogScale) => Shading::LogScale,
        };
        let max_iterations = self
            .max_iterations
            .unwrap_or_else(|| self.fractal.default_iterations());
        let params = Parameters::new(Complex::new(self.seed[0], self.seed[1]), max_iterations);
        let mut job = RenderJob::new(
            &name,
            self.fractal,
            self.width,
            self.height,
            params,
            self.output.clone(),
        );
        job.window = self.window;
        job.mapping = self.mapping;
        job.shading = shading;
        Ok(job)
    }
}

/// A whole batch file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// Shared by every job.
    #[serde(default)]
    pub palette: PaletteConfig,
    /// The jobs, in report order.
    pub jobs: Vec<JobConfig>,
}

impl BatchConfig {
    /// Reads and parses a batch file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<BatchConfig> {
        let path = path.as_ref();
        debug!("reading batch file {}", path.display());
        fs::read_to_string(path)?.parse()
    }

    /// Builds the palette and every job.  The first bad job stops the
    /// whole batch before anything is rendered.
    pub fn prepare(&self) -> Result<(Palette, Vec<RenderJob>)> {
        let palette = self.palette.build()?;
        let jobs = self
            .jobs
            .iter()
            .enumerate()
            .map(|(i, job)| job.to_job(i))
            .collect::<Result<Vec<_>>>()?;
        Ok((palette, jobs))
    }
}

impl FromStr for BatchConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<BatchConfig> {
        let config: BatchConfig = serde_json::from_str(s)?;
        if config.jobs.is_empty() {
            return Err(Error::Config("batch has no jobs".to_string()));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_job_takes_defaults() {
        let config: BatchConfig = r#"{ "jobs": [ { "fractal": "mandelbrot", "output": "out/m.ppm" } ] }"#
            .parse()
            .unwrap();
        assert_eq!(config.palette, PaletteConfig::Gradient);
        let (_, jobs) = config.prepare().unwrap();
        let job = &jobs[0];
        assert_eq!(job.name, "m");
        assert_eq!(job.fractal, Fractal::Mandelbrot);
        assert_eq!((job.width, job.height), (800, 600));
        assert_eq!(job.params, Parameters::default());
        assert_eq!(job.mapping, Mapping::Direct);
        assert_eq!(job.shading, Shading::Palette { scale: 1 });
        assert_eq!(job.window, None);
    }

    #[test]
    fn every_field_is_honoured() {
        let text = r#"{
            "palette": { "kind": "random", "seed": 9 },
            "jobs": [ {
                "name": "j",
                "fractal": "magnet_j1",
                "width": 32, "height": 16,
                "seed": [0.5, -0.25],
                "max_iterations": 77,
                "output": "j.bmp",
                "shading": "palette",
                "color_scale": 3,
                "mapping": "incremental",
                "window": { "xmin": -1.0, "ymin": -1.0, "xmax": 1.0, "ymax": 1.0 }
            } ]
        }"#;
        let config: BatchConfig = text.parse().unwrap();
        let (palette, jobs) = config.prepare().unwrap();
        assert_eq!(palette, Palette::random(9));
        let job = &jobs[0];
        assert_eq!(job.name, "j");
        assert_eq!(job.fractal, Fractal::MagnetJ1);
        assert_eq!(job.params.seed, Complex::new(0.5, -0.25));
        assert_eq!(job.params.max_iterations, 77);
        assert_eq!(job.shading, Shading::Palette { scale: 3 });
        assert_eq!(job.mapping, Mapping::Incremental);
        assert_eq!(job.window, Some(Window::new(-1.0, -1.0, 1.0, 1.0).unwrap()));
    }

    #[test]
    fn mandelbox_prefers_log_scale() {
        let config: BatchConfig = r#"{ "jobs": [
            { "fractal": "mandelbox", "output": "a.png" },
            { "fractal": "mandelbox", "output": "b.png", "shading": "palette" },
            { "fractal": "julia", "output": "c.png", "shading": "log_scale" }
        ] }"#
            .parse()
            .unwrap();
        let (_, jobs) = config.prepare().unwrap();
        assert_eq!(jobs[0].shading, Shading::LogScale);
        assert_eq!(jobs[0].params.max_iterations, 6);
        assert_eq!(jobs[2].params.max_iterations, 1000);
        assert_eq!(jobs[1].shading, Shading::Palette { scale: 1 });
        assert_eq!(jobs[2].shading, Shading::LogScale);
    }

    #[test]
    fn rejects_bad_documents() {
        assert!("{ \"jobs\": [] }".parse::<BatchConfig>().is_err());
        assert!("not json".parse::<BatchConfig>().is_err());
        let unknown = r#"{ "jobs": [ { "fractal": "sierpinski", "output": "x.ppm" } ] }"#;
        match unknown.parse::<BatchConfig>() {
            Err(Error::Config(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
        let typo = r#"{ "jobs": [ { "fractal": "julia", "output": "x.ppm", "iterations": 5 } ] }"#;
        assert!(typo.parse::<BatchConfig>().is_err());
    }

    #[test]
    fn reversed_window_fails_preparation() {
        let config: BatchConfig = r#"{ "jobs": [ {
            "fractal": "julia", "output": "x.ppm",
            "window": { "xmin": 1.0, "ymin": -1.0, "xmax": -1.0, "ymax": 1.0 }
        } ] }"#
            .parse()
            .unwrap();
        match config.prepare() {
            Err(Error::InvalidWindow { .. }) => {}
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn missing_palette_file_is_an_io_error() {
        let config: BatchConfig = r#"{
            "palette": { "kind": "file", "path": "/nonexistent/palette.map" },
            "jobs": [ { "fractal": "julia", "output": "x.ppm" } ]
        }"#
            .parse()
            .unwrap();
        match config.prepare() {
            Err(Error::Io(_)) => {}
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }
}
