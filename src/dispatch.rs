// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Runs a batch of independent renders at once: one thread per job,
//! all of them joined before `dispatch` returns.  Jobs share nothing
//! but the palette and their own read-only descriptions, so a job
//! that fails, or even panics, only spoils its own report.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossbeam;

use error::{Error, Result};
use kernels::Fractal;
use palette::Palette;
use planes::{Mapping, Window};
use render::{Parameters, Renderer, Shading};
use sink::write_image;

/// One image to draw and where to put it.
#[derive(Clone, Debug)]
pub struct RenderJob {
    /// Label used in logs and reports.
    pub name: String,
    /// What to draw.
    pub fractal: Fractal,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Seed and iteration budget.
    pub params: Parameters,
    /// Overrides the fractal's own window.
    pub window: Option<Window>,
    /// Pixel-to-plane arithmetic.
    pub mapping: Mapping,
    /// How counts become colours.
    pub shading: Shading,
    /// Output file; its extension chooses the format.
    pub output: PathBuf,
}

impl RenderJob {
    /// A job with the fractal's default window, direct mapping, and
    /// plain palette shading.
    pub fn new<P: Into<PathBuf>>(
        name: &str,
        fractal: Fractal,
        width: u32,
        height: u32,
        params: Parameters,
        output: P,
    ) -> RenderJob {
        RenderJob {
            name: name.to_string(),
            fractal,
            width,
            height,
            params,
            window: None,
            mapping: Mapping::default(),
            shading: Shading::default(),
            output: output.into(),
        }
    }

    /// Renders this job on the calling thread and writes the result.
    pub fn run(&self, palette: &Palette) -> Result<JobSummary> {
        let started = Instant::now();
        let renderer = Renderer::new(
            self.fractal.kernel(),
            self.width,
            self.height,
            self.window,
            self.params,
        )?
        .with_mapping(self.mapping)
        .with_shading(self.shading);
        let image = renderer.render(palette)?;
        let bytes_written = write_image(&self.output, &image)?;
        Ok(JobSummary {
            width: image.width(),
            height: image.height(),
            bytes_written,
            elapsed: started.elapsed(),
        })
    }
}

/// What a successful job produced.
#[derive(Clone, Debug, PartialEq)]
pub struct JobSummary {
    /// Width of the image written.
    pub width: u32,
    /// Height of the image written.
    pub height: u32,
    /// Size of the output file.
    pub bytes_written: u64,
    /// Wall time spent rendering and writing.
    pub elapsed: Duration,
}

/// The outcome of one job.
#[derive(Debug)]
pub struct JobReport {
    /// The job's name.
    pub name: String,
    /// The job's output file.
    pub output: PathBuf,
    /// Success, or why not.
    pub outcome: Result<JobSummary>,
}

impl JobReport {
    /// True when the job wrote its file.
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Runs every job on its own thread and waits for all of them.  The
/// reports come back in the same order as `jobs`.
pub fn dispatch(jobs: &[RenderJob], palette: &Palette) -> Vec<JobReport> {
    info!("dispatching {} render jobs", jobs.len());
    let outcomes = crossbeam::scope(|spawner| {
        let handles: Vec<_> = jobs
            .iter()
            .map(|job| spawner.spawn(move |_| job.run(palette)))
            .collect();
        handles
            .into_iter()
            .zip(jobs)
            .map(|(handle, job)| match handle.join() {
                Ok(outcome) => outcome,
                Err(_) => Err(Error::WorkerPanicked(job.name.clone())),
            })
            .collect::<Vec<_>>()
    });
    // Every handle was joined above, so the scope itself cannot fail.
    let outcomes = outcomes.unwrap_or_else(|_| {
        jobs.iter()
            .map(|job| Err(Error::WorkerPanicked(job.name.clone())))
            .collect()
    });
    jobs.iter()
        .zip(outcomes)
        .map(|(job, outcome)| {
            match outcome {
                Ok(ref summary) => info!(
                    "{}: wrote {} ({} bytes) in {:?}",
                    job.name,
                    job.output.display(),
                    summary.bytes_written,
                    summary.elapsed
                ),
                Err(ref err) => warn!("{}: {}", job.name, err),
            }
            JobReport {
                name: job.name.clone(),
                output: job.output.clone(),
                outcome,
            }
        })
        .collect()
}
