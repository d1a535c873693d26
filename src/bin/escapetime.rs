// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate clap;
extern crate env_logger;
extern crate escapetime;
#[macro_use]
extern crate log;
extern crate num;
extern crate num_cpus;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use num::Complex;
use std::path::Path;
use std::process;
use std::str::FromStr;

use escapetime::{
    dispatch, write_image, BatchConfig, Fractal, Mapping, Palette, Parameters, Renderer, Shading,
    Style, Window,
};

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn parse_complex(s: &str) -> Option<Complex<f64>> {
    match parse_pair(s, ',') {
        Some((re, im)) => Some(Complex { re, im }),
        None => None,
    }
}

fn parse_window(s: &str) -> Option<Window> {
    let corners: Vec<f64> = s
        .split(',')
        .map(|v| f64::from_str(v.trim()))
        .collect::<Result<_, _>>()
        .ok()?;
    match corners.as_slice() {
        [xmin, ymin, xmax, ymax] => Window::new(*xmin, *ymin, *xmax, *ymax).ok(),
        _ => None,
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const FRACTAL: &str = "fractal";
const OUTPUT: &str = "output";
const SIZE: &str = "size";
const SEED: &str = "seed";
const ITERATIONS: &str = "iterations";
const WINDOW: &str = "window";
const PALETTE: &str = "palette";
const THREADS: &str = "threads";
const LOG_SCALE: &str = "log-scale";
const INCREMENTAL: &str = "incremental";
const COLOR_SCALE: &str = "color-scale";
const CONFIG: &str = "config";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("escapetime")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Escape-time fractal renderer")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(SubCommand::with_name("list").about("List the fractals that can be drawn"))
        .subcommand(
            SubCommand::with_name("render")
                .about("Render one fractal to a file")
                .arg(
                    Arg::with_name(FRACTAL)
                        .required(true)
                        .long(FRACTAL)
                        .short("f")
                        .takes_value(true)
                        .validator(|s| {
                            Fractal::from_str(&s)
                                .map(|_| ())
                                .map_err(|e| e.to_string())
                        })
                        .help("Fractal to draw (see 'escapetime list')"),
                )
                .arg(
                    Arg::with_name(OUTPUT)
                        .required(true)
                        .long(OUTPUT)
                        .short("o")
                        .takes_value(true)
                        .help("Output file; .ppm, .bmp, .tga or .png"),
                )
                .arg(
                    Arg::with_name(SIZE)
                        .required(false)
                        .long(SIZE)
                        .short("s")
                        .takes_value(true)
                        .default_value("800x600")
                        .validator(|s| validate_pair::<u32>(&s, 'x', "Could not parse output image size"))
                        .help("Size of output image"),
                )
                .arg(
                    Arg::with_name(SEED)
                        .required(false)
                        .long(SEED)
                        .short("c")
                        .takes_value(true)
                        .allow_hyphen_values(true)
                        .default_value("0,0")
                        .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse seed"))
                        .help("Julia constant, or Mandelbrot starting value, as RE,IM"),
                )
                .arg(
                    Arg::with_name(ITERATIONS)
                        .required(false)
                        .long(ITERATIONS)
                        .short("i")
                        .takes_value(true)
                        .validator(|s| {
                            validate_range(
                                &s,
                                0,
                                10_000_000u32,
                                "Could not parse iteration count",
                                "Iteration count must be at most 10000000",
                            )
                        })
                        .help("Iteration budget per pixel [default: 1000, mandelbox 6]"),
                )
                .arg(
                    Arg::with_name(WINDOW)
                        .required(false)
                        .long(WINDOW)
                        .short("w")
                        .takes_value(true)
                        .allow_hyphen_values(true)
                        .validator(|s| match parse_window(&s) {
                            Some(_) => Ok(()),
                            None => Err("Window must be XMIN,YMIN,XMAX,YMAX with max > min".to_string()),
                        })
                        .help("Region of the plane to draw, overriding the fractal's own"),
                )
                .arg(
                    Arg::with_name(PALETTE)
                        .required(false)
                        .long(PALETTE)
                        .short("p")
                        .takes_value(true)
                        .help("Fractint-style .map palette file"),
                )
                .arg(
                    Arg::with_name(THREADS)
                        .required(false)
                        .long(THREADS)
                        .short("t")
                        .takes_value(true)
                        .default_value("1")
                        .validator(move |s| {
                            validate_range(
                                &s,
                                1,
                                max_threads,
                                "Could not parse thread count",
                                &format!("Thread count must be between 1 and {}", max_threads),
                            )
                        })
                        .help("Number of threads to render with"),
                )
                .arg(
                    Arg::with_name(LOG_SCALE)
                        .long(LOG_SCALE)
                        .help("Colour by the logarithm of the escape magnitude"),
                )
                .arg(
                    Arg::with_name(INCREMENTAL)
                        .long(INCREMENTAL)
                        .help("Step across the plane by accumulation instead of multiplication"),
                )
                .arg(
                    Arg::with_name(COLOR_SCALE)
                        .long(COLOR_SCALE)
                        .takes_value(true)
                        .conflicts_with(LOG_SCALE)
                        .validator(|s| {
                            validate_range(
                                &s,
                                1,
                                255u32,
                                "Could not parse colour scale",
                                "Colour scale must be between 1 and 255",
                            )
                        })
                        .help("Multiply iteration counts before the palette lookup"),
                ),
        )
        .subcommand(
            SubCommand::with_name("batch")
                .about("Render every job in a JSON batch file concurrently")
                .arg(
                    Arg::with_name(CONFIG)
                        .required(true)
                        .index(1)
                        .help("Batch file"),
                ),
        )
        .get_matches()
}

fn list() {
    for fractal in Fractal::all() {
        let kernel = fractal.kernel();
        let w = kernel.window;
        let style = match kernel.style {
            Style::Mandelbrot => "mandelbrot",
            Style::Julia => "julia",
        };
        println!(
            "{:<12} {:<10} ({}, {}) - ({}, {})",
            fractal.name(),
            style,
            w.xmin,
            w.ymin,
            w.xmax,
            w.ymax
        );
    }
}

// The validators have already run, so these parses cannot fail; a
// failure here is reported like any other bad argument.
fn render(matches: &ArgMatches) -> escapetime::Result<()> {
    let bad = |what: &str| escapetime::Error::Config(format!("could not parse {}", what));
    let fractal = Fractal::from_str(matches.value_of(FRACTAL).unwrap_or_default())?;
    let output = matches.value_of(OUTPUT).unwrap_or_default();
    let (width, height) =
        parse_pair::<u32>(matches.value_of(SIZE).unwrap_or_default(), 'x').ok_or_else(|| bad(SIZE))?;
    let seed = parse_complex(matches.value_of(SEED).unwrap_or_default()).ok_or_else(|| bad(SEED))?;
    let iterations = match matches.value_of(ITERATIONS) {
        Some(s) => u32::from_str(s).map_err(|_| bad(ITERATIONS))?,
        None => fractal.default_iterations(),
    };
    let threads = usize::from_str(matches.value_of(THREADS).unwrap_or_default())
        .map_err(|_| bad(THREADS))?;
    let window = match matches.value_of(WINDOW) {
        Some(s) => Some(parse_window(s).ok_or_else(|| bad(WINDOW))?),
        None => None,
    };
    let palette = match matches.value_of(PALETTE) {
        Some(path) => Palette::load(path)?,
        None => Palette::default(),
    };
    let shading = if matches.is_present(LOG_SCALE) {
        Shading::LogScale
    } else {
        match matches.value_of(COLOR_SCALE) {
            Some(k) => Shading::Palette {
                scale: u32::from_str(k).map_err(|_| bad(COLOR_SCALE))?,
            },
            None => Shading::default_for(fractal),
        }
    };
    let mapping = if matches.is_present(INCREMENTAL) {
        Mapping::Incremental
    } else {
        Mapping::Direct
    };

    let renderer = Renderer::new(
        fractal.kernel(),
        width,
        height,
        window,
        Parameters::new(seed, iterations),
    )?
    .with_mapping(mapping)
    .with_shading(shading);
    let image = renderer.render_threaded(&palette, threads)?;
    let bytes = write_image(Path::new(output), &image)?;
    info!("{}: wrote {} ({} bytes)", fractal, output, bytes);
    Ok(())
}

fn batch(matches: &ArgMatches) -> escapetime::Result<bool> {
    let config = BatchConfig::load(matches.value_of(CONFIG).unwrap_or_default())?;
    let (palette, jobs) = config.prepare()?;
    let reports = dispatch(&jobs, &palette);
    let mut ok = true;
    for report in &reports {
        match report.outcome {
            Ok(ref summary) => println!(
                "ok     {} -> {} ({}x{}, {} bytes, {:.3}s)",
                report.name,
                report.output.display(),
                summary.width,
                summary.height,
                summary.bytes_written,
                summary.elapsed.as_secs_f64()
            ),
            Err(ref err) => {
                ok = false;
                println!("failed {} -> {}: {}", report.name, report.output.display(), err);
            }
        }
    }
    Ok(ok)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let matches = args();

    let outcome = match matches.subcommand() {
        ("list", Some(_)) => {
            list();
            Ok(true)
        }
        ("render", Some(sub)) => render(sub).map(|_| true),
        ("batch", Some(sub)) => batch(sub),
        _ => Ok(false),
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Render failure: {}", e);
            process::exit(1);
        }
    }
}
