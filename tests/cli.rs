extern crate assert_cmd;
extern crate predicates;
extern crate tempfile;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn escapetime() -> Command {
    Command::cargo_bin("escapetime").unwrap()
}

#[test]
fn list_names_the_catalogue() {
    escapetime()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("mandelbrot"))
        .stdout(predicate::str::contains("newton_j"))
        .stdout(predicate::str::contains("mandelbox"));
}

#[test]
fn render_writes_an_ascii_pixmap() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("julia.ppm");
    escapetime()
        .args(&["render", "-f", "julia", "-s", "32x24", "-c", "-0.8,0.156", "-i", "200"])
        .arg("-o")
        .arg(&out)
        .assert()
        .success();
    let text = fs::read_to_string(&out).unwrap();
    let header: Vec<&str> = text.split_whitespace().take(4).collect();
    assert_eq!(header, vec!["P3", "32", "24", "255"]);
}

#[test]
fn render_accepts_window_threads_and_shading() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("m.tga");
    escapetime()
        .args(&[
            "render",
            "-f",
            "mandelbrot",
            "-s",
            "40x30",
            "-w",
            "-1.0,-0.5,0.0,0.5",
            "-t",
            "1",
            "--log-scale",
            "--incremental",
        ])
        .arg("-o")
        .arg(&out)
        .assert()
        .success();
    assert_eq!(fs::metadata(&out).unwrap().len(), 18 + 40 * 30 * 3);
}

#[test]
fn render_rejects_unknown_fractal() {
    let dir = tempdir().unwrap();
    escapetime()
        .args(&["render", "-f", "sierpinski"])
        .arg("-o")
        .arg(dir.path().join("x.ppm"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("sierpinski"));
}

#[test]
fn render_rejects_bad_size_and_window() {
    let dir = tempdir().unwrap();
    escapetime()
        .args(&["render", "-f", "julia", "-s", "wide"])
        .arg("-o")
        .arg(dir.path().join("x.ppm"))
        .assert()
        .failure();
    escapetime()
        .args(&["render", "-f", "julia", "-w", "1,1,-1,-1"])
        .arg("-o")
        .arg(dir.path().join("x.ppm"))
        .assert()
        .failure();
}

#[test]
fn render_reports_unknown_extension() {
    let dir = tempdir().unwrap();
    escapetime()
        .args(&["render", "-f", "julia", "-s", "8x8"])
        .arg("-o")
        .arg(dir.path().join("x.gif"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Render failure"));
}

#[test]
fn batch_renders_every_job() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("batch.json");
    let names = ["a.ppm", "b.bmp", "c.tga", "d.png"];
    let jobs: Vec<String> = names
        .iter()
        .zip(&["mandelbrot", "julia", "magnet_m1", "newton_j"])
        .map(|(name, fractal)| {
            format!(
                r#"{{ "fractal": "{}", "width": 24, "height": 16, "seed": [1.0, 0.0], "max_iterations": 64, "output": "{}" }}"#,
                fractal,
                dir.path().join(name).display()
            )
        })
        .collect();
    fs::write(
        &config,
        format!(r#"{{ "palette": {{ "kind": "grayscale" }}, "jobs": [{}] }}"#, jobs.join(",")),
    )
    .unwrap();
    escapetime()
        .arg("batch")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("ok     a"))
        .stdout(predicate::str::contains("ok     d"));
    for name in &names {
        assert!(fs::metadata(dir.path().join(name)).unwrap().len() > 0);
    }
}

#[test]
fn batch_fails_after_finishing_the_healthy_jobs() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("batch.json");
    let good = dir.path().join("good.ppm");
    let bad = dir.path().join("bad.xyz");
    fs::write(
        &config,
        format!(
            r#"{{ "jobs": [
                {{ "fractal": "julia", "width": 8, "height": 8, "output": "{}" }},
                {{ "fractal": "julia", "width": 8, "height": 8, "output": "{}" }}
            ] }}"#,
            bad.display(),
            good.display()
        ),
    )
    .unwrap();
    escapetime()
        .arg("batch")
        .arg(&config)
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("failed bad"))
        .stdout(predicate::str::contains("ok     good"));
    assert!(good.exists());
}

#[test]
fn batch_rejects_malformed_file() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("batch.json");
    fs::write(&config, "{ \"jobs\": 3 }").unwrap();
    escapetime()
        .arg("batch")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad batch configuration"));
}
