use plotpy::{Curve, Plot};
use ppg::{
    ColorMeans, Config, FingerEvent, Frame, HeartRateMonitor, Reading, ReadingCell,
    DEFAULT_CAPACITY,
};
use std::error::Error;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage:
  analyze_ppg replay <frames.csv> [--config <config.toml>] [--plot]
  analyze_ppg synth <bpm> <seconds> [fps]";

/// One camera frame: capture time and ROI colour means.
#[derive(serde::Serialize, serde::Deserialize)]
struct Row {
    ms: u64,
    red: f32,
    green: f32,
    blue: f32,
}

fn load_config(path: Option<&str>) -> Result<Config, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let raw = std::fs::read_to_string(path).map_err(|e| format!("cannot read '{path}': {e}"))?;
    let config = toml::from_str(&raw).map_err(|e| format!("TOML parse error: {e}"))?;
    tracing::info!("loaded config from '{}'", path);
    Ok(config)
}

fn plot_values_multiple(
    vals: &[(&str, &[(f32, f32)])],
    markers: bool,
    file: &str,
) -> Result<(), Box<dyn Error>> {
    let mut plot = Plot::new();
    for (label, vals) in vals {
        let mut curve = Curve::new();
        curve.set_line_width(2.0);
        if markers {
            curve.set_marker_style("o");
        }

        curve.points_begin();
        for (x, y) in *vals {
            curve.points_add(*x, *y);
        }
        curve.points_end();
        curve.set_label(label);

        plot.add(&curve);
    }

    if let Err(e) = plot.legend().grid_and_labels("x", "y").show(file) {
        tracing::warn!("plotting failed: {}", e);
    }

    Ok(())
}

/// Plots the final sample window after smoothing, with the counted peaks.
fn plot_last_window(
    monitor: &HeartRateMonitor<'_, DEFAULT_CAPACITY>,
) -> Result<(), Box<dyn Error>> {
    let config = monitor.session().config();
    let mut raw = [0.0; DEFAULT_CAPACITY];
    let raw = monitor.session().samples().snapshot(&mut raw);
    let mut smoothed = vec![0.0; raw.len()];
    ppg::smooth_into(raw, config.smoothing_window, &mut smoothed);

    let raw_vals = raw
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f32, *v))
        .collect::<Vec<_>>();
    let smoothed_vals = smoothed
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f32, *v))
        .collect::<Vec<_>>();
    let peak_vals = ppg::peaks(&smoothed, config.prominence_threshold)
        .map(|p| (p.index as f32, smoothed[p.index]))
        .collect::<Vec<_>>();

    plot_values_multiple(
        &[("raw", &raw_vals), ("smoothed", &smoothed_vals)],
        false,
        "window.svg",
    )?;
    plot_values_multiple(&[("peaks", &peak_vals)], true, "peaks.svg")
}

fn replay(path: &str, config: Config, plot: bool) -> Result<(), Box<dyn Error>> {
    let cell = ReadingCell::new();
    let mut monitor = HeartRateMonitor::<DEFAULT_CAPACITY>::new(config, &cell)?;
    let mut rdr = csv::Reader::from_path(path)?;

    let mut flash_on = false;
    let mut announced = false;
    let mut last = Reading::NotReady;
    let mut frames = 0;
    let mut raw_vals = Vec::new();
    let mut bpm_vals = Vec::new();

    for result in rdr.deserialize() {
        let row: Row = result?;
        let now = Duration::from_millis(row.ms);
        let secs = now.as_secs_f32();

        let frame = Frame {
            timestamp: now,
            color: ColorMeans {
                red: row.red,
                green: row.green,
                blue: row.blue,
            },
            roi_valid: true,
            flash_on,
        };
        match monitor.process_frame(frame) {
            Some(FingerEvent::Placed) => {
                tracing::info!(secs, "finger placed, torch on");
                flash_on = true;
                announced = false;
            }
            Some(FingerEvent::Removed) => {
                tracing::info!(secs, "finger removed, torch off");
                flash_on = false;
            }
            None => {}
        }

        let reading = monitor.refresh(now);
        if reading != last {
            tracing::info!(
                secs,
                peaks = monitor.session().last_peak_count(),
                "reading: {}",
                reading
            );
            last = reading;
        }
        if let Some(bpm) = reading.bpm() {
            bpm_vals.push((secs, bpm.0));
        }
        if !announced && monitor.recording_finished(now) {
            tracing::info!(secs, recorded = monitor.recorded(), "recording finished: {}", reading);
            announced = true;
        }

        raw_vals.push((secs, row.red));
        frames += 1;
    }

    println!("{} frames, final reading: {}", frames, cell.load());

    if plot {
        plot_values_multiple(&[("red", &raw_vals)], false, "red.svg")?;
        plot_values_multiple(&[("bpm", &bpm_vals)], false, "bpm.svg")?;
        plot_last_window(&monitor)?;
    }
    Ok(())
}

/// Deterministic flicker in `-1..1`.
fn flicker(i: usize) -> f32 {
    let h = (i * 7919 + 13) % 101;
    h as f32 / 50.0 - 1.0
}

/// Writes a synthetic recording: one second of an uncovered lens, then a
/// lit finger pulsing at `bpm`.
fn synth(bpm: f32, seconds: f32, fps: f32) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    let num_frames = (seconds * fps) as usize;
    for i in 0..num_frames {
        let t = i as f32 / fps;
        let row = if t < 1.0 {
            Row {
                ms: (t * 1000.0) as u64,
                red: 110.0 + flicker(i),
                green: 105.0 + flicker(i + 1),
                blue: 100.0 + flicker(i + 2),
            }
        } else {
            let beat = (t * bpm / 60.0 * std::f32::consts::TAU).sin();
            Row {
                ms: (t * 1000.0) as u64,
                red: 180.0 + 30.0 * beat + 2.0 * flicker(i),
                green: 30.0 + flicker(i + 1),
                blue: 25.0 + flicker(i + 2),
            }
        };
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn parse<T: std::str::FromStr>(arg: Option<&String>, what: &str) -> Result<T, Box<dyn Error>> {
    let arg = arg.ok_or_else(|| format!("missing {what}\n{USAGE}"))?;
    arg.parse()
        .map_err(|_| format!("invalid {what} '{arg}'").into())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = std::env::args().collect::<Vec<_>>();
    match args.get(1).map(String::as_str) {
        Some("replay") => {
            let path = args.get(2).ok_or(USAGE)?;
            let mut config_path = None;
            let mut plot = false;
            let mut rest = args[3..].iter();
            while let Some(arg) = rest.next() {
                match arg.as_str() {
                    "--config" => config_path = Some(rest.next().ok_or(USAGE)?.as_str()),
                    "--plot" => plot = true,
                    other => return Err(format!("unknown argument '{other}'\n{USAGE}").into()),
                }
            }
            let config = load_config(config_path)?;
            replay(path, config, plot)
        }
        Some("synth") => {
            let bpm = parse(args.get(2), "bpm")?;
            let seconds = parse(args.get(3), "duration")?;
            let fps = match args.get(4) {
                Some(_) => parse(args.get(4), "frame rate")?,
                None => 30.0,
            };
            synth(bpm, seconds, fps)
        }
        _ => Err(USAGE.into()),
    }
}
