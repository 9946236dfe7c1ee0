// What you SEE:
// • Every PANEL argument gets its own strip of the surface, starting at its offset.
// • Each panel's pixmaps are decoded on a background thread and swapped in as they arrive.
// • With --availability, panels show their image or go black as rooms change state.
// • Runs for --runtime-secs (or until the window closes / ESC with --window).

use anyhow::{Context as _, bail};
use clap::Parser;
use pixmap_panels::config::Cli;
use pixmap_panels::{
    AvailabilitySource, DisplaySink, MemorySurface, Pipeline, PlaylistSource, RunReport,
    StopToken,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_target(false)
        .init();

    #[cfg(feature = "camera")]
    let has_camera = cli.camera.is_some();
    #[cfg(not(feature = "camera"))]
    let has_camera = false;
    if cli.panels.is_empty() && !has_camera {
        bail!("nothing to show: pass at least one NAME=PATH panel");
    }

    let (width, height) = cli.surface_size();
    tracing::info!(width, height, "surface size");

    /* --- Window sink ---
       Visual: a magnified window stands in for the LED chain. */
    #[cfg(feature = "window")]
    if cli.window {
        let sink = pixmap_panels::WindowSink::new("pixmap-panels", width, height, cli.scale)?;
        run(sink, &cli)?;
        return Ok(());
    }

    /* --- Headless sink ---
       Visual: nothing on screen; --snapshot saves what would have been shown. */
    let report = run(MemorySurface::new(width, height), &cli)?;
    if let Some(path) = &cli.snapshot {
        report
            .sink
            .save_png(path)
            .with_context(|| format!("write snapshot '{}'", path.display()))?;
        tracing::info!(path = %path.display(), "wrote snapshot");
    }
    Ok(())
}

fn run<S: DisplaySink>(sink: S, cli: &Cli) -> anyhow::Result<RunReport<S>> {
    let mut pipeline = Pipeline::new(sink);

    /* --- One producer per panel --- */
    for (index, spec) in cli.panels.iter().enumerate() {
        let offset = cli.offset_for(index, spec);
        let started = match &cli.availability {
            Some(availability) => {
                // Only the first path is used as the room's image.
                let source = AvailabilitySource::new(
                    spec.name.clone(),
                    availability.clone(),
                    spec.paths[0].clone(),
                    cli.panel_size(),
                    cli.availability_interval(),
                );
                pipeline.add_source(spec.name.clone(), offset, source)
            }
            None => {
                let source = PlaylistSource::new(spec.paths.clone(), cli.reload_interval())
                    .repeat(cli.repeat);
                pipeline.add_source(spec.name.clone(), offset, source)
            }
        };
        started.with_context(|| format!("start producer for panel '{}'", spec.name))?;
    }

    #[cfg(feature = "camera")]
    if let Some(name) = &cli.camera {
        let offset = cli.default_offset(cli.panels.len());
        let (w, h) = cli.panel_size();
        let interval = std::time::Duration::from_millis(cli.tick_ms);
        pipeline
            .add_source_with(name.clone(), offset, move || {
                pixmap_panels::CameraSource::new(0, w as u32, h as u32, interval)
            })
            .with_context(|| format!("start camera for panel '{name}'"))?;
    }

    /* --- Render until timeout / close --- */
    let stop = StopToken::new();
    let report = pipeline.run(&stop, cli.run_options())?;

    tracing::info!(
        ticks = report.render.ticks,
        presents = report.render.presents,
        frames_adopted = report.render.frames_adopted,
        frames_dropped = report.frames_dropped(),
        "exiting"
    );
    for (name, stats) in &report.producers {
        tracing::debug!(
            panel = %name,
            published = stats.published,
            failures = stats.failures,
            "producer summary"
        );
    }
    Ok(report)
}
