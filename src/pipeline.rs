// Wires producers to panels and runs the render loop, shutting down in a fixed order:
// production stops and is joined first, then rendering stops, then frames are freed.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{DisplayError, SourceError};
use crate::handoff::{HandoffSlot, SlotStats};
use crate::producer::{FrameSource, Producer, ProducerStats};
use crate::render::{RenderLoop, RenderStats};
use crate::stop::StopToken;
use crate::surface::DisplaySink;

#[derive(Clone, Copy, Debug)]
pub struct RunOptions {
    /// Render cadence.
    pub tick_interval: Duration,
    /// Stop after this long; `None` runs until the stop token fires or the sink closes.
    pub runtime: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(10),
            runtime: None,
        }
    }
}

/// What a finished run leaves behind.
pub struct RunReport<S> {
    pub sink: S,
    pub render: RenderStats,
    pub producers: Vec<(String, ProducerStats)>,
    pub slots: Vec<(String, SlotStats)>,
}

impl<S> RunReport<S> {
    /// Frames published but overwritten before the render loop claimed them.
    pub fn frames_dropped(&self) -> u64 {
        self.slots.iter().map(|(_, s)| s.dropped).sum()
    }
}

pub struct Pipeline<S> {
    render: RenderLoop<S>,
    producers: Vec<Producer>,
    production_stop: StopToken,
}

impl<S: DisplaySink> Pipeline<S> {
    pub fn new(sink: S) -> Self {
        Self {
            render: RenderLoop::new(sink),
            producers: Vec::new(),
            production_stop: StopToken::new(),
        }
    }

    /// A panel fed by hand rather than by a producer thread.
    pub fn add_panel(&mut self, name: impl Into<String>, offset: i32) -> Arc<HandoffSlot> {
        self.render.add_panel(name, offset)
    }

    /// A panel fed by `source` on its own production thread, started immediately.
    pub fn add_source<Src>(
        &mut self,
        name: impl Into<String>,
        offset: i32,
        source: Src,
    ) -> io::Result<()>
    where
        Src: FrameSource + Send + 'static,
    {
        self.add_source_with(name, offset, move || Ok(source))
    }

    /// Like [`Pipeline::add_source`] but the source is built on the production thread.
    pub fn add_source_with<F, Src>(
        &mut self,
        name: impl Into<String>,
        offset: i32,
        make_source: F,
    ) -> io::Result<()>
    where
        F: FnOnce() -> Result<Src, SourceError> + Send + 'static,
        Src: FrameSource + 'static,
    {
        let name = name.into();
        let slot = self.render.add_panel(name.clone(), offset);
        let producer =
            Producer::spawn_with(name, make_source, slot, self.production_stop.clone())?;
        self.producers.push(producer);
        Ok(())
    }

    pub fn render(&self) -> &RenderLoop<S> {
        &self.render
    }

    /// Render until `stop` fires, the runtime elapses, or the sink closes.
    pub fn run(self, stop: &StopToken, opts: RunOptions) -> Result<RunReport<S>, DisplayError> {
        let Self {
            mut render,
            mut producers,
            production_stop,
        } = self;
        let deadline = opts.runtime.map(|d| Instant::now() + d);
        let mut producer_stats = Vec::new();

        tracing::info!(
            panels = render.panels().len(),
            producers = producers.len(),
            runtime_ms = opts.runtime.map(|d| d.as_millis() as u64),
            "starting render loop"
        );

        let result = render.run_until(opts.tick_interval, |sink| {
            let reason = if stop.is_stop_requested() {
                "stop requested"
            } else if !sink.is_open() {
                "display closed"
            } else if deadline.is_some_and(|d| Instant::now() >= d) {
                "timeout reached"
            } else {
                return false;
            };
            tracing::info!(reason, "shutting down");
            shutdown_producers(&production_stop, &mut producers, &mut producer_stats);
            true
        });
        // A display error ends the loop without going through the closure above.
        shutdown_producers(&production_stop, &mut producers, &mut producer_stats);
        let render_stats = result?;

        let slots = render
            .panels()
            .iter()
            .map(|p| (p.name().to_string(), p.slot().stats()))
            .collect();
        Ok(RunReport {
            sink: render.into_sink(),
            render: render_stats,
            producers: producer_stats,
            slots,
        })
    }
}

fn shutdown_producers(
    stop: &StopToken,
    producers: &mut Vec<Producer>,
    stats: &mut Vec<(String, ProducerStats)>,
) {
    if producers.is_empty() {
        return;
    }
    // Signal everyone first so they wind down in parallel, then wait for each.
    stop.request_stop();
    for producer in producers.drain(..) {
        let name = producer.name().to_string();
        stats.push((name, producer.shutdown()));
    }
}
