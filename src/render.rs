// Render side: claim pending frames, composite every panel onto the shared surface,
// present once per tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::DisplayError;
use crate::handoff::HandoffSlot;
use crate::stop::StopToken;
use crate::surface::DisplaySink;
use crate::types::FrameBuffer;

/// A logical sub-region of the surface fed by its own handoff slot.
pub struct Panel {
    name: String,
    offset: i32,
    slot: Arc<HandoffSlot>,
    current: FrameBuffer, // only ever touched by the render thread
}

impl Panel {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Horizontal position of the panel's left edge on the surface.
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// What this panel is currently showing (possibly the invalid frame).
    pub fn current(&self) -> &FrameBuffer {
        &self.current
    }

    pub fn slot(&self) -> &Arc<HandoffSlot> {
        &self.slot
    }

    /// Adopt a newly published frame, if any. The previous frame is freed here.
    fn claim(&mut self) -> bool {
        match self.slot.try_claim() {
            Some(frame) => {
                tracing::trace!(
                    panel = %self.name,
                    width = frame.width(),
                    height = frame.height(),
                    "adopting new frame"
                );
                self.current = frame;
                true
            }
            None => false,
        }
    }

    fn draw<S: DisplaySink + ?Sized>(&self, sink: &mut S) {
        let frame = &self.current;
        for x in 0..frame.width() {
            // Columns past i32::MAX are off every surface anyway.
            let Some(dest_x) = x.checked_add(self.offset) else {
                break;
            };
            for y in 0..frame.height() {
                sink.set_pixel(dest_x, y, frame.get_pixel(x, y));
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// No panel had anything to show; the surface was not touched.
    Idle,
    Presented,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub ticks: u64,
    pub presents: u64,
    /// New frames adopted across all panels.
    pub frames_adopted: u64,
}

pub struct RenderLoop<S> {
    sink: S,
    panels: Vec<Panel>,
    stats: RenderStats,
}

impl<S: DisplaySink> RenderLoop<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            panels: Vec::new(),
            stats: RenderStats::default(),
        }
    }

    /// Register a panel whose left edge sits at `offset`. The returned slot is what a
    /// producer publishes into.
    pub fn add_panel(&mut self, name: impl Into<String>, offset: i32) -> Arc<HandoffSlot> {
        let slot = Arc::new(HandoffSlot::new());
        let name = name.into();
        tracing::debug!(panel = %name, offset, "added panel");
        self.panels.push(Panel {
            name,
            offset,
            slot: Arc::clone(&slot),
            current: FrameBuffer::invalid(),
        });
        slot
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn panel(&self, name: &str) -> Option<&Panel> {
        self.panels.iter().find(|p| p.name == name)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// One frame: claim, composite, present.
    ///
    /// Panels without a valid frame are skipped. If none has one the tick does nothing at
    /// all, which is the normal state before the first frame arrives.
    pub fn tick(&mut self) -> Result<TickOutcome, DisplayError> {
        self.stats.ticks += 1;
        for panel in &mut self.panels {
            if panel.claim() {
                self.stats.frames_adopted += 1;
            }
        }

        let mut drew_any = false;
        for panel in self.panels.iter().filter(|p| p.current.is_valid()) {
            panel.draw(&mut self.sink);
            drew_any = true;
        }
        if !drew_any {
            return Ok(TickOutcome::Idle);
        }

        self.sink.present()?;
        self.stats.presents += 1;
        Ok(TickOutcome::Presented)
    }

    /// Tick every `interval` until `stop` is requested or the sink closes.
    pub fn run(
        &mut self,
        stop: &StopToken,
        interval: Duration,
    ) -> Result<RenderStats, DisplayError> {
        self.run_until(interval, |sink| stop.is_stop_requested() || !sink.is_open())
    }

    /// Tick every `interval` until `should_stop` says so. It is asked before every tick.
    pub fn run_until<F>(
        &mut self,
        interval: Duration,
        mut should_stop: F,
    ) -> Result<RenderStats, DisplayError>
    where
        F: FnMut(&S) -> bool,
    {
        let mut next_tick = Instant::now();
        let mut last_fps_time = Instant::now();
        let mut frames_this_second: u32 = 0;

        while !should_stop(&self.sink) {
            if self.tick()? == TickOutcome::Presented {
                frames_this_second += 1;
            }

            let now = Instant::now();
            if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
                let secs = now.duration_since(last_fps_time).as_secs_f32();
                let fps = frames_this_second as f32 / secs;
                tracing::debug!(fps = %format!("{fps:.1}"), "render rate");
                frames_this_second = 0;
                last_fps_time = now;
            }

            next_tick += interval;
            if next_tick > now {
                std::thread::sleep(next_tick - now);
            } else {
                // Running behind; don't try to catch up with a burst.
                next_tick = now;
            }
        }
        Ok(self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;
    use crate::types::Pixel;

    fn surface_10x10() -> MemorySurface {
        MemorySurface::new(10, 10)
    }

    fn pattern(x: usize, y: usize) -> Pixel {
        Pixel::new(10 + x as u8, 20 + y as u8, 30)
    }

    /// A surface whose front and back buffers both hold `pattern`, so a stray write of
    /// any colour shows up.
    fn patterned(width: usize, height: usize) -> MemorySurface {
        let mut sink = MemorySurface::new(width, height);
        for _ in 0..2 {
            for y in 0..height {
                for x in 0..width {
                    sink.set_pixel(x as i32, y as i32, pattern(x, y));
                }
            }
            sink.present().unwrap();
        }
        sink
    }

    fn assert_only_changed(sink: &MemorySurface, changed: &[((usize, usize), Pixel)]) {
        for y in 0..sink.height() {
            for x in 0..sink.width() {
                let expected = changed
                    .iter()
                    .find(|(at, _)| *at == (x, y))
                    .map_or(pattern(x, y), |(_, p)| *p);
                assert_eq!(sink.pixel(x, y), Some(expected), "({x},{y})");
            }
        }
    }

    #[test]
    fn tick_without_frames_is_a_noop() {
        let mut render = RenderLoop::new(surface_10x10());
        render.add_panel("eve", 0);
        assert_eq!(render.tick().unwrap(), TickOutcome::Idle);
        assert_eq!(render.sink().presents(), 0);
        assert_eq!(render.stats().ticks, 1);
    }

    #[test]
    fn white_pixel_lands_at_offset() {
        let mut render = RenderLoop::new(patterned(10, 10));
        let slot = render.add_panel("p", 5);
        slot.publish(FrameBuffer::solid(1, 1, Pixel::WHITE).unwrap());

        let presents_before = render.sink().presents();
        assert_eq!(render.tick().unwrap(), TickOutcome::Presented);
        assert_eq!(render.sink().presents(), presents_before + 1);
        assert_only_changed(render.sink(), &[((5, 0), Pixel::WHITE)]);
    }

    #[test]
    fn offset_near_i32_max_does_not_overflow() {
        let mut render = RenderLoop::new(patterned(4, 1));
        let slot = render.add_panel("p", i32::MAX);
        slot.publish(FrameBuffer::solid(2, 1, Pixel::WHITE).unwrap());

        assert_eq!(render.tick().unwrap(), TickOutcome::Presented);
        assert_only_changed(render.sink(), &[]);

        let slot = render.add_panel("q", i32::MIN);
        slot.publish(FrameBuffer::solid(2, 1, Pixel::WHITE).unwrap());
        assert_eq!(render.tick().unwrap(), TickOutcome::Presented);
        assert_only_changed(render.sink(), &[]);
    }

    #[test]
    fn keeps_current_frame_when_nothing_new() {
        let mut render = RenderLoop::new(surface_10x10());
        let slot = render.add_panel("p", 0);
        slot.publish(FrameBuffer::solid(2, 2, Pixel::new(1, 2, 3)).unwrap());
        render.tick().unwrap();
        render.tick().unwrap();
        assert_eq!(render.sink().presents(), 2);
        assert_eq!(render.sink().pixel(1, 1), Some(Pixel::new(1, 2, 3)));
        assert_eq!(render.stats().frames_adopted, 1);
        assert!(render.panel("p").unwrap().current().is_valid());
    }

    #[test]
    fn newer_frame_replaces_current() {
        let mut render = RenderLoop::new(surface_10x10());
        let slot = render.add_panel("p", 0);
        slot.publish(FrameBuffer::solid(1, 1, Pixel::WHITE).unwrap());
        render.tick().unwrap();
        slot.publish(FrameBuffer::solid(1, 1, Pixel::new(0, 0, 9)).unwrap());
        render.tick().unwrap();
        assert_eq!(render.sink().pixel(0, 0), Some(Pixel::new(0, 0, 9)));
    }

    #[test]
    fn panels_tile_side_by_side() {
        let mut render = RenderLoop::new(patterned(10, 10));
        let left = render.add_panel("left", 0);
        let right = render.add_panel("right", 5);
        let (red, green) = (Pixel::new(255, 0, 0), Pixel::new(0, 255, 0));
        left.publish(FrameBuffer::solid(5, 2, red).unwrap());
        right.publish(FrameBuffer::solid(5, 2, green).unwrap());

        render.tick().unwrap();
        let mut changed = Vec::new();
        for y in 0..2 {
            for x in 0..10 {
                changed.push(((x, y), if x < 5 { red } else { green }));
            }
        }
        assert_only_changed(render.sink(), &changed);
    }

    #[test]
    fn one_valid_panel_is_enough_to_present() {
        let mut render = RenderLoop::new(surface_10x10());
        render.add_panel("empty", 0);
        let slot = render.add_panel("full", 3);
        slot.publish(FrameBuffer::solid(1, 1, Pixel::WHITE).unwrap());
        assert_eq!(render.tick().unwrap(), TickOutcome::Presented);
        assert_eq!(render.sink().pixel(3, 0), Some(Pixel::WHITE));
    }

    #[test]
    fn frame_wider_than_surface_is_clipped() {
        let mut render = RenderLoop::new(patterned(4, 1));
        let slot = render.add_panel("p", 2);
        slot.publish(FrameBuffer::solid(8, 3, Pixel::WHITE).unwrap());
        render.tick().unwrap();
        assert_only_changed(
            render.sink(),
            &[((2, 0), Pixel::WHITE), ((3, 0), Pixel::WHITE)],
        );
    }

    #[test]
    fn run_stops_on_request() {
        let mut render = RenderLoop::new(surface_10x10());
        let slot = render.add_panel("p", 0);
        slot.publish(FrameBuffer::solid(1, 1, Pixel::WHITE).unwrap());

        let mut remaining = 3;
        let stats = render
            .run_until(Duration::from_millis(1), |_| {
                if remaining == 0 {
                    return true;
                }
                remaining -= 1;
                false
            })
            .unwrap();
        assert_eq!(stats.ticks, 3);
        assert_eq!(stats.presents, 3);

        let stop = StopToken::new();
        stop.request_stop();
        let stats = render.run(&stop, Duration::from_millis(1)).unwrap();
        assert_eq!(stats.ticks, 3);
    }
}
