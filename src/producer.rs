// Production side: a thread that asks a source for frames and publishes them into a
// panel's handoff slot until told to stop.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::SourceError;
use crate::handoff::HandoffSlot;
use crate::stop::StopToken;
use crate::types::FrameBuffer;

/// Something that can produce frames for one panel.
///
/// `poll_frame` may block briefly (file I/O, a camera read) but must never touch the
/// handoff slot; the producer publishes whatever it returns.
pub trait FrameSource {
    /// Short human-readable name for logs.
    fn describe(&self) -> String;

    /// `Ok(Some(frame))` publishes the frame, `Ok(None)` means nothing new this time.
    fn poll_frame(&mut self) -> Result<Option<FrameBuffer>, SourceError>;

    /// How long to wait before the next poll.
    fn interval(&self) -> Duration;

    /// `true` once the source will never produce anything again.
    fn is_exhausted(&self) -> bool {
        false
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }
    fn poll_frame(&mut self) -> Result<Option<FrameBuffer>, SourceError> {
        (**self).poll_frame()
    }
    fn interval(&self) -> Duration {
        (**self).interval()
    }
    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProducerStats {
    pub published: u64,
    pub failures: u64,
}

/// Owner's handle on a running production thread.
///
/// Dropping it stops the thread and waits for it, so nothing the thread uses is torn
/// down underneath it.
pub struct Producer {
    name: String,
    stop: StopToken,
    handle: Option<JoinHandle<ProducerStats>>,
}

impl Producer {
    /// Start a production thread for an already-built source.
    pub fn spawn<S>(
        name: impl Into<String>,
        source: S,
        slot: Arc<HandoffSlot>,
        stop: StopToken,
    ) -> std::io::Result<Self>
    where
        S: FrameSource + Send + 'static,
    {
        Self::spawn_with(name, move || Ok(source), slot, stop)
    }

    /// Start a production thread whose source is built on that thread. Use this for
    /// sources holding handles that cannot cross threads (cameras).
    pub fn spawn_with<F, S>(
        name: impl Into<String>,
        make_source: F,
        slot: Arc<HandoffSlot>,
        stop: StopToken,
    ) -> std::io::Result<Self>
    where
        F: FnOnce() -> Result<S, SourceError> + Send + 'static,
        S: FrameSource + 'static,
    {
        let name = name.into();
        let thread_stop = stop.clone();
        let thread_name = name.clone();
        let handle = thread::Builder::new()
            .name(format!("producer-{name}"))
            .spawn(move || match make_source() {
                Ok(source) => produce(&thread_name, source, &slot, &thread_stop),
                Err(e) => {
                    tracing::error!(
                        producer = %thread_name,
                        error = %e,
                        "could not start source"
                    );
                    ProducerStats {
                        published: 0,
                        failures: 1,
                    }
                }
            })?;
        Ok(Self {
            name,
            stop,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Ask the thread to stop after its current unit of work.
    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    /// Stop and wait for the thread to exit.
    pub fn shutdown(mut self) -> ProducerStats {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> ProducerStats {
        self.stop.request_stop();
        let Some(handle) = self.handle.take() else {
            return ProducerStats::default();
        };
        match handle.join() {
            Ok(stats) => {
                tracing::debug!(
                    producer = %self.name,
                    published = stats.published,
                    failures = stats.failures,
                    "producer stopped"
                );
                stats
            }
            Err(_) => {
                tracing::error!(producer = %self.name, "producer thread panicked");
                ProducerStats::default()
            }
        }
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn produce<S: FrameSource>(
    name: &str,
    mut source: S,
    slot: &HandoffSlot,
    stop: &StopToken,
) -> ProducerStats {
    let mut stats = ProducerStats::default();
    tracing::info!(producer = %name, source = %source.describe(), "producer started");

    while !stop.is_stop_requested() {
        // Decode fully before publishing; the slot lock is never held during I/O.
        match source.poll_frame() {
            Ok(Some(frame)) => {
                slot.publish(frame);
                stats.published += 1;
            }
            Ok(None) => {}
            Err(e) => {
                stats.failures += 1;
                tracing::warn!(producer = %name, error = %e, "source failed, will retry");
            }
        }

        if source.is_exhausted() {
            tracing::info!(producer = %name, "source exhausted");
            break;
        }
        if stop.wait_timeout(source.interval()) {
            break;
        }
    }
    stats
}
