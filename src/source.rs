// Frame sources backed by pixmap files on disk.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SourceError;
use crate::pixmap;
use crate::producer::FrameSource;
use crate::types::{FrameBuffer, Pixel};

/// Decodes one file per poll, walking through `paths` in order.
///
/// Without `repeat` the source is exhausted after every path has been decoded once;
/// a failed path is retried on a later pass.
pub struct PlaylistSource {
    paths: Vec<PathBuf>,
    cursor: usize,
    done: Vec<bool>,
    repeat: bool,
    interval: Duration,
}

impl PlaylistSource {
    pub fn new(paths: Vec<PathBuf>, interval: Duration) -> Self {
        let done = vec![false; paths.len()];
        Self {
            paths,
            cursor: 0,
            done,
            repeat: false,
            interval,
        }
    }

    /// Keep cycling through the playlist (picks up edits to the files on disk).
    pub fn repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }
}

impl FrameSource for PlaylistSource {
    fn describe(&self) -> String {
        let names: Vec<String> = self.paths.iter().map(|p| p.display().to_string()).collect();
        format!("playlist [{}]", names.join(", "))
    }

    fn poll_frame(&mut self) -> Result<Option<FrameBuffer>, SourceError> {
        if self.paths.is_empty() || self.is_exhausted() {
            return Ok(None);
        }
        if !self.repeat {
            // skip what has already been shown once
            while self.done[self.cursor] {
                self.cursor = (self.cursor + 1) % self.paths.len();
            }
        }
        let idx = self.cursor;
        self.cursor = (self.cursor + 1) % self.paths.len();

        let frame = pixmap::decode(&self.paths[idx])?;
        self.done[idx] = true;
        Ok(Some(frame))
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn is_exhausted(&self) -> bool {
        !self.repeat && self.done.iter().all(|d| *d)
    }
}

/// Shows or blanks one panel depending on a shared availability file.
///
/// The file holds whitespace-separated `ROOM VALUE` pairs. When this room's value
/// changes, `1` publishes the room's pixmap and anything else publishes a black frame
/// of the panel's size.
pub struct AvailabilitySource {
    room: String,
    availability_path: PathBuf,
    image_path: PathBuf,
    blank_size: (i32, i32),
    last: Option<i64>,
    interval: Duration,
}

impl AvailabilitySource {
    pub fn new(
        room: impl Into<String>,
        availability_path: impl Into<PathBuf>,
        image_path: impl Into<PathBuf>,
        blank_size: (i32, i32),
        interval: Duration,
    ) -> Self {
        Self {
            room: room.into(),
            availability_path: availability_path.into(),
            image_path: image_path.into(),
            blank_size,
            last: None,
            interval,
        }
    }

    fn current_value(&self) -> Result<Option<i64>, SourceError> {
        let text = match std::fs::read_to_string(&self.availability_path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SourceError::Availability {
                    path: self.availability_path.clone(),
                    source,
                });
            }
        };
        Ok(parse_availability(&text, &self.availability_path)
            .into_iter()
            .rev()
            .find(|(room, _)| *room == self.room)
            .map(|(_, value)| value))
    }
}

impl FrameSource for AvailabilitySource {
    fn describe(&self) -> String {
        format!(
            "availability of '{}' in {}",
            self.room,
            self.availability_path.display()
        )
    }

    fn poll_frame(&mut self) -> Result<Option<FrameBuffer>, SourceError> {
        let Some(value) = self.current_value()? else {
            return Ok(None);
        };
        if self.last == Some(value) {
            return Ok(None);
        }

        let frame = if value == 1 {
            tracing::info!(room = %self.room, "room available, showing image");
            pixmap::decode(&self.image_path)?
        } else {
            tracing::info!(room = %self.room, value, "room unavailable, blanking panel");
            let (w, h) = self.blank_size;
            FrameBuffer::solid(w, h, Pixel::BLACK)?
        };
        // Only remember the state once the frame exists, so a failed decode is retried.
        self.last = Some(value);
        Ok(Some(frame))
    }

    fn interval(&self) -> Duration {
        self.interval
    }
}

/// `ROOM VALUE` pairs in file order. Reading stops at the first malformed pair.
pub fn parse_availability(text: &str, origin: &Path) -> Vec<(String, i64)> {
    let mut out = Vec::new();
    let mut tokens = text.split_whitespace();
    while let Some(room) = tokens.next() {
        let Some(value) = tokens.next().and_then(|v| v.parse::<i64>().ok()) else {
            tracing::warn!(file = %origin.display(), room, "malformed availability entry");
            break;
        };
        out.push((room.to_string(), value));
    }
    out
}
