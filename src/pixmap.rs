// Binary pixmap (P6) decoder.
//
// Strict on purpose: the header is three newline-terminated lines (`P6`, `W H`, `255`),
// each of which may be preceded by any number of `#` comment lines, followed by exactly
// W*H*3 bytes of RGB triples in row-major order.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use crate::error::{DecodeError, HeaderStage};
use crate::types::{FrameBuffer, Pixel, pixel_count};

// Never reserve more than this up front; a lying header must not allocate gigabytes.
const MAX_PREALLOC: usize = 1 << 20;

/// Decode the pixmap at `path`.
///
/// Emits an `info` event naming the file and its size on success and a `warn` event
/// carrying the offending header line on failure. Nothing is committed anywhere on
/// failure; the caller only ever receives a complete frame.
pub fn decode(path: impl AsRef<Path>) -> Result<FrameBuffer, DecodeError> {
    let path = path.as_ref();
    let result = open(path).and_then(|f| decode_from_reader(BufReader::new(f)));
    match &result {
        Ok(fb) => tracing::info!(
            source = %path.display(),
            width = fb.width(),
            height = fb.height(),
            "read pixmap"
        ),
        Err(e) => tracing::warn!(source = %path.display(), error = %e, "could not read pixmap"),
    }
    result
}

/// Decode a pixmap from any buffered byte stream.
pub fn decode_from_reader<R: BufRead>(mut reader: R) -> Result<FrameBuffer, DecodeError> {
    let line = expect_header_line(&mut reader, HeaderStage::Magic)?;
    if line.trim() != "P6" {
        return Err(DecodeError::format(HeaderStage::Magic, line));
    }

    let line = expect_header_line(&mut reader, HeaderStage::Dimensions)?;
    let (width, height) = parse_dimensions(&line)?;

    let line = expect_header_line(&mut reader, HeaderStage::MaxValue)?;
    let mut tokens = line.split_whitespace();
    match (tokens.next().map(str::parse::<i64>), tokens.next()) {
        (Some(Ok(255)), None) => {}
        _ => return Err(DecodeError::format(HeaderStage::MaxValue, line)),
    }

    let count = pixel_count(width, height)?;
    let expected = count * 3;
    let mut raw = Vec::with_capacity(expected.min(MAX_PREALLOC));
    reader.take(expected as u64).read_to_end(&mut raw)?;
    if raw.len() < expected {
        return Err(DecodeError::TruncatedData {
            expected,
            actual: raw.len(),
        });
    }

    let pixels = raw
        .chunks_exact(3)
        .map(|c| Pixel::new(c[0], c[1], c[2]))
        .collect();
    FrameBuffer::new(width as i32, height as i32, pixels)
}

fn open(path: &Path) -> Result<File, DecodeError> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DecodeError::NotFound(path.to_path_buf()),
        _ => DecodeError::Io(e),
    })
}

/// Next header line that is not a `#` comment, or `None` at end of input.
fn read_header_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        if buf.first() != Some(&b'#') {
            return Ok(Some(String::from_utf8_lossy(&buf).into_owned()));
        }
    }
}

fn expect_header_line<R: BufRead>(
    reader: &mut R,
    stage: HeaderStage,
) -> Result<String, DecodeError> {
    read_header_line(reader)?.ok_or_else(|| DecodeError::format(stage, ""))
}

fn parse_dimensions(line: &str) -> Result<(i64, i64), DecodeError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [w, h] = tokens.as_slice() else {
        return Err(DecodeError::format(HeaderStage::Dimensions, line));
    };
    match (w.parse::<i64>(), h.parse::<i64>()) {
        (Ok(width), Ok(height)) => Ok((width, height)),
        _ => Err(DecodeError::format(HeaderStage::Dimensions, line)),
    }
}
