//! Raw deflate encoders
//!
//! The codec only needs "a raw deflate stream for these bytes". The native
//! encoder produces one directly; the process encoder drives an external
//! gzip-compatible program and cuts the raw stream out of its gzip
//! container.

use super::error::{CompressionError, CompressionResult};
use flate2::Compression;
use flate2::read::DeflateEncoder;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Length of the gzip CRC32 + ISIZE trailer
pub const GZIP_FOOTER_LEN: usize = 8;

/// End of the original-filename field gzip stores for `*.bin` inputs
pub const GZIP_NAME_MARKER: &[u8] = b".bin\0";

/// Interval between exit polls while a timeout is armed
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Produces a raw (headerless) deflate stream
pub trait RawDeflateEncoder {
    /// Deflate `data` at maximum compression
    fn encode(&self, data: &[u8]) -> CompressionResult<Vec<u8>>;
}

impl<T: RawDeflateEncoder + ?Sized> RawDeflateEncoder for Box<T> {
    fn encode(&self, data: &[u8]) -> CompressionResult<Vec<u8>> {
        (**self).encode(data)
    }
}

/// In-process encoder backed by `flate2`
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEncoder;

impl RawDeflateEncoder for NativeEncoder {
    fn encode(&self, data: &[u8]) -> CompressionResult<Vec<u8>> {
        let mut encoder = DeflateEncoder::new(data, Compression::best());
        let mut compressed = Vec::new();
        encoder.read_to_end(&mut compressed).map_err(|e| {
            CompressionError::EncoderUnavailable(format!("deflate compression failed: {e}"))
        })?;
        Ok(compressed)
    }
}

/// Encoder that shells out to a gzip-compatible program (`<program> -c -9 <file>`)
#[derive(Debug, Clone)]
pub struct GzipProcessEncoder {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl GzipProcessEncoder {
    /// Use `program`, waiting for it indefinitely
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill the program and fail if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Program that will be invoked
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, input: &Path, output: std::fs::File) -> CompressionResult<()> {
        let mut child = Command::new(&self.program)
            .arg("-c")
            .arg("-9")
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::from(output))
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                CompressionError::EncoderUnavailable(format!(
                    "failed to start {}: {e}",
                    self.program.display()
                ))
            })?;

        let status = match self.timeout {
            None => child.wait()?,
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                loop {
                    if let Some(status) = child.try_wait()? {
                        break status;
                    }
                    if Instant::now() >= deadline {
                        // Already exiting or gone if these fail
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(CompressionError::EncoderUnavailable(format!(
                            "{} timed out after {timeout:?}",
                            self.program.display()
                        )));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        };

        if !status.success() {
            return Err(CompressionError::EncoderUnavailable(format!(
                "{} exited with {status}",
                self.program.display()
            )));
        }
        Ok(())
    }
}

impl RawDeflateEncoder for GzipProcessEncoder {
    fn encode(&self, data: &[u8]) -> CompressionResult<Vec<u8>> {
        // The input name must end in ".bin" so the stored filename carries the marker
        let mut input = tempfile::Builder::new()
            .prefix("tooie-")
            .suffix(".bin")
            .tempfile()?;
        input.write_all(data)?;
        input.flush()?;

        let output = tempfile::NamedTempFile::new()?;
        self.run(input.path(), output.reopen()?)?;

        let container = std::fs::read(output.path())?;
        debug!(
            "{} produced {} bytes for {} input bytes",
            self.program.display(),
            container.len(),
            data.len()
        );
        Ok(strip_gzip_framing(&container)?.to_vec())
    }
}

/// Cut the raw deflate stream out of a gzip container.
///
/// Drops the 8-byte trailer, then skips everything up to and including the
/// stored filename's `.bin\0` terminator.
pub fn strip_gzip_framing(container: &[u8]) -> CompressionResult<&[u8]> {
    let Some(without_footer) = container.len().checked_sub(GZIP_FOOTER_LEN) else {
        return Err(CompressionError::FramingNotFound(format!(
            "encoder output of {} bytes is shorter than the gzip footer",
            container.len()
        )));
    };
    let body = &container[..without_footer];

    let marker = body
        .windows(GZIP_NAME_MARKER.len())
        .position(|window| window == GZIP_NAME_MARKER)
        .ok_or_else(|| {
            CompressionError::FramingNotFound("no \".bin\\0\" filename marker".to_string())
        })?;

    Ok(&body[marker + GZIP_NAME_MARKER.len()..])
}
