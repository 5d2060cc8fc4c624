//! Storage for part bodies.
//!
//! The decoder never decides on its own where a body lives. It asks a
//! [`BufferProvider`] for a sink, streams the body into it, and wraps the
//! result in a [`PartBuffer`] that can be re-read any number of times.
//!
//! The default provider, [`SpoolingBuffers`], keeps small bodies in memory
//! and moves large ones to anonymous temporary files, which the OS removes
//! once the owning [`Part`](crate::Part) is dropped.

use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use parking_lot::Mutex;

use crate::config::DEFAULT_SPOOL_THRESHOLD;

const MAX_PREALLOCATION: usize = 64 * 1024;

/// A readable, writable, seekable byte sink holding one part body.
pub trait PartSink: Read + Write + Seek + Send + fmt::Debug {
    /// Returns true when the bytes live on disk rather than in memory.
    fn is_spooled(&self) -> bool {
        false
    }
}

impl PartSink for Cursor<Vec<u8>> {}

impl PartSink for File {
    fn is_spooled(&self) -> bool {
        true
    }
}

/// What the decoder knows about a body before reading it.
#[derive(Debug, Clone, Copy)]
pub struct BufferHint<'a> {
    /// Declared `Content-Length`, or `-1` when unknown.
    pub declared_length: i64,
    /// True when the body will be read as raw bytes of a declared length.
    pub binary: bool,
    /// The part's `filename` parameter, when it is an upload.
    pub filename: Option<&'a str>,
}

/// Policy seam choosing where part bodies are buffered.
///
/// A provider error aborts the whole decode as
/// [`FormError::Io`](crate::FormError::Io).
pub trait BufferProvider {
    /// Create an empty sink for a body matching `hint`.
    fn make_buffer(&self, hint: &BufferHint<'_>) -> io::Result<Box<dyn PartSink>>;
}

/// Keeps every body in memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryBuffers;

impl BufferProvider for MemoryBuffers {
    fn make_buffer(&self, hint: &BufferHint<'_>) -> io::Result<Box<dyn PartSink>> {
        // Content-Length is client-supplied; cap the reservation.
        let capacity = usize::try_from(hint.declared_length)
            .unwrap_or(0)
            .min(MAX_PREALLOCATION);
        Ok(Box::new(Cursor::new(Vec::with_capacity(capacity))))
    }
}

/// Keeps small bodies in memory and spools large ones to temporary files.
#[derive(Debug, Clone, Copy)]
pub struct SpoolingBuffers {
    threshold: usize,
}

impl Default for SpoolingBuffers {
    fn default() -> Self {
        Self::new(DEFAULT_SPOOL_THRESHOLD)
    }
}

impl SpoolingBuffers {
    /// Spool bodies larger than `threshold` bytes.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    /// The spool threshold in bytes.
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl BufferProvider for SpoolingBuffers {
    fn make_buffer(&self, hint: &BufferHint<'_>) -> io::Result<Box<dyn PartSink>> {
        let declared = usize::try_from(hint.declared_length).ok();
        if declared.is_some_and(|len| len > self.threshold) {
            return Ok(Box::new(tempfile::tempfile()?));
        }
        Ok(Box::new(SpooledSink::new(self.threshold)))
    }
}

/// A sink that starts in memory and rolls over to a temporary file once it
/// grows past its threshold.
#[derive(Debug)]
pub struct SpooledSink {
    threshold: usize,
    inner: Spool,
}

#[derive(Debug)]
enum Spool {
    Memory(Cursor<Vec<u8>>),
    File(File),
}

impl SpooledSink {
    /// Create an in-memory sink that spools past `threshold` bytes.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            inner: Spool::Memory(Cursor::new(Vec::new())),
        }
    }

    fn roll_over(&mut self) -> io::Result<()> {
        let Spool::Memory(cursor) = &self.inner else {
            return Ok(());
        };
        let mut file = tempfile::tempfile()?;
        file.write_all(cursor.get_ref())?;
        file.seek(SeekFrom::Start(cursor.position()))?;
        tracing::trace!(
            buffered = cursor.get_ref().len(),
            threshold = self.threshold,
            "spooling part body to temporary file"
        );
        self.inner = Spool::File(file);
        Ok(())
    }
}

impl Read for SpooledSink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Spool::Memory(cursor) => cursor.read(buf),
            Spool::File(file) => file.read(buf),
        }
    }
}

impl Write for SpooledSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Spool::Memory(cursor) = &self.inner {
            let end = usize::try_from(cursor.position())
                .unwrap_or(usize::MAX)
                .saturating_add(buf.len());
            if end > self.threshold {
                self.roll_over()?;
            }
        }
        match &mut self.inner {
            Spool::Memory(cursor) => cursor.write(buf),
            Spool::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            Spool::Memory(_) => Ok(()),
            Spool::File(file) => file.flush(),
        }
    }
}

impl Seek for SpooledSink {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.inner {
            Spool::Memory(cursor) => cursor.seek(pos),
            Spool::File(file) => file.seek(pos),
        }
    }
}

impl PartSink for SpooledSink {
    fn is_spooled(&self) -> bool {
        matches!(self.inner, Spool::File(_))
    }
}

/// An assembled part body that can be re-read without side effects.
pub struct PartBuffer {
    sink: Mutex<Box<dyn PartSink>>,
    len: usize,
}

impl PartBuffer {
    /// Wrap a sink holding `len` bytes.
    #[must_use]
    pub fn new(sink: Box<dyn PartSink>, len: usize) -> Self {
        Self {
            sink: Mutex::new(sink),
            len,
        }
    }

    /// Buffer the given bytes in memory.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let len = bytes.len();
        Self::new(Box::new(Cursor::new(bytes)), len)
    }

    /// Size of the body in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true when the body is backed by a temporary file.
    #[must_use]
    pub fn is_spooled(&self) -> bool {
        self.sink.lock().is_spooled()
    }

    /// Read the whole body. Every call returns the same bytes.
    pub fn read_all(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.len);
        self.copy_to(&mut out)?;
        Ok(out)
    }

    /// Stream the whole body into `writer` without materializing it.
    pub fn copy_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<u64> {
        let mut sink = self.sink.lock();
        sink.seek(SeekFrom::Start(0))?;
        let copied = io::copy(&mut *sink, writer);
        sink.seek(SeekFrom::Start(0))?;
        copied
    }
}

impl fmt::Debug for PartBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartBuffer")
            .field("len", &self.len)
            .field("spooled", &self.is_spooled())
            .finish()
    }
}
