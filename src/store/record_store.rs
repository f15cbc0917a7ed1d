//! Record Store implementation
//!
//! Buffered appends and flushed positional reads behind a single lock.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{LogError, Result};

use super::{FrameScan, LEN_WIDTH};

/// Append-only store of length-prefixed records
///
/// ## Concurrency:
/// - One `Mutex` guards the buffered writer, the file cursor and `size`
/// - `append`, `read` and `read_at` never interleave, so a reader can
///   not observe half of a frame
/// - All methods use `&self`; share across threads with `Arc`
pub struct RecordStore {
    /// Backing file path (also used to name the store)
    path: PathBuf,

    /// Writer, file and logical size; only ever touched under the lock
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    /// Buffered writer over the file opened in append mode.
    /// Writes always land at the end of file, whatever the read cursor.
    writer: BufWriter<File>,

    /// Logical length: sum of all frames, including still-buffered ones
    size: u64,

    /// Set when a failed append could not be rolled back
    failed: bool,
}

impl RecordStore {
    /// Open or create a store file
    ///
    /// The size is taken from the file on disk, so reopening after a
    /// restart picks up every frame flushed before it.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let size = file.metadata()?.len();

        tracing::debug!(path = %path.display(), size, "opened record store");

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(StoreInner {
                writer: BufWriter::new(file),
                size,
                failed: false,
            }),
        })
    }

    /// Append one payload as a frame
    ///
    /// Returns `(bytes_written, position)` where `bytes_written` is
    /// `8 + payload.len()` and `position` is where the frame starts.
    /// Buffered: durable only after `read`, `close` or another flush.
    ///
    /// A failed write is rolled back to the previous end of the store, so the
    /// next frame starts at the returned position. If the rollback itself
    /// fails, the store refuses further appends with `StoreFailed`.
    pub fn append(&self, payload: &[u8]) -> Result<(u64, u64)> {
        let mut inner = self.inner.lock();
        if inner.failed {
            return Err(LogError::StoreFailed(self.path.display().to_string()));
        }
        let position = inner.size;

        if let Err(e) = write_frame(&mut inner.writer, payload) {
            if let Err(rollback_err) = roll_back(&mut inner, position) {
                tracing::error!(
                    path = %self.path.display(),
                    position,
                    error = %rollback_err,
                    "could not roll back failed append, refusing further appends"
                );
                inner.failed = true;
            } else {
                tracing::warn!(path = %self.path.display(), position, error = %e, "rolled back failed append");
            }
            return Err(e.into());
        }

        let written = LEN_WIDTH + payload.len() as u64;
        inner.size += written;

        tracing::trace!(position, written, "appended frame");
        Ok((written, position))
    }

    /// Read the payload of the frame starting at `position`
    ///
    /// Returns `StoreEof` if the length prefix or the payload would run past
    /// the written size.
    pub fn read(&self, position: u64) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;
        let size = inner.size;
        let eof = || LogError::StoreEof { position, size };

        // Step 1: length prefix
        match position.checked_add(LEN_WIDTH) {
            Some(end) if end <= size => {}
            _ => return Err(eof()),
        }
        let mut len_buf = [0u8; LEN_WIDTH as usize];
        read_exact_at(inner.writer.get_mut(), &mut len_buf, position).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                eof()
            } else {
                e.into()
            }
        })?;
        let len = u64::from_be_bytes(len_buf);

        // Step 2: payload, bounds-checked before allocating
        let start = position + LEN_WIDTH;
        match start.checked_add(len) {
            Some(end) if end <= size => {}
            _ => return Err(eof()),
        }
        let mut payload = vec![0u8; len as usize];
        read_exact_at(inner.writer.get_mut(), &mut payload, start).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                eof()
            } else {
                e.into()
            }
        })?;

        Ok(payload)
    }

    /// Positional read of raw bytes into `buf`
    ///
    /// Fills `buf` and returns its length. Returns `StoreEof` when the end
    /// of the file comes before `buf` is full.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;
        let size = inner.size;

        let file = inner.writer.get_mut();
        file.seek(SeekFrom::Start(offset))?;

        let mut read = 0;
        while read < buf.len() {
            match file.read(&mut buf[read..]) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if read < buf.len() {
            return Err(LogError::StoreEof {
                position: offset,
                size,
            });
        }
        Ok(read)
    }

    /// Walk every frame from the start of the file
    ///
    /// Stops at the first frame whose length prefix or payload is cut short.
    /// Used to rebuild an index after an unclean shutdown.
    pub fn scan_frames(&self) -> Result<FrameScan> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;
        let size = inner.size;

        let mut reader = BufReader::new(inner.writer.get_ref().try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut positions = Vec::new();
        let mut position = 0u64;
        let mut len_buf = [0u8; LEN_WIDTH as usize];

        while position + LEN_WIDTH <= size {
            reader.read_exact(&mut len_buf)?;
            let len = u64::from_be_bytes(len_buf);

            let end = match (position + LEN_WIDTH).checked_add(len) {
                Some(end) if end <= size => end,
                _ => break,
            };
            reader.seek_relative(len as i64)?;

            positions.push(position);
            position = end;
        }

        Ok(FrameScan {
            positions,
            valid_len: position,
            torn_bytes: size - position,
        })
    }

    /// Cut the file down to `len` bytes
    ///
    /// Only for controlled rebuilds, e.g. dropping a torn trailing frame.
    pub fn truncate(&self, len: u64) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;
        if len > inner.size {
            return Err(LogError::StoreEof {
                position: len,
                size: inner.size,
            });
        }

        let file = inner.writer.get_mut();
        file.set_len(len)?;
        file.sync_all()?;
        tracing::warn!(path = %self.path.display(), from = inner.size, to = len, "truncated record store");
        inner.size = len;
        Ok(())
    }

    /// Current logical size in bytes, buffered frames included
    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    /// Path of the backing file
    pub fn name(&self) -> &Path {
        &self.path
    }

    /// Flush buffered frames, fsync, and close the file
    pub fn close(self) -> Result<()> {
        let inner = self.inner.into_inner();
        let file = inner
            .writer
            .into_inner()
            .map_err(|e| LogError::Io(e.into_error()))?;
        file.sync_all()?;

        tracing::debug!(path = %self.path.display(), size = inner.size, "closed record store");
        Ok(())
    }
}

/// Length prefix then payload
fn write_frame(writer: &mut BufWriter<File>, payload: &[u8]) -> io::Result<()> {
    writer.write_all(&(payload.len() as u64).to_be_bytes())?;
    writer.write_all(payload)
}

/// Bring the file back to exactly `position` bytes after a failed append
///
/// The buffered writer is swapped for an empty one without flushing it. Of
/// the bytes it held, only those that belong below `position` (earlier,
/// unflushed frames) are written out; anything already flushed past
/// `position` is cut off.
fn roll_back(inner: &mut StoreInner, position: u64) -> io::Result<()> {
    let fresh = BufWriter::new(inner.writer.get_ref().try_clone()?);
    let (mut file, buffered) = std::mem::replace(&mut inner.writer, fresh).into_parts();
    let buffered = buffered.unwrap_or_default();

    let flushed = file.metadata()?.len();
    if flushed > position {
        file.set_len(position)?;
    } else if flushed < position {
        let missing = (position - flushed) as usize;
        let pending = buffered.get(..missing).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                "buffered bytes do not cover the store size",
            )
        })?;
        file.write_all(pending)?;
    }
    Ok(())
}

/// Seek-then-read of exactly `buf.len()` bytes
fn read_exact_at(file: &mut File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(buf)
}
