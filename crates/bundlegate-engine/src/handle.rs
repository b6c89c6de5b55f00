//! Readable handle over an extracted payload
//!
//! Where the platform lets an open file outlive its directory entry, the
//! handle is the staged file itself, already unlinked. Elsewhere the payload
//! is read into memory before the staged file is removed. Either way no
//! staging entry exists once the handle is returned.

use crate::staging::StagedPath;
use bundlegate_core::errors::io_error;
use bundlegate_core::Result;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

#[derive(Debug)]
enum Source {
    File(File),
    Memory(Cursor<Vec<u8>>),
}

#[derive(Debug)]
pub struct PayloadHandle {
    source: Source,
    len: u64,
}

impl PayloadHandle {
    /// Turn a freshly extracted staging file into a handle
    pub(crate) fn from_staged(staged: StagedPath) -> Result<Self> {
        if cfg!(unix) {
            Self::open_unlinked(staged)
        } else {
            Self::read_then_remove(staged)
        }
    }

    /// Open read-only, then remove the directory entry
    pub(crate) fn open_unlinked(staged: StagedPath) -> Result<Self> {
        let file = File::open(staged.path()).map_err(|e| io_error("open_staged_payload", e))?;
        let len = file
            .metadata()
            .map_err(|e| io_error("stat_staged_payload", e))?
            .len();
        staged.remove()?;
        Ok(Self {
            source: Source::File(file),
            len,
        })
    }

    /// Read fully, then remove the file
    pub(crate) fn read_then_remove(staged: StagedPath) -> Result<Self> {
        let bytes = std::fs::read(staged.path()).map_err(|e| io_error("read_staged_payload", e))?;
        staged.remove()?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            len: bytes.len() as u64,
            source: Source::Memory(Cursor::new(bytes)),
        }
    }

    /// Payload size in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the handle reads from an unlinked file rather than memory
    pub fn is_file_backed(&self) -> bool {
        matches!(self.source, Source::File(_))
    }

    /// Read the remaining payload into a vector
    pub fn read_all(mut self) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.len as usize);
        self.read_to_end(&mut out)?;
        Ok(out)
    }
}

impl Read for PayloadHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.source {
            Source::File(f) => f.read(buf),
            Source::Memory(c) => c.read(buf),
        }
    }
}

impl Seek for PayloadHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.source {
            Source::File(f) => f.seek(pos),
            Source::Memory(c) => c.seek(pos),
        }
    }
}
