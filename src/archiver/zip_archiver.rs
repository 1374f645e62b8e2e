//! Reference archiver backend: a deflate-compressed ZIP container whose
//! member names equal the computed alias (§6 archive wire-contract).

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::archiver::{Archiver, ArchiverFactory};
use crate::error::ArchiveError;

enum State {
    Closed,
    Open { writer: ZipWriter<File>, path: PathBuf },
}

pub struct ZipArchiver {
    state: State,
}

impl ZipArchiver {
    pub fn new() -> Self {
        ZipArchiver { state: State::Closed }
    }
}

impl Default for ZipArchiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Archiver for ZipArchiver {
    fn provide(&mut self, location: &Path, name: &str) -> Result<(), ArchiveError> {
        if matches!(self.state, State::Open { .. }) {
            return Err(ArchiveError::AlreadyOpen);
        }
        let path = location.join(format!("{name}.zip"));
        let file = File::create(&path)?;
        let writer = ZipWriter::new(file);
        self.state = State::Open { writer, path };
        Ok(())
    }

    fn store_file(&mut self, source_path: &Path, alias: &str) -> Result<(), ArchiveError> {
        let writer = match &mut self.state {
            State::Open { writer, .. } => writer,
            State::Closed => return Err(ArchiveError::NotOpen),
        };
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        writer.start_file(alias, options)?;
        let mut source = File::open(source_path)?;
        io::copy(&mut source, writer)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), ArchiveError> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Open { mut writer, .. } => {
                writer.finish()?;
                Ok(())
            }
            State::Closed => Err(ArchiveError::NotOpen),
        }
    }
}

pub struct ZipArchiverFactory;

impl ArchiverFactory for ZipArchiverFactory {
    fn new_archiver(&self) -> Box<dyn Archiver> {
        Box::new(ZipArchiver::new())
    }
}
