//! Frame sink that stores exported frames in a directory.

use skyburst::export::decode_data_url;
use skyburst::{ExportError, ExportMessage, ExportReply, FrameSink};
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes every `request-save` message into a directory and answers with a
/// `saved` reply.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    replies: VecDeque<String>,
    written: usize,
}

impl DirectorySink {
    /// Create the directory if needed and write frames into it.
    pub fn create(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            replies: VecDeque::new(),
            written: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Frames written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    fn store(&mut self, payload: &str) -> Result<String, ExportError> {
        let ExportMessage::RequestSave { filename, image } = serde_json::from_str::<ExportMessage>(payload)?;

        // Frames may only land directly inside the directory.
        if Path::new(&filename).file_name().and_then(|n| n.to_str()) != Some(filename.as_str()) {
            return Err(ExportError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to write outside the output directory: {filename}"),
            )));
        }

        let bytes = decode_data_url(&image)?;
        fs::write(self.dir.join(&filename), bytes)?;
        self.written += 1;
        log::debug!("Saved {filename} ({} frames so far)", self.written);
        Ok(filename)
    }
}

impl FrameSink for DirectorySink {
    fn is_ready(&self) -> bool {
        true
    }

    fn send(&mut self, payload: String) -> Result<(), ExportError> {
        let filename = self.store(&payload)?;
        let reply = serde_json::to_string(&ExportReply::Saved { filename })?;
        self.replies.push_back(reply);
        Ok(())
    }

    fn poll_reply(&mut self) -> Option<String> {
        self.replies.pop_front()
    }
}
