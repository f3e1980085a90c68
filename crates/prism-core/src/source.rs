//! Line-delimited location list source.
//!
//! The input collaborator: turns a text file with one image location per
//! line into the bounded location stream the pipeline consumes. Blank lines
//! are skipped; surrounding whitespace is trimmed.

use std::path::PathBuf;

use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// A location list backed by a file on disk.
#[derive(Debug)]
pub struct LocationSource {
    path: PathBuf,
}

impl LocationSource {
    /// Open a source file. A missing file is a construction error, reported
    /// before the pipeline starts.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("location list {} not found", path.display()),
            )
            .into());
        }
        Ok(Self { path })
    }

    /// Stream locations into a bounded channel, one per non-blank line.
    ///
    /// The reader task honors the cancellation token at both the read and
    /// the send, so an unread channel never wedges shutdown. Read errors end
    /// the stream early with a log line; lines already sent stand.
    pub fn stream(self, buffer: usize, cancel: CancellationToken) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(buffer);

        tokio::spawn(async move {
            let file = match tokio::fs::File::open(&self.path).await {
                Ok(file) => file,
                Err(e) => {
                    tracing::error!("Cannot open location list {}: {e}", self.path.display());
                    return;
                }
            };
            let mut lines = tokio::io::BufReader::new(file).lines();

            loop {
                let line = tokio::select! {
                    _ = cancel.cancelled() => break,
                    next = lines.next_line() => match next {
                        Ok(Some(line)) => line,
                        Ok(None) => break,
                        Err(e) => {
                            tracing::error!(
                                "Cannot read location list {}: {e}",
                                self.path.display()
                            );
                            break;
                        }
                    },
                };

                let location = line.trim();
                if location.is_empty() {
                    continue;
                }
                let location = location.to_string();

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = tx.send(location) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        rx
    }
}
