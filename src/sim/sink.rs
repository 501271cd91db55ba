//! Per-game result persistence.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};
use tracing::{debug, warn};

use crate::game::GameResult;

/// Receives every finished game of a batch, on the collector thread.
pub trait ResultSink: Send {
    /// Persist game `id`.
    ///
    /// # Errors
    ///
    /// Any I/O failure. The batch logs it and carries on.
    fn write(&mut self, id: u64, game: &GameResult) -> io::Result<()>;

    /// Flush everything. Called once after the last result.
    ///
    /// # Errors
    ///
    /// Any I/O failure, including a deferred one from an earlier write.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes `game_<id>.json` files into a directory from a background
/// thread, so the collector never waits on the filesystem.
#[derive(Debug)]
pub struct JsonDirSink {
    dir: PathBuf,
    tx: Option<Sender<(u64, GameResult)>>,
    writer: Option<JoinHandle<io::Result<u64>>>,
}

impl JsonDirSink {
    /// Create `dir` if needed and start the writer thread.
    ///
    /// # Errors
    ///
    /// If the directory cannot be created or the thread cannot start.
    pub fn create(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let (tx, rx) = unbounded::<(u64, GameResult)>();
        let target = dir.clone();
        let writer = thread::Builder::new().name("result-writer".to_string()).spawn(move || {
            let mut written: u64 = 0;
            let mut first_error = None;
            for (id, game) in rx {
                match write_game(&target, id, &game) {
                    Ok(()) => written += 1,
                    Err(e) => {
                        warn!(id, error = %e, "failed to write game result");
                        first_error.get_or_insert(e);
                    }
                }
            }
            first_error.map_or(Ok(written), Err)
        })?;
        Ok(Self {
            dir,
            tx: Some(tx),
            writer: Some(writer),
        })
    }

    /// Directory the files go to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// File name for game `id`.
#[must_use]
pub fn game_file_name(id: u64) -> String {
    format!("game_{id:06}.json")
}

fn write_game(dir: &Path, id: u64, game: &GameResult) -> io::Result<()> {
    let file = File::create(dir.join(game_file_name(id)))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, game)?;
    out.flush()
}

impl ResultSink for JsonDirSink {
    fn write(&mut self, id: u64, game: &GameResult) -> io::Result<()> {
        let Some(tx) = &self.tx else {
            return Err(io::Error::other("result sink already finished"));
        };
        tx.send((id, game.clone()))
            .map_err(|_| io::Error::other("result writer thread stopped"))
    }

    fn finish(&mut self) -> io::Result<()> {
        drop(self.tx.take());
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        let written = writer
            .join()
            .map_err(|_| io::Error::other("result writer thread panicked"))??;
        debug!(written, dir = %self.dir.display(), "game results written");
        Ok(())
    }
}

impl Drop for JsonDirSink {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!(error = %e, "result sink did not finish cleanly");
        }
    }
}
