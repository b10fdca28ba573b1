//! Trace directory and streaming log file
//!
//! One run gets one directory named `<base>-<n>`, the first suffix that does
//! not already exist. Inside it live `log.json` (a single JSON array of launch
//! records, opened once and closed once) and one plain-text source dump per
//! launch, named `<entry>.<n>.cl` with the smallest free disambiguator so an
//! existing dump is never overwritten.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::encoder::LaunchTrace;
use crate::error::{Result, TraceError};

/// Log file name inside the trace directory.
pub const LOG_FILE: &str = "log.json";

/// Extension for per-launch kernel source dumps.
pub const SOURCE_EXT: &str = "cl";

/// Default trace directory base name (the run directory becomes
/// `testigo-<n>`).
pub const DEFAULT_BASE: &str = "testigo";

/// Cap on directory and dump-file name probing.
const MAX_NAME_PROBES: usize = 10_000;

/// The open trace log for one run.
///
/// Held open for the tracer's whole lifetime; [`close`](TraceLog::close)
/// terminates the JSON array exactly once. `Drop` closes as a backstop, but an
/// explicit close is the only way to observe a write failure at teardown.
#[derive(Debug)]
pub struct TraceLog {
    directory: PathBuf,
    log: BufWriter<File>,
    wrote_element: bool,
    closed: bool,
}

impl TraceLog {
    /// Create the run directory and open its log file.
    ///
    /// Probes `<base>-0`, `<base>-1`, ... and takes the first directory that
    /// can be created. A directory that already exists moves probing along;
    /// any other creation failure, or running out of candidate names, is an
    /// error (fatal at the boundary).
    pub fn create(base: impl AsRef<Path>) -> Result<Self> {
        let base = base.as_ref();
        let directory = Self::claim_directory(base)?;

        let path = directory.join(LOG_FILE);
        let file = File::create(&path)?;
        let mut log = BufWriter::new(file);
        // Start of the JSON array; flushed so the file is observably open
        // even if the process aborts before the first launch
        log.write_all(b"[\n")?;
        log.flush()?;

        Ok(TraceLog {
            directory,
            log,
            wrote_element: false,
            closed: false,
        })
    }

    fn claim_directory(base: &Path) -> Result<PathBuf> {
        for n in 0..MAX_NAME_PROBES {
            let candidate = PathBuf::from(format!("{}-{}", base.display(), n));
            match fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(TraceError::TraceDirExhausted {
            base: base.display().to_string(),
        })
    }

    /// Directory this run's log and source dumps live in.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Append one launch record as the next element of the array.
    ///
    /// Flushed per element: a later fatal abort exits without running `Drop`,
    /// and a record that reached the log must survive it.
    pub fn append(&mut self, trace: &LaunchTrace) -> Result<()> {
        let element = serde_json::to_string_pretty(trace)?;
        if self.wrote_element {
            self.log.write_all(b",\n")?;
        }
        self.log.write_all(element.as_bytes())?;
        self.log.flush()?;
        self.wrote_element = true;
        Ok(())
    }

    /// Write the source dump for one launch and return its file name
    /// (relative to the trace directory, as referenced from the log).
    ///
    /// The dump is the concatenation of `sources` in their original order,
    /// written fresh on every launch so each record's source reference stays
    /// immutable even if the program is later rebuilt.
    pub fn dump_kernel_source(&self, entry_point: &str, sources: &[Vec<u8>]) -> Result<String> {
        for n in 0..MAX_NAME_PROBES {
            let name = format!("{entry_point}.{n}.{SOURCE_EXT}");
            let path = self.directory.join(&name);
            // create_new also covers a file appearing between probe and open
            let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            };
            let mut writer = BufWriter::new(file);
            for unit in sources {
                writer.write_all(unit)?;
            }
            writer.flush()?;
            return Ok(name);
        }
        Err(TraceError::DumpNameExhausted {
            entry_point: entry_point.to_string(),
        })
    }

    /// Terminate the JSON array and flush. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // End of the JSON array
        self.log.write_all(b"\n]\n")?;
        self.log.flush()?;
        Ok(())
    }
}

impl Drop for TraceLog {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::error!("failed to close trace log at drop: {err}");
        }
    }
}
