//! Line-oriented run log.
//!
//! Every metric and progress line of a run is mirrored to stdout and
//! appended to `<run_dir>/log.txt`. The file starts with the resolved
//! configuration so a run can be reproduced from its log alone.

use std::fs::{self, File};
use std::io::{BufWriter, Result, Write};
use std::path::{Path, PathBuf};

/// Log sink for one run.
pub struct Logger {
    file: BufWriter<File>,
    path: PathBuf,
}

impl Logger {
    /// Create `<dir>/log.txt`, truncating any previous run, and write the
    /// header block.
    pub fn create(dir: &Path, header: &str) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join("log.txt");
        let mut logger = Self {
            file: BufWriter::new(File::create(&path)?),
            path,
        };
        for line in header.lines() {
            logger.write(line);
        }
        logger.write("");
        Ok(logger)
    }

    /// Append one line, echoing it to stdout. File errors are reported once
    /// on stderr rather than aborting the run.
    pub fn write(&mut self, line: &str) {
        println!("{}", line);
        if let Err(e) = writeln!(self.file, "{}", line) {
            eprintln!("warning: failed to write {}: {}", self.path.display(), e);
        }
    }

    /// Flush buffered lines to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()
    }
}
