//! Tab-separated plot files of monitor samples.
//!
//! Each daemon run writes into its own `momplot-NNN` session directory; each
//! monitor appends to `<name>.dat` inside it.

use crate::entity::Sample;
use chrono::Utc;
use lazy_static::lazy_static;
use mom_policy::Value;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const MAX_SESSIONS: u32 = 1000;

lazy_static! {
    static ref SESSION_DIR: Regex = Regex::new(r"^momplot-(\d{3})$").unwrap();
}

pub struct Plotter {
    path: PathBuf,
    file: File,
    fields: Vec<String>,
}

impl Plotter {
    /// Creates the session directory numbered one past the highest existing
    /// one under `base`.
    pub fn create_session_dir(base: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(base)?;
        let mut next = 0;
        for entry in fs::read_dir(base)? {
            let name = entry?.file_name();
            let Some(caps) = name.to_str().and_then(|n| SESSION_DIR.captures(n)) else {
                continue;
            };
            if let Ok(n) = caps[1].parse::<u32>() {
                next = next.max(n + 1);
            }
        }
        if next >= MAX_SESSIONS {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("no free plot session directory in {}", base.display()),
            ));
        }
        let dir = base.join(format!("momplot-{:03}", next));
        fs::create_dir(&dir)?;
        Ok(dir)
    }

    pub fn open(dir: &Path, name: &str) -> io::Result<Self> {
        let path = dir.join(format!("{}.dat", name));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Plotter {
            path,
            file,
            fields: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fixes the column order and writes the header line.
    pub fn set_fields(&mut self, fields: &BTreeSet<String>) -> io::Result<()> {
        self.fields = fields.iter().cloned().collect();
        writeln!(self.file, "# time\t {}", self.fields.join("\t "))?;
        self.file.flush()
    }

    pub fn plot(&mut self, sample: &Sample) -> io::Result<()> {
        let now = Utc::now().timestamp_millis() as f64 / 1000.0;
        let mut line = format!("{}", now);
        for field in &self.fields {
            match sample.get(field) {
                Some(value) => {
                    line.push('\t');
                    match value {
                        Value::String(s) => line.push_str(s),
                        other => line.push_str(&other.to_string()),
                    }
                }
                None => {
                    line = format!("# {} Incomplete data set", now);
                    break;
                }
            }
        }
        writeln!(self.file, "{}", line)?;
        self.file.flush()
    }
}
