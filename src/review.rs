//! Manual-review log.
//!
//! A CSV file that is truncated and re-headed once per execution, then grows
//! by one row for every plan that needs a human.
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const HEADER: [&str; 4] = ["workspace_id", "run_id", "run_url", "summary"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewEntry {
    pub workspace_id: String,
    pub run_id: String,
    pub run_url: String,
    /// `+A ~C -D`
    pub summary: String,
}

impl ReviewEntry {
    fn fields(&self) -> [&str; 4] {
        [&self.workspace_id, &self.run_id, &self.run_url, &self.summary]
    }
}

#[derive(Debug)]
pub struct ReviewLog {
    path: PathBuf,
}

impl ReviewLog {
    /// Truncate `path` and write the header row.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create review log dir {}", parent.display()))?;
        }
        fs::write(path, csv_line(&HEADER))
            .with_context(|| format!("write review log header {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row. The whole line goes out in a single append write so
    /// concurrent writers never interleave partial rows.
    pub fn record(&self, entry: &ReviewEntry) -> Result<()> {
        let line = csv_line(&entry.fields());
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open review log {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("append review log {}", self.path.display()))?;
        Ok(())
    }
}

fn csv_line(fields: &[&str]) -> String {
    let mut line = fields
        .iter()
        .copied()
        .map(csv_field)
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
#[path = "review_tests.rs"]
mod tests;
