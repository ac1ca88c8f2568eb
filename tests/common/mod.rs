//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;

/// A model tree written to a temporary directory
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write `contents` to `relative`, creating directories as needed
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture dir");
        }
        fs::write(&path, contents).expect("write fixture");
        path
    }

    pub fn with(self, relative: &str, contents: &str) -> Self {
        self.write(relative, contents);
        self
    }
}

/// Data layer with a single fixed output
pub const DATA: &str = r#"layer {
  name: "data"
  type: "Input"
  top: "data"
}
"#;

/// Convolution consuming the first input
pub const CONV: &str = r#"layer {
  name: "conv"
  type: "Convolution"
  bottom: "[INPUT]"
  top: "conv"
  convolution_param {
    num_output: [NUM]
    kernel_size: [KERNEL:3]
  }
}
"#;

/// Fixed timestamp for rendered headers
pub fn timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .and_then(|d| d.and_hms_opt(3, 4, 0))
        .expect("valid timestamp")
}

/// Lines of `text` that contain `needle`, trimmed
pub fn lines_with<'a>(text: &'a str, needle: &str) -> Vec<&'a str> {
    text.lines()
        .filter(|line| line.contains(needle))
        .map(str::trim)
        .collect()
}
