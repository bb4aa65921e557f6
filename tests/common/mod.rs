//! Shared fixtures for integration tests
//!
//! [`FakeConverter`] stands in for `converter_pix`: instead of decoding archives it
//! writes a scripted set of files into the destination and records every invocation.

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use scs_packer::services::{Converter, ConverterInvocation, ExtractionError};
use std::fs;
use std::future::Future;
use std::sync::Mutex;
use tempfile::TempDir;

pub struct FakeConverter {
    calls: Mutex<Vec<ConverterInvocation>>,
    files: Vec<(String, String)>,
    version: Option<String>,
    broken_archives: Vec<String>,
}

impl FakeConverter {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            files: Vec::new(),
            version: None,
            broken_archives: Vec::new(),
        }
    }

    /// Write `relative` under the destination whenever `subpath` is requested
    pub fn with_file(mut self, subpath: &str, relative: &str) -> Self {
        self.files.push((subpath.to_string(), relative.to_string()));
        self
    }

    /// Answer full extractions with a `version.sii` carrying `version`
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Fail every invocation for `archive_name` as if the converter could not start
    pub fn breaking(mut self, archive_name: &str) -> Self {
        self.broken_archives.push(archive_name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ConverterInvocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn subpaths_for(&self, archive_name: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.archive.file_name() == Some(archive_name))
            .map(|c| c.subpath)
            .collect()
    }

    fn simulate(&self, invocation: &ConverterInvocation) -> Result<i32, ExtractionError> {
        self.calls.lock().unwrap().push(invocation.clone());

        let archive_name = invocation.archive.file_name().unwrap_or_default();
        if self.broken_archives.iter().any(|b| b == archive_name) {
            return Err(ExtractionError::Spawn {
                exe: "fake_converter".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "fake failure"),
            });
        }

        if invocation.subpath == "/" {
            return match &self.version {
                Some(version) => {
                    fs::write(
                        invocation.destination.join("version.sii"),
                        format!("SiiNunit\n{{\nversion_info : .version {{\n version: \"{}\"\n}}\n}}\n", version),
                    )
                    .unwrap();
                    Ok(0)
                }
                None => Ok(1),
            };
        }

        for (subpath, relative) in &self.files {
            if *subpath == invocation.subpath {
                write_file(&invocation.destination.join(relative), relative);
            }
        }

        Ok(0)
    }
}

impl Converter for FakeConverter {
    fn run(
        &self,
        invocation: &ConverterInvocation,
    ) -> impl Future<Output = Result<i32, ExtractionError>> + Send {
        let result = self.simulate(invocation);
        async move { result }
    }
}

/// Temp directory plus its UTF-8 path
pub fn utf8_temp_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, path)
}

pub fn write_file(path: &Utf8Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Every file under `root` as (relative `/` path, content), sorted
pub fn snapshot(root: &Utf8Path) -> Vec<(String, String)> {
    let mut files: Vec<(String, String)> = walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(root.as_std_path()).unwrap();
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_str().unwrap().to_string())
                .collect::<Vec<_>>()
                .join("/");
            (name, fs::read_to_string(e.path()).unwrap())
        })
        .collect();
    files.sort();
    files
}
