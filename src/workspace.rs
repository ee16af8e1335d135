// Copyright SymDIVINE Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-run scratch directory.
//!
//! Every run gets a uniquely named temporary directory with a private copy
//! of the benchmark, so concurrent runs on the same host never share
//! state. The directory is removed on every exit path: `destroy` handles
//! the normal flow and `Drop` covers early returns.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::DriverError;

#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
    source: PathBuf,
}

impl Workspace {
    /// Create the directory and copy `benchmark` into it.
    pub fn create(benchmark: &Path) -> Result<Workspace, DriverError> {
        let dir = tempfile::Builder::new().prefix("symdivine.").tempdir().map_err(|err| {
            DriverError::Workspace(format!("cannot create a temporary directory: {err}"))
        })?;

        let Some(name) = benchmark.file_name() else {
            return Err(DriverError::Workspace(format!(
                "'{}' does not name a file",
                benchmark.display()
            )));
        };
        let source = dir.path().join(name);
        fs::copy(benchmark, &source).map_err(|err| {
            DriverError::Workspace(format!(
                "cannot copy '{}' into the workspace: {err}",
                benchmark.display()
            ))
        })?;

        let path = dir.path().to_owned();
        Ok(Workspace { dir: Some(dir), path, source })
    }

    pub fn dir(&self) -> &Path {
        &self.path
    }

    /// The copied benchmark inside the workspace.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Remove the directory tree. Safe to call more than once; a workspace
    /// that is already gone is not an error.
    pub fn destroy(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(err) = dir.close() {
                debug!(?err, "workspace removal failed");
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn benchmark_file(dir: &Path) -> PathBuf {
        let path = dir.join("bench.c");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "int main() {{ return 0; }}").unwrap();
        path
    }

    #[test]
    fn check_create_copies_the_source() {
        let scratch = tempfile::tempdir().unwrap();
        let benchmark = benchmark_file(scratch.path());

        let workspace = Workspace::create(&benchmark).unwrap();
        assert!(workspace.dir().is_dir());
        assert!(workspace.source().is_file());
        assert_eq!(workspace.source().file_name().unwrap(), "bench.c");
        assert_eq!(
            fs::read_to_string(workspace.source()).unwrap(),
            fs::read_to_string(&benchmark).unwrap()
        );
    }

    #[test]
    fn check_destroy_removes_the_directory_and_is_idempotent() {
        let scratch = tempfile::tempdir().unwrap();
        let benchmark = benchmark_file(scratch.path());

        let mut workspace = Workspace::create(&benchmark).unwrap();
        let path = workspace.dir().to_owned();
        assert!(path.exists());

        workspace.destroy();
        assert!(!path.exists());

        // Second destroy of an already-removed workspace must not panic.
        workspace.destroy();
    }

    #[test]
    fn check_drop_removes_the_directory() {
        let scratch = tempfile::tempdir().unwrap();
        let benchmark = benchmark_file(scratch.path());

        let path = {
            let workspace = Workspace::create(&benchmark).unwrap();
            workspace.dir().to_owned()
        };
        assert!(!path.exists());
    }

    #[test]
    fn check_missing_benchmark_is_a_workspace_error() {
        let err = Workspace::create(Path::new("/nonexistent/missing.c")).unwrap_err();
        assert!(matches!(err, DriverError::Workspace(_)));
        assert_eq!(err.exit_code(), 2);
    }
}
