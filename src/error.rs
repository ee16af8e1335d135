// Copyright SymDIVINE Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use thiserror::Error;

/// Failures that decide the driver's exit status.
///
/// Engine timeouts and unrecognized engine output are not errors: they are
/// classified into a verdict and reported through the normal output
/// contract.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Tempdir creation or the benchmark copy failed before any external
    /// tool ran.
    #[error("workspace setup failed: {0}")]
    Workspace(String),

    /// One of the compile/transform steps exited with a failure. The label
    /// names the phase, e.g. "Compilation failed".
    #[error("{label}")]
    Pipeline { label: &'static str },
}

impl DriverError {
    pub fn exit_code(&self) -> u8 {
        match self {
            DriverError::Workspace(_) => 2,
            DriverError::Pipeline { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_exit_codes() {
        assert_eq!(DriverError::Workspace("no tempdir".into()).exit_code(), 2);
        assert_eq!(DriverError::Pipeline { label: "Compilation failed" }.exit_code(), 1);
    }

    #[test]
    fn check_pipeline_message_is_the_label() {
        let err = DriverError::Pipeline { label: "Transformation failed" };
        assert_eq!(err.to_string(), "Transformation failed");
    }
}
