// Copyright SymDIVINE Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Timeout-bounded execution of the verification engine.
//!
//! The engine runs as a child in its own process group with a wall-clock
//! deadline on the wait. A run that exceeds the deadline is terminated and
//! reported with `timed_out` set; it is an ordinary, classifiable outcome,
//! not an error.

use std::ffi::OsString;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::debug;
use wait_timeout::ChildExt;

use crate::cleanup::ChildRegistry;
use crate::session::DriverSession;
use crate::util;

/// Which analysis the engine runs on the bitcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisMode {
    Reachability,
    Ltl { property: String },
}

impl AnalysisMode {
    fn engine_args(&self) -> Vec<OsString> {
        match self {
            AnalysisMode::Reachability => vec!["reachability".into()],
            AnalysisMode::Ltl { property } => vec!["ltl".into(), property.into()],
        }
    }
}

/// Everything captured from one engine invocation.
#[derive(Debug)]
pub struct EngineRun {
    pub stdout: String,
    pub stderr: String,
    /// None when the engine was killed by a signal.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub wall_time: Duration,
}

impl EngineRun {
    pub fn combined_output(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// CPU time and peak memory of everything this process has reaped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceUsage {
    pub cpu_seconds: f64,
    pub peak_mem_mib: f64,
}

impl ResourceUsage {
    #[cfg(unix)]
    pub fn of_children() -> ResourceUsage {
        let mut usage = unsafe { std::mem::zeroed::<libc::rusage>() };
        let rc = unsafe { libc::getrusage(libc::RUSAGE_CHILDREN, &mut usage) };
        if rc != 0 {
            return ResourceUsage::default();
        }
        ResourceUsage {
            cpu_seconds: timeval_seconds(&usage.ru_utime) + timeval_seconds(&usage.ru_stime),
            peak_mem_mib: usage.ru_maxrss as f64 / 1024.0,
        }
    }

    #[cfg(not(unix))]
    pub fn of_children() -> ResourceUsage {
        ResourceUsage::default()
    }
}

#[cfg(unix)]
fn timeval_seconds(tv: &libc::timeval) -> f64 {
    tv.tv_sec as f64 + tv.tv_usec as f64 / 1_000_000.0
}

impl DriverSession {
    /// Run the engine on a bitcode artifact and capture its output.
    pub fn run_engine(
        &self,
        mode: &AnalysisMode,
        bitcode: &Path,
        extra_params: &[String],
        timeout: Duration,
    ) -> Result<EngineRun> {
        let symdivine = self.symdivine()?;
        let mut cmd = Command::new(symdivine);
        cmd.args(mode.engine_args());
        cmd.args(extra_params);
        cmd.arg(bitcode);
        if let Some(dir) = self.engine_dir() {
            cmd.env("LD_LIBRARY_PATH", dir);
        }
        if self.verbose {
            println!("{}", util::render_command(&cmd).to_string_lossy());
        }
        run_with_deadline(cmd, timeout, &self.children)
    }
}

/// Spawn `cmd` with piped output and wait for it, at most `timeout`.
pub(crate) fn run_with_deadline(
    mut cmd: Command,
    timeout: Duration,
    children: &ChildRegistry,
) -> Result<EngineRun> {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group, so termination reaches grandchildren too.
        unsafe {
            cmd.pre_exec(|| {
                if libc::setsid() == -1 {
                    libc::setpgid(0, 0);
                }
                Ok(())
            });
        }
    }

    let start = Instant::now();
    let mut child = cmd
        .spawn()
        .with_context(|| format!("Failed to invoke {}", cmd.get_program().to_string_lossy()))?;
    let pid = child.id();
    children.track(pid);

    let timed_out = match child.wait_timeout(timeout).context("Failed waiting for the engine")? {
        Some(_) => false,
        None => {
            debug!(pid, ?timeout, "wall-clock deadline expired");
            children.terminate_one(pid);
            true
        }
    };

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let status = child.wait().context("Failed to reap the engine process")?;
    children.untrack(pid);

    Ok(EngineRun {
        stdout,
        stderr,
        exit_code: status.code(),
        timed_out,
        wall_time: start.elapsed(),
    })
}

fn drain<R: Read>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}
