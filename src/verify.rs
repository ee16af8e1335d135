// Copyright SymDIVINE Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-run verification: compile the benchmark in a private workspace,
//! run the engine on it, classify, report, clean up.
//!
//! Whatever happens inside the run, the outcome is reported through the
//! stdout contract below and the workspace is removed before returning.

use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use crate::args::VerifyArgs;
use crate::call_engine::{AnalysisMode, EngineRun, ResourceUsage};
use crate::error::DriverError;
use crate::output_parser::{classify, Verdict};
use crate::pipeline::{build_compile_pipeline, CompileRequest};
use crate::session::DriverSession;
use crate::util;
use crate::witness;
use crate::workspace::Workspace;

// Downstream tooling scrapes these three markers; they must stay stable.
const RESULT_MARKER: &str = "=== RESULT";
const TIME_MARKER: &str = "=== TIME CONSUMED";
const MEMORY_MARKER: &str = "=== MEMORY USAGE";

pub fn run_verify(session: &DriverSession, args: &VerifyArgs) -> Result<ExitCode> {
    let mode = match &args.ltl {
        Some(property) => AnalysisMode::Ltl { property: property.clone() },
        None => AnalysisMode::Reachability,
    };

    let mut workspace = match Workspace::create(&args.benchmark) {
        Ok(workspace) => workspace,
        Err(error) => {
            util::error(&format!("{error:#}"));
            let code = error.exit_code();
            let _ = report_outcome(Verdict::Error);
            return Ok(ExitCode::from(code));
        }
    };

    let (verdict, code) = match run_in_workspace(session, args, &mode, &workspace) {
        Ok(outcome) => outcome,
        Err(error) => {
            util::error(&format!("{error:#}"));
            (Verdict::Error, error_exit_code(&error))
        }
    };

    if let Err(error) = report_outcome(verdict) {
        // The consumer of our output is gone; nothing left to say, but the
        // children and the workspace still have to go.
        debug!(?error, "stdout write failed");
    }

    session.children.terminate_all();
    workspace.destroy();

    Ok(ExitCode::from(code))
}

fn run_in_workspace(
    session: &DriverSession,
    args: &VerifyArgs,
    mode: &AnalysisMode,
    workspace: &Workspace,
) -> Result<(Verdict, u8)> {
    let model = workspace.dir().join("model.ll");
    let request = CompileRequest {
        source: workspace.source(),
        output: &model,
        opt_level: args.compile.opt_level,
        arch: args.compile.arch(),
        fix_inline: args.compile.fix_inline,
        fix_volatile: args.compile.fix_volatile,
        extra_args: &[],
    };

    let steps = build_compile_pipeline(session, &request)?;
    session.run_pipeline(&steps)?;

    let run = session.run_engine(
        mode,
        &model,
        &args.engine_args,
        Duration::from_secs(args.timeout),
    )?;
    debug!(exit_code = ?run.exit_code, timed_out = run.timed_out, "engine finished");

    let verdict = classify(mode, &run.stdout, &run.stderr, run.exit_code, run.timed_out);
    echo_engine_output(session, verdict, &run);

    if matches!(verdict, Verdict::True | Verdict::False) {
        if let Err(error) = witness::write_witness(verdict, &args.benchmark, args.compile.arch()) {
            util::warning(&format!("{error:#}"));
        }
    }

    let code = match verdict {
        Verdict::Error => engine_exit_code(&run),
        _ => 0,
    };
    Ok((verdict, code))
}

fn echo_engine_output(session: &DriverSession, verdict: Verdict, run: &EngineRun) {
    if session.verbose {
        if !run.stdout.is_empty() {
            print!("{}", run.stdout);
        }
        if !run.stderr.is_empty() {
            eprint!("{}", run.stderr);
        }
    } else if verdict == Verdict::Error && !run.stderr.is_empty() {
        eprint!("{}", run.stderr);
    }
}

/// A nonzero engine exit propagates; anything unrepresentable becomes 1.
fn engine_exit_code(run: &EngineRun) -> u8 {
    run.exit_code
        .and_then(|code| u8::try_from(code).ok())
        .filter(|code| *code != 0)
        .unwrap_or(1)
}

fn error_exit_code(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<DriverError>() {
        Some(driver_error) => driver_error.exit_code(),
        None => 2,
    }
}

/// The stdout contract: verdict first, then resource usage of everything
/// the run spawned.
fn report_outcome(verdict: Verdict) -> io::Result<()> {
    let usage = ResourceUsage::of_children();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{RESULT_MARKER}")?;
    writeln!(out, "{verdict}")?;
    writeln!(out, "{TIME_MARKER}")?;
    writeln!(out, "{}", usage.cpu_seconds)?;
    writeln!(out, "{MEMORY_MARKER}")?;
    writeln!(out, "{}", usage.peak_mem_mib)?;
    out.flush()
}
