// Copyright SymDIVINE Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Construction and execution of the bitcode compilation pipeline.
//!
//! A benchmark is compiled either in one step, or, when the volatile fix
//! is requested, in three: an unoptimized first-phase compile, the LART
//! `main-volatilize` rewrite in place, and a second-phase recompile with
//! the requested optimization restored. Steps run in order and the first
//! failure aborts the rest.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use tracing::debug;

use crate::args::{Arch, CompileAllArgs, CompileArgs, OptLevel};
use crate::error::DriverError;
use crate::session::DriverSession;
use crate::util;

/// One external invocation of the compilation pipeline.
pub struct PipelineStep {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// The artifact this step is expected to produce or rewrite.
    pub output: PathBuf,
    /// Phase name reported when the step fails.
    pub label: &'static str,
}

/// Everything the builder needs to know about one compilation.
pub struct CompileRequest<'a> {
    pub source: &'a Path,
    pub output: &'a Path,
    pub opt_level: OptLevel,
    pub arch: Arch,
    pub fix_inline: bool,
    pub fix_volatile: bool,
    pub extra_args: &'a [String],
}

pub fn build_compile_pipeline(
    session: &DriverSession,
    request: &CompileRequest,
) -> Result<Vec<PipelineStep>> {
    let compiler = session.compiler_for(request.source).to_owned();

    if !request.fix_volatile {
        let mut args = vec![request.opt_level.flag().into()];
        args.extend(base_compiler_args(request));
        return Ok(vec![clang_step(
            &compiler,
            "-S",
            args,
            request.output,
            request.source,
            "Compilation failed",
        )]);
    }

    let lart = session.lart()?;

    // First phase runs without the optimization flag so LART sees the
    // unoptimized globals; the requested level is restored afterwards.
    let unoptimized = base_compiler_args(request);
    let mut optimized = vec![OsString::from(request.opt_level.flag())];
    optimized.extend(base_compiler_args(request));

    Ok(vec![
        clang_step(
            &compiler,
            "-c",
            unoptimized,
            request.output,
            request.source,
            "First phase compilation failed",
        ),
        PipelineStep {
            program: lart,
            args: vec![
                request.output.into(),
                request.output.into(),
                OsString::from("main-volatilize"),
            ],
            output: request.output.to_owned(),
            label: "Transformation failed",
        },
        clang_step(
            &compiler,
            "-S",
            optimized,
            request.output,
            request.output,
            "Second phase compilation failed",
        ),
    ])
}

fn base_compiler_args(request: &CompileRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    if request.fix_inline {
        args.push("-fno-inline".into());
    }
    args.push(request.arch.flag().into());
    args.push("-emit-llvm".into());
    args.push("-fgnu89-inline".into());
    args.extend(request.extra_args.iter().map(OsString::from));
    args
}

fn clang_step(
    compiler: &Path,
    emit: &str,
    mut args: Vec<OsString>,
    output: &Path,
    input: &Path,
    label: &'static str,
) -> PipelineStep {
    let mut full: Vec<OsString> = vec![emit.into()];
    full.append(&mut args);
    full.push("-o".into());
    full.push(output.into());
    full.push(input.into());
    PipelineStep { program: compiler.to_owned(), args: full, output: output.to_owned(), label }
}

impl DriverSession {
    /// Runs the steps in order, stopping at the first failure. No step is
    /// retried.
    pub fn run_pipeline(&self, steps: &[PipelineStep]) -> Result<(), DriverError> {
        for step in steps {
            self.run_step(step)?;
        }
        Ok(())
    }

    fn run_step(&self, step: &PipelineStep) -> Result<(), DriverError> {
        let mut cmd = Command::new(&step.program);
        cmd.args(&step.args);
        if self.silent {
            cmd.stderr(Stdio::null());
        } else {
            println!("{}", util::render_command(&cmd).to_string_lossy());
        }

        match cmd.status() {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => {
                debug!(?status, label = step.label, "pipeline step failed");
                Err(DriverError::Pipeline { label: step.label })
            }
            Err(err) => {
                debug!(?err, label = step.label, "pipeline step failed to start");
                Err(DriverError::Pipeline { label: step.label })
            }
        }
    }
}

/// The `compile` subcommand: one benchmark, compiled in place.
pub fn compile_single(session: &DriverSession, args: &CompileArgs) -> Result<()> {
    let output = args.output.clone().unwrap_or_else(|| args.source.with_extension("ll"));
    let request = CompileRequest {
        source: &args.source,
        output: &output,
        opt_level: args.compile.opt_level,
        arch: args.compile.arch(),
        fix_inline: args.compile.fix_inline,
        fix_volatile: args.compile.fix_volatile,
        extra_args: &[],
    };
    let steps = build_compile_pipeline(session, &request)?;
    session.run_pipeline(&steps)?;
    Ok(())
}

/// The `compile-all` subcommand: every benchmark under a directory, at
/// -O0, -O2 and -Os. The first failing compile aborts the walk.
pub fn compile_all(session: &DriverSession, args: &CompileAllArgs) -> Result<()> {
    let arch = if args.m64 { Arch::Bits64 } else { Arch::Bits32 };
    for source in collect_sources(&args.dir)? {
        for (opt_level, tag) in
            [(OptLevel::O0, "_o0"), (OptLevel::O2, "_o2"), (OptLevel::Os, "_os")]
        {
            let output = util::suffixed_bitcode_name(&source, tag);
            let request = CompileRequest {
                source: &source,
                output: &output,
                opt_level,
                arch,
                fix_inline: false,
                fix_volatile: false,
                extra_args: &args.clang_args,
            };
            let steps = build_compile_pipeline(session, &request)?;
            session.run_pipeline(&steps)?;
        }
    }
    Ok(())
}

fn collect_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    walk(dir, &mut sources)?;
    sources.sort();
    Ok(sources)
}

fn walk(dir: &Path, sources: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("cannot read '{}'", dir.display()))? {
        let path = entry.with_context(|| format!("cannot read '{}'", dir.display()))?.path();
        if path.is_dir() {
            walk(&path, sources)?;
        } else if matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("c" | "cpp")
        ) {
            sources.push(path);
        }
    }
    Ok(())
}
