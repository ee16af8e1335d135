// Copyright SymDIVINE Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Driver for the SymDIVINE model checker.
//!
//! The driver compiles C/C++ benchmarks to LLVM bitcode with clang,
//! optionally rewrites the bitcode with LART, and runs the engine on the
//! result with a wall-clock timeout and resource accounting. Compilation,
//! transformation and verification all happen in external processes; this
//! binary only orchestrates them and interprets their output.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::args::{DriverArgs, DriverSubcommand};
use crate::error::DriverError;
use crate::session::DriverSession;

mod args;
mod batch;
mod call_engine;
mod cleanup;
mod error;
mod output_parser;
mod pipeline;
mod session;
mod util;
mod verify;
mod witness;
mod workspace;

fn main() -> ExitCode {
    init_logger();

    let args = DriverArgs::parse();
    match run(args) {
        Ok(code) => code,
        Err(error) => {
            debug!(?error, "main_failure");
            util::error(&format!("{error:#}"));
            let code = error.downcast_ref::<DriverError>().map(DriverError::exit_code).unwrap_or(2);
            ExitCode::from(code)
        }
    }
}

fn run(args: DriverArgs) -> Result<ExitCode> {
    match args.command {
        DriverSubcommand::Verify(args) => {
            let session = DriverSession::with_engine(&args.engine_dir, &args.common)?;
            verify::run_verify(&session, &args)
        }
        DriverSubcommand::Compile(args) => {
            let session = DriverSession::compile_only(args.engine_dir.as_deref(), &args.common)?;
            pipeline::compile_single(&session, &args)?;
            Ok(ExitCode::SUCCESS)
        }
        DriverSubcommand::CompileAll(args) => {
            let session = DriverSession::compile_only(None, &args.common)?;
            pipeline::compile_all(&session, &args)?;
            Ok(ExitCode::SUCCESS)
        }
        DriverSubcommand::ReachabilityAll(args) => {
            let session = DriverSession::with_engine(&args.engine_dir, &args.common)?;
            batch::reachability_all(&session, &args)?;
            Ok(ExitCode::SUCCESS)
        }
        DriverSubcommand::LtlAll(args) => {
            let session = DriverSession::with_engine(&args.engine_dir, &args.common)?;
            batch::ltl_all(&session, &args)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Logging goes to stderr and is controlled by SYMDIVINE_LOG, so it never
/// interferes with the scraped stdout contract.
fn init_logger() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("SYMDIVINE_LOG"))
        .with_writer(std::io::stderr)
        .init();
}
