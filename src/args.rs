// Copyright SymDIVINE Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command line interface of the driver.

use std::path::PathBuf;

#[derive(Debug, clap::Parser)]
#[command(
    version,
    name = "symdivine-driver",
    about = "Compile C/C++ benchmarks to LLVM bitcode and run the SymDIVINE model checker on them"
)]
pub struct DriverArgs {
    #[command(subcommand)]
    pub command: DriverSubcommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum DriverSubcommand {
    /// Verify a single benchmark source file and print the verdict
    Verify(VerifyArgs),
    /// Compile one benchmark to LLVM bitcode
    Compile(CompileArgs),
    /// Compile every .c/.cpp under a directory at -O0, -O2 and -Os
    CompileAll(CompileAllArgs),
    /// Run reachability analysis on every .ll file in a directory,
    /// collecting statistics into a CSV file
    ReachabilityAll(BatchArgs),
    /// Run LTL analysis on every benchmark directory (each holding a
    /// property.ltl), collecting statistics into a CSV file
    LtlAll(BatchArgs),
}

#[derive(Debug, clap::Args)]
pub struct VerifyArgs {
    /// SymDIVINE installation directory
    pub engine_dir: PathBuf,

    /// Benchmark source file to verify
    pub benchmark: PathBuf,

    #[command(flatten)]
    pub compile: CompileOpts,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Wall-clock timeout for the engine, in seconds
    #[arg(long, default_value_t = 900)]
    pub timeout: u64,

    /// Check an LTL property instead of error-state reachability
    #[arg(long, value_name = "PROPERTY")]
    pub ltl: Option<String>,

    /// Additional parameters forwarded verbatim to the engine (after --)
    #[arg(last = true)]
    pub engine_args: Vec<String>,
}

#[derive(Debug, clap::Args)]
pub struct CompileArgs {
    /// Benchmark source file
    pub source: PathBuf,

    /// Output path for the bitcode (defaults to the source with an .ll extension)
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub compile: CompileOpts,

    #[command(flatten)]
    pub common: CommonArgs,

    /// SymDIVINE installation directory holding the LART binary
    /// (needed with --fix-volatile, unless LART is set)
    #[arg(long)]
    pub engine_dir: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub struct CompileAllArgs {
    /// Directory tree holding benchmark sources
    pub dir: PathBuf,

    /// Produce 64-bit bitcode (the default is 32-bit)
    #[arg(long)]
    pub m64: bool,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Additional arguments forwarded verbatim to the compiler (after --)
    #[arg(last = true)]
    pub clang_args: Vec<String>,
}

#[derive(Debug, clap::Args)]
pub struct BatchArgs {
    /// SymDIVINE installation directory
    pub engine_dir: PathBuf,

    /// Directory holding compiled benchmark artifacts
    pub dir: PathBuf,

    /// CSV file the per-benchmark rows are appended to
    pub output: PathBuf,

    /// Wall-clock timeout per benchmark, in seconds
    /// [default: 300 for reachability, 120 for LTL]
    #[arg(long)]
    pub timeout: Option<u64>,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Additional parameters forwarded verbatim to the engine (after --)
    #[arg(last = true)]
    pub engine_args: Vec<String>,
}

#[derive(Debug, clap::Args)]
pub struct CommonArgs {
    /// Print every external command before it runs
    #[arg(long)]
    pub verbose: bool,

    /// Suppress the compilation command echo and compiler diagnostics
    #[arg(long)]
    pub silent: bool,
}

#[derive(Debug, clap::Args)]
pub struct CompileOpts {
    /// Optimization level passed to the compiler
    #[arg(short = 'O', long = "opt-level", value_enum, default_value = "2")]
    pub opt_level: OptLevel,

    /// Produce 64-bit bitcode (the default is 32-bit)
    #[arg(long)]
    pub m64: bool,

    /// Work around C89 inline declarations by disabling inlining
    #[arg(long)]
    pub fix_inline: bool,

    /// Rewrite the bitcode with the LART main-volatilize transformation
    #[arg(long)]
    pub fix_volatile: bool,
}

impl CompileOpts {
    pub fn arch(&self) -> Arch {
        if self.m64 { Arch::Bits64 } else { Arch::Bits32 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OptLevel {
    #[value(name = "0")]
    O0,
    #[value(name = "1")]
    O1,
    #[value(name = "2")]
    O2,
    #[value(name = "s")]
    Os,
}

impl OptLevel {
    /// The compiler flag spelling.
    pub fn flag(self) -> &'static str {
        match self {
            OptLevel::O0 => "-O0",
            OptLevel::O1 => "-O1",
            OptLevel::O2 => "-O2",
            OptLevel::Os => "-Os",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Bits32,
    Bits64,
}

impl Arch {
    pub fn flag(self) -> &'static str {
        match self {
            Arch::Bits32 => "-m32",
            Arch::Bits64 => "-m64",
        }
    }

    /// The spelling used inside witness files.
    pub fn witness_name(self) -> &'static str {
        match self {
            Arch::Bits32 => "32bit",
            Arch::Bits64 => "64bit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn check_verify_defaults() {
        let args = DriverArgs::parse_from(["symdivine-driver", "verify", "/opt/engine", "a.c"]);
        let DriverSubcommand::Verify(verify) = args.command else {
            panic!("expected the verify subcommand")
        };
        assert_eq!(verify.timeout, 900);
        assert_eq!(verify.compile.opt_level, OptLevel::O2);
        assert_eq!(verify.compile.arch(), Arch::Bits32);
        assert!(!verify.compile.fix_volatile);
        assert!(verify.engine_args.is_empty());
    }

    #[test]
    fn check_verify_flags_and_passthrough() {
        let args = DriverArgs::parse_from([
            "symdivine-driver",
            "verify",
            "/opt/engine",
            "a.c",
            "-Os",
            "--m64",
            "--fix-inline",
            "--fix-volatile",
            "--timeout",
            "60",
            "--",
            "--enablecaching",
            "-p",
        ]);
        let DriverSubcommand::Verify(verify) = args.command else {
            panic!("expected the verify subcommand")
        };
        assert_eq!(verify.compile.opt_level, OptLevel::Os);
        assert_eq!(verify.compile.arch(), Arch::Bits64);
        assert!(verify.compile.fix_inline);
        assert!(verify.compile.fix_volatile);
        assert_eq!(verify.timeout, 60);
        assert_eq!(verify.engine_args, vec!["--enablecaching", "-p"]);
    }

    #[test]
    fn check_opt_level_flags() {
        assert_eq!(OptLevel::O0.flag(), "-O0");
        assert_eq!(OptLevel::Os.flag(), "-Os");
    }

    #[test]
    fn check_arch_spellings() {
        assert_eq!(Arch::Bits32.flag(), "-m32");
        assert_eq!(Arch::Bits64.witness_name(), "64bit");
    }
}
