// Copyright SymDIVINE Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contains information about the execution environment and arguments that
//! affect how the external toolchain is invoked.
//!
//! Tool locations are resolved once, up front: the engine and LART live in
//! the installation directory given on the command line, the compiler is
//! found on PATH. Each can be overridden through the `SYMDIVINE`, `LART`
//! and `CLANG` environment variables.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::args::CommonArgs;
use crate::cleanup::ChildRegistry;

pub struct DriverSession {
    pub verbose: bool,
    pub silent: bool,

    engine_dir: Option<PathBuf>,
    symdivine: Option<PathBuf>,
    clang: PathBuf,
    clang_cxx: PathBuf,

    /// Children spawned on behalf of this session, terminated on cleanup.
    pub children: ChildRegistry,
}

impl DriverSession {
    /// A session that will run the verification engine from `engine_dir`.
    pub fn with_engine(engine_dir: &Path, common: &CommonArgs) -> Result<Self> {
        let (clang, clang_cxx) = resolve_clang()?;
        let symdivine = resolve_engine_binary(engine_dir)?;
        Ok(DriverSession {
            verbose: common.verbose,
            silent: common.silent,
            engine_dir: Some(engine_dir.to_owned()),
            symdivine: Some(symdivine),
            clang,
            clang_cxx,
            children: ChildRegistry::new(),
        })
    }

    /// A session for the compile-only subcommands. `engine_dir` is only
    /// needed when the LART transformation will run.
    pub fn compile_only(engine_dir: Option<&Path>, common: &CommonArgs) -> Result<Self> {
        let (clang, clang_cxx) = resolve_clang()?;
        Ok(DriverSession {
            verbose: common.verbose,
            silent: common.silent,
            engine_dir: engine_dir.map(Path::to_owned),
            symdivine: None,
            clang,
            clang_cxx,
            children: ChildRegistry::new(),
        })
    }

    pub fn engine_dir(&self) -> Option<&Path> {
        self.engine_dir.as_deref()
    }

    pub fn symdivine(&self) -> Result<&Path> {
        self.symdivine.as_deref().context("no engine location was configured")
    }

    /// LART lives next to the engine unless `LART` points elsewhere.
    pub fn lart(&self) -> Result<PathBuf> {
        if let Some(path) = env::var_os("LART") {
            return Ok(PathBuf::from(path));
        }
        let dir = self.engine_dir.as_deref().context(
            "the volatile fix needs the engine directory (or the LART environment variable)",
        )?;
        let path = dir.join("lart");
        if path.exists() {
            Ok(path)
        } else {
            bail!("Unable to find lart at expected location: '{}'", path.display());
        }
    }

    /// C sources go through clang, C++ sources through clang++.
    pub fn compiler_for(&self, source: &Path) -> &Path {
        if is_cxx_source(source) { &self.clang_cxx } else { &self.clang }
    }

    #[cfg(test)]
    pub(crate) fn test_session(engine_dir: Option<PathBuf>) -> DriverSession {
        DriverSession {
            verbose: false,
            silent: true,
            engine_dir,
            symdivine: None,
            clang: PathBuf::from("clang"),
            clang_cxx: PathBuf::from("clang++"),
            children: ChildRegistry::new(),
        }
    }
}

fn resolve_engine_binary(engine_dir: &Path) -> Result<PathBuf> {
    if let Some(path) = env::var_os("SYMDIVINE") {
        return Ok(PathBuf::from(path));
    }
    let path = engine_dir.join("symdivine");
    if path.exists() {
        Ok(path)
    } else {
        bail!("Unable to find symdivine at expected location: '{}'", path.display());
    }
}

fn resolve_clang() -> Result<(PathBuf, PathBuf)> {
    if let Some(name) = env::var_os("CLANG") {
        let mut cxx = name.clone();
        cxx.push("++");
        return Ok((PathBuf::from(name), PathBuf::from(cxx)));
    }
    let clang = which::which("clang").context("unable to find clang in PATH (set CLANG to override)")?;
    // clang++ is only needed for C++ benchmarks; resolve lazily on failure.
    let clang_cxx = which::which("clang++").unwrap_or_else(|_| PathBuf::from("clang++"));
    Ok((clang, clang_cxx))
}

fn is_cxx_source(path: &Path) -> bool {
    matches!(path.extension().and_then(OsStr::to_str), Some("cpp" | "cc" | "cxx" | "C"))
}
