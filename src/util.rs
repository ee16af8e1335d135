// Copyright SymDIVINE Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Helpers shared across the driver components.
//!
//! The `warning` and `error` functions are the single place diagnostic
//! output is styled, so every component reports problems the same way.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Print a warning message. This will add a "warning:" tag before the message and style accordingly.
pub fn warning(msg: &str) {
    let warning = console::style("warning:").bold().yellow();
    let msg_fmt = console::style(msg).bold();
    eprintln!("{warning} {msg_fmt}")
}

/// Print an error message. This will add an "error:" tag before the message and style accordingly.
pub fn error(msg: &str) {
    let error = console::style("error:").bold().red();
    let msg_fmt = console::style(msg).bold();
    eprintln!("{error} {msg_fmt}")
}

/// Render a Command as a string, to log it (e.g. with --verbose)
pub fn render_command(cmd: &Command) -> OsString {
    let mut str = OsString::new();

    for (k, v) in cmd.get_envs() {
        if let Some(v) = v {
            str.push(k);
            str.push("=\"");
            str.push(v);
            str.push("\" ");
        }
    }

    str.push(cmd.get_program());

    for a in cmd.get_args() {
        str.push(" ");
        if a.to_string_lossy().contains(' ') {
            str.push("\"");
            str.push(a);
            str.push("\"");
        } else {
            str.push(a);
        }
    }

    str
}

/// Name for a bitcode artifact derived from a source path, with a tag
/// squeezed in before the extension: `/p/foo.c` + `_o2` -> `/p/foo_o2.ll`.
pub fn suffixed_bitcode_name(path: &Path, tag: &str) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    path.with_file_name(format!("{stem}{tag}.ll"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_render_command() {
        let mut c1 = Command::new("a");
        c1.arg("b");
        assert_eq!(render_command(&c1), OsString::from("a b"));
        c1.arg("/c d/");
        assert_eq!(render_command(&c1), OsString::from("a b \"/c d/\""));
        c1.env("LD_LIBRARY_PATH", "/opt/engine");
        assert_eq!(
            render_command(&c1),
            OsString::from("LD_LIBRARY_PATH=\"/opt/engine\" a b \"/c d/\"")
        );
    }

    #[test]
    fn check_suffixed_bitcode_name() {
        assert_eq!(
            suffixed_bitcode_name(Path::new("./bench/lock.c"), "_o0"),
            PathBuf::from("./bench/lock_o0.ll")
        );
        assert_eq!(
            suffixed_bitcode_name(Path::new("simple.cpp"), "_os"),
            PathBuf::from("simple_os.ll")
        );
    }
}
