// Copyright SymDIVINE Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Batch modes: run the engine over a directory of compiled benchmarks
//! and collect one CSV row per run.
//!
//! Benchmarks run strictly sequentially. Every row is flushed and fsynced
//! as soon as it is written, so partial progress survives a crash of the
//! driver or the host.

use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::args::BatchArgs;
use crate::call_engine::AnalysisMode;
use crate::output_parser::{parse_statistics, StatsRow, LTL_HOLDS_MARKER, SAFE_MARKER, STAT_CASES};
use crate::session::DriverSession;
use crate::util;

const DEFAULT_REACHABILITY_TIMEOUT: u64 = 300;
const DEFAULT_LTL_TIMEOUT: u64 = 120;

/// `reachability-all`: every .ll file in the directory.
pub fn reachability_all(session: &DriverSession, args: &BatchArgs) -> Result<()> {
    let timeout = Duration::from_secs(args.timeout.unwrap_or(DEFAULT_REACHABILITY_TIMEOUT));
    let mut csv = CsvFile::create(&args.output)?;

    for path in bitcode_files(&args.dir)? {
        let name = file_name(&path);
        println!("Running reachability on file {}", path.display());
        let row =
            run_stat(session, &AnalysisMode::Reachability, &path, timeout, &args.engine_args)?;
        csv.append_row(&row_fields(&name, opt_column(&name), &row))?;
    }
    Ok(())
}

/// `ltl-all`: every benchmark directory holds a property.ltl; each .ll
/// inside is checked against the property and against its negation.
pub fn ltl_all(session: &DriverSession, args: &BatchArgs) -> Result<()> {
    let timeout = Duration::from_secs(args.timeout.unwrap_or(DEFAULT_LTL_TIMEOUT));
    let mut csv = CsvFile::create(&args.output)?;

    for bench in sorted_entries(&args.dir)? {
        if !bench.is_dir() {
            continue;
        }
        let property = match fs::read_to_string(bench.join("property.ltl")) {
            Ok(property) => property.trim().to_string(),
            Err(err) => {
                util::warning(&format!(
                    "skipping {}: cannot read property.ltl: {err}",
                    bench.display()
                ));
                continue;
            }
        };
        println!(
            "Running LTL benchmark {} with property {}",
            bench.display(),
            property
        );

        for path in bitcode_files(&bench)? {
            let name = file_name(&path);
            let opt = opt_column(&name);

            println!("Running ltl on file {}", path.display());
            let mode = AnalysisMode::Ltl { property: property.clone() };
            let row = run_stat(session, &mode, &path, timeout, &args.engine_args)?;
            csv.append_row(&row_fields(&name, opt, &row))?;

            let negated = AnalysisMode::Ltl { property: format!("!({property})") };
            let row = run_stat(session, &negated, &path, timeout, &args.engine_args)?;
            csv.append_row(&row_fields(&format!("{name}_neg"), opt, &row))?;
        }
    }
    Ok(())
}

/// Run the engine once with statistics enabled and scrape the output.
fn run_stat(
    session: &DriverSession,
    mode: &AnalysisMode,
    bitcode: &Path,
    timeout: Duration,
    engine_args: &[String],
) -> Result<StatsRow> {
    let mut params = vec!["-s".to_string()];
    params.extend(engine_args.iter().cloned());

    let run = session.run_engine(mode, bitcode, &params, timeout)?;

    let mut row = StatsRow::default();
    if run.timed_out {
        println!("TIMEOUT");
        row.note = Some("TIMEOUT".to_string());
        return Ok(row);
    }

    let text = run.combined_output();
    row.time = Some(run.wall_time.as_secs_f64());
    row.result = Some(match mode {
        AnalysisMode::Reachability => text.contains(SAFE_MARKER),
        AnalysisMode::Ltl { .. } => text.contains(LTL_HOLDS_MARKER),
    });
    parse_statistics(&text, &mut row);
    Ok(row)
}

/// Optimization column derived from the artifact name suffix.
fn opt_column(name: &str) -> &'static str {
    if name.ends_with("o2.ll") {
        "2"
    } else if name.ends_with("o1.ll") {
        "1"
    } else if name.ends_with("o0.ll") {
        "0"
    } else if name.ends_with("os.ll") {
        "S"
    } else {
        "unknown"
    }
}

fn csv_header() -> Vec<String> {
    let mut header: Vec<String> =
        ["name", "opt", "time", "result", "states"].iter().map(|s| s.to_string()).collect();
    header.extend(STAT_CASES.iter().map(|s| s.to_string()));
    header.extend(["Hit count", "Miss count", "Replace count", "Note"].iter().map(|s| s.to_string()));
    header
}

fn row_fields(name: &str, opt: &str, row: &StatsRow) -> Vec<String> {
    let mut fields = vec![name.to_string(), opt.to_string()];
    fields.push(row.time.map(|t| t.to_string()).unwrap_or_default());
    fields.push(
        row.result.map(|safe| (if safe { "true" } else { "false" }).to_string()).unwrap_or_default(),
    );
    fields.push(row.states.clone().unwrap_or_default());
    for stat in &row.stats {
        fields.push(stat.clone().unwrap_or_default());
    }
    fields.push(row.hit_count.clone().unwrap_or_default());
    fields.push(row.miss_count.clone().unwrap_or_default());
    fields.push(row.replace_count.clone().unwrap_or_default());
    fields.push(row.note.clone().unwrap_or_default());
    fields
}

/// CSV output with the fixed result header, durably appended row by row.
struct CsvFile {
    file: File,
}

impl CsvFile {
    fn create(path: &Path) -> Result<CsvFile> {
        let file =
            File::create(path).with_context(|| format!("cannot create '{}'", path.display()))?;
        let mut csv = CsvFile { file };
        csv.append_row(&csv_header())?;
        Ok(csv)
    }

    fn append_row(&mut self, fields: &[String]) -> Result<()> {
        let line: Vec<String> = fields.iter().map(|field| csv_field(field)).collect();
        writeln!(self.file, "{}", line.join(","))?;
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

fn csv_field(field: &str) -> String {
    if field.contains(|c| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("cannot read '{}'", dir.display()))? {
        entries.push(entry.with_context(|| format!("cannot read '{}'", dir.display()))?.path());
    }
    entries.sort();
    Ok(entries)
}

fn bitcode_files(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(sorted_entries(dir)?
        .into_iter()
        .filter(|path| path.extension().and_then(OsStr::to_str) == Some("ll"))
        .collect())
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_opt_column_suffixes() {
        assert_eq!(opt_column("bench_o2.ll"), "2");
        assert_eq!(opt_column("bench_o1.ll"), "1");
        assert_eq!(opt_column("bench_o0.ll"), "0");
        assert_eq!(opt_column("bench_os.ll"), "S");
        assert_eq!(opt_column("bench.ll"), "unknown");
    }

    #[test]
    fn check_header_and_rows_have_matching_width() {
        let header = csv_header();
        assert_eq!(header.len(), 18);
        assert_eq!(header[0], "name");
        assert_eq!(header[5], STAT_CASES[0]);
        assert_eq!(header.last().unwrap(), "Note");

        let fields = row_fields("a.ll", "2", &StatsRow::default());
        assert_eq!(fields.len(), header.len());
    }

    #[test]
    fn check_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field(""), "");
    }

    #[test]
    fn check_rows_survive_in_the_file_as_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");

        let mut good = StatsRow::default();
        good.time = Some(1.5);
        good.result = Some(true);
        good.states = Some("7".to_string());
        good.hit_count = Some("1".to_string());

        let mut bad = StatsRow::default();
        bad.time = Some(0.2);
        bad.result = Some(false);
        bad.note = Some("Unexpected output!\\nSafe.".to_string());

        {
            let mut csv = CsvFile::create(&path).unwrap();
            csv.append_row(&row_fields("a_o0.ll", "0", &good)).unwrap();
            csv.append_row(&row_fields("b_o2.ll", "2", &bad)).unwrap();
            csv.append_row(&row_fields("c_os.ll", "S", &good)).unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("name,opt,time,result,states"));
        assert!(lines[1].starts_with("a_o0.ll,0,1.5,true,7"));
        assert!(lines[2].contains("Unexpected output!"));
        assert!(lines[3].starts_with("c_os.ll,S,"));
    }

    #[test]
    fn check_bitcode_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b_o2.ll"), b"").unwrap();
        fs::write(dir.path().join("a_o0.ll"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let files = bitcode_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a_o0.ll"), dir.path().join("b_o2.ll")]
        );
    }
}
