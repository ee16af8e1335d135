// Copyright SymDIVINE Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Classification of engine output and scraping of its statistics dump.
//!
//! The engine communicates through plain text. A small set of marker
//! strings decides the verdict; the statistics sections are located by
//! their header lines and read at fixed offsets below them. The marker
//! checks happen in a fixed order and the first match wins.

use strum_macros::Display;

use crate::call_engine::AnalysisMode;

/// Printed by the engine when no error state is reachable.
pub const SAFE_MARKER: &str = "Safe.";
/// Printed by the engine when it reaches an error state.
pub const ERROR_STATE_MARKER: &str = "Error state";
/// Printed by the engine when an LTL property holds.
pub const LTL_HOLDS_MARKER: &str = "Property holds!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Verdict {
    #[strum(serialize = "TRUE")]
    True,
    #[strum(serialize = "FALSE")]
    False,
    #[strum(serialize = "UNKNOWN")]
    Unknown,
    #[strum(serialize = "TIMEOUT")]
    Timeout,
    #[strum(serialize = "ERROR")]
    Error,
}

/// Derive the verdict for one run. Marker checks come first, in a fixed
/// order; the exit code only matters when nothing else matched.
pub fn classify(
    mode: &AnalysisMode,
    stdout: &str,
    stderr: &str,
    exit_code: Option<i32>,
    timed_out: bool,
) -> Verdict {
    let safe_marker = match mode {
        AnalysisMode::Reachability => SAFE_MARKER,
        AnalysisMode::Ltl { .. } => LTL_HOLDS_MARKER,
    };

    if stdout.contains(safe_marker) || stderr.contains(safe_marker) {
        Verdict::True
    } else if stdout.contains(ERROR_STATE_MARKER) || stderr.contains(ERROR_STATE_MARKER) {
        Verdict::False
    } else if timed_out {
        Verdict::Timeout
    } else if exit_code != Some(0) {
        Verdict::Error
    } else {
        Verdict::Unknown
    }
}

/// Labels of the "General statistics" counters, in CSV column order.
pub const STAT_CASES: [&str; 9] = [
    "Instruction executed",
    "Instructions executed observable",
    "Subseteq queries",
    "Subseteq on syntax",
    "Equal query cached",
    "QF queries solved via simplification",
    "QF queries solved via solver",
    "Q queries solved via simplification",
    "Q queries solved via solver",
];

/// One batch-mode result row. Fields left at `None` become empty CSV
/// cells.
#[derive(Debug, Default, Clone)]
pub struct StatsRow {
    pub time: Option<f64>,
    pub result: Option<bool>,
    pub states: Option<String>,
    pub stats: [Option<String>; 9],
    pub hit_count: Option<String>,
    pub miss_count: Option<String>,
    pub replace_count: Option<String>,
    pub note: Option<String>,
}

/// Scrape the statistics sections out of the engine output into `row`.
/// A missing or malformed section records a note and leaves the already
/// parsed fields in place; it never fails the batch.
pub fn parse_statistics(output: &str, row: &mut StatsRow) {
    let lines: Vec<&str> = output.lines().collect();
    if try_parse(&lines, row).is_err() {
        row.note = Some(format!("Unexpected output!\\n{}", output.replace('\n', "\\n")));
    }
}

fn try_parse(lines: &[&str], row: &mut StatsRow) -> Result<(), ()> {
    // Each section is a header line, an underline, then the payload.
    let idx = position(lines, "States count")?;
    row.states = Some(lines.get(idx + 2).ok_or(())?.trim().to_string());

    let mut idx = position(lines, "General statistics")? + 2;
    while let Some(line) = lines.get(idx) {
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':').ok_or(())?;
        let slot = STAT_CASES.iter().position(|case| *case == name.trim()).ok_or(())?;
        row.stats[slot] = Some(value.trim().to_string());
        idx += 1;
    }

    let idx = position(lines, "Query cache statistics")?;
    for (offset, slot) in
        [&mut row.hit_count, &mut row.miss_count, &mut row.replace_count].into_iter().enumerate()
    {
        let line = lines.get(idx + 2 + offset).ok_or(())?;
        let (_, value) = line.split_once(':').ok_or(())?;
        *slot = Some(value.trim().to_string());
    }

    Ok(())
}

fn position(lines: &[&str], header: &str) -> Result<usize, ()> {
    lines.iter().position(|line| *line == header).ok_or(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REACHABILITY: AnalysisMode = AnalysisMode::Reachability;

    #[test]
    fn check_safe_output_is_true() {
        let verdict = classify(&REACHABILITY, "exploring...\nSafe.\n", "", Some(0), false);
        assert_eq!(verdict, Verdict::True);
        assert_eq!(verdict.to_string(), "TRUE");
    }

    #[test]
    fn check_error_state_is_false() {
        let out = "Error state:\nx = 1\nis reachable.\n";
        let verdict = classify(&REACHABILITY, out, "", Some(0), false);
        assert_eq!(verdict, Verdict::False);
        assert_eq!(verdict.to_string(), "FALSE");
    }

    #[test]
    fn check_no_output_before_deadline_is_timeout() {
        let verdict = classify(&REACHABILITY, "", "", None, true);
        assert_eq!(verdict, Verdict::Timeout);
    }

    #[test]
    fn check_unrecognized_nonzero_exit_is_error() {
        let verdict = classify(&REACHABILITY, "z3 assertion violation\n", "", Some(3), false);
        assert_eq!(verdict, Verdict::Error);
    }

    #[test]
    fn check_clean_exit_without_markers_is_unknown() {
        let verdict = classify(&REACHABILITY, "nothing interesting\n", "", Some(0), false);
        assert_eq!(verdict, Verdict::Unknown);
    }

    #[test]
    fn check_safe_marker_wins_over_error_marker() {
        // Both markers present: check order decides.
        let out = "Safe.\nError state mentioned later\n";
        assert_eq!(classify(&REACHABILITY, out, "", Some(0), false), Verdict::True);
    }

    #[test]
    fn check_markers_win_over_exit_code_and_timeout() {
        assert_eq!(classify(&REACHABILITY, "Safe.\n", "", Some(2), true), Verdict::True);
        assert_eq!(classify(&REACHABILITY, "Error state\n", "", Some(2), true), Verdict::False);
    }

    #[test]
    fn check_marker_in_stderr_counts() {
        assert_eq!(classify(&REACHABILITY, "", "Safe.\n", Some(0), false), Verdict::True);
    }

    #[test]
    fn check_ltl_marker() {
        let ltl = AnalysisMode::Ltl { property: "G(a)".into() };
        assert_eq!(classify(&ltl, "Property holds!\n", "", Some(0), false), Verdict::True);
        assert_eq!(classify(&ltl, "Safe.\n", "", Some(0), false), Verdict::Unknown);
    }

    const STATS_OUTPUT: &str = "\
Safe.
States count
------------
42

General statistics
------------------
Instruction executed                 :  1000
Instructions executed observable     :   500
Subseteq queries                     :    80
Subseteq on syntax                   :    10
Equal query cached                   :     5
QF queries solved via simplification :    20
QF queries solved via solver         :    60
Q queries solved via simplification  :     3
Q queries solved via solver          :     7

Query cache statistics
----------------------
Hit count: 11
Miss count: 22
Replace count: 33
";

    #[test]
    fn check_statistics_are_scraped() {
        let mut row = StatsRow::default();
        parse_statistics(STATS_OUTPUT, &mut row);

        assert_eq!(row.note, None);
        assert_eq!(row.states.as_deref(), Some("42"));
        assert_eq!(row.stats[0].as_deref(), Some("1000"));
        assert_eq!(row.stats[4].as_deref(), Some("5"));
        assert_eq!(row.stats[8].as_deref(), Some("7"));
        assert_eq!(row.hit_count.as_deref(), Some("11"));
        assert_eq!(row.miss_count.as_deref(), Some("22"));
        assert_eq!(row.replace_count.as_deref(), Some("33"));
    }

    #[test]
    fn check_missing_section_records_a_note() {
        let output = "Safe.\nStates count\n------------\n42\n\nQuery cache statistics\n\
                      ----------------------\nHit count: 1\nMiss count: 2\nReplace count: 3\n";
        let mut row = StatsRow::default();
        parse_statistics(output, &mut row);

        let note = row.note.expect("a note should be recorded");
        assert!(note.starts_with("Unexpected output!"));
        // The raw output is carried along with escaped newlines.
        assert!(note.contains("States count"));
        assert!(!note.contains('\n'));
    }

    #[test]
    fn check_unknown_counter_name_records_a_note() {
        let output = "States count\n------------\n1\n\nGeneral statistics\n\
                      ------------------\nBogus counter : 9\n\n";
        let mut row = StatsRow::default();
        parse_statistics(output, &mut row);
        assert!(row.note.is_some());
    }

    #[test]
    fn check_classify_is_deterministic() {
        let out = "Safe.\n";
        let first = classify(&REACHABILITY, out, "", Some(0), false);
        let second = classify(&REACHABILITY, out, "", Some(0), false);
        assert_eq!(first, second);
    }
}
