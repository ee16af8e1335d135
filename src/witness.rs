// Copyright SymDIVINE Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Witness generation.
//!
//! A TRUE or FALSE verdict is accompanied by a GraphML witness written to
//! a fixed filename. The witness is one of two fixed templates with the
//! benchmark path, its SHA-256 content hash and the architecture string
//! substituted in.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::args::Arch;
use crate::output_parser::Verdict;

const WITNESS_FILE: &str = "witness.graphml";

const CORRECTNESS_WITNESS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<graphml xmlns="http://graphml.graphdrawing.org/xmlns" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <graph edgedefault="directed">
    <data key="witness-type">correctness_witness</data>
    <data key="sourcecodelang">C</data>
    <data key="producer">SymDIVINE</data>
    <data key="programfile">{program}</data>
    <data key="programhash">{hash}</data>
    <data key="architecture">{arch}</data>
    <node id="entry">
      <data key="entry">true</data>
    </node>
  </graph>
</graphml>
"#;

const VIOLATION_WITNESS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<graphml xmlns="http://graphml.graphdrawing.org/xmlns" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <graph edgedefault="directed">
    <data key="witness-type">violation_witness</data>
    <data key="sourcecodelang">C</data>
    <data key="producer">SymDIVINE</data>
    <data key="programfile">{program}</data>
    <data key="programhash">{hash}</data>
    <data key="architecture">{arch}</data>
    <node id="entry">
      <data key="entry">true</data>
    </node>
    <node id="error">
      <data key="violation">true</data>
    </node>
    <edge source="entry" target="error"/>
  </graph>
</graphml>
"#;

/// Write the witness matching `verdict`. Verdicts other than TRUE/FALSE
/// produce no artifact.
pub fn write_witness(verdict: Verdict, benchmark: &Path, arch: Arch) -> Result<()> {
    let template = match verdict {
        Verdict::True => CORRECTNESS_WITNESS,
        Verdict::False => VIOLATION_WITNESS,
        _ => return Ok(()),
    };

    let contents = fs::read(benchmark)
        .with_context(|| format!("cannot hash benchmark '{}'", benchmark.display()))?;
    let rendered = render(template, &hex_digest(&contents), benchmark, arch);
    fs::write(WITNESS_FILE, rendered).context("cannot write the witness file")?;
    Ok(())
}

fn render(template: &str, hash: &str, program: &Path, arch: Arch) -> String {
    template
        .replace("{hash}", hash)
        .replace("{program}", &program.display().to_string())
        .replace("{arch}", arch.witness_name())
}

fn hex_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
