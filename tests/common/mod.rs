#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::Path;

use assert_cmd::Command;
use tempfile::TempDir;

/// Probe count of dataset `a`: the plane 100 - 12 m - 0.6 ce.
pub fn plane_count(m: i64, ce: i64) -> usize {
    (100 - 12 * m - 6 * (ce / 10)) as usize
}

/// Write a FASTA file with `records` probes.
pub fn write_fasta(path: &Path, records: usize) {
    let mut f = fs::File::create(path).unwrap();
    for i in 0..records {
        writeln!(f, ">probe_{i}").unwrap();
        writeln!(f, "ACGTACGTACGTACGTACGT").unwrap();
    }
}

/// A results tree with two datasets and a stray top-level file:
///
/// - `a`: m in 0..=5, ce in {0, 10, 20, 30}, counts on `plane_count`
/// - `b`: a single measurement of 10 probes at (0, 0)
pub fn results_dir() -> TempDir {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("datasets.txt"), "a\nb\n").unwrap();

    let a = root.path().join("a");
    fs::create_dir(&a).unwrap();
    for m in 0..=5 {
        for ce in [0, 10, 20, 30] {
            let name = format!("mismatches_{m}-coverextension_{ce}.fasta");
            write_fasta(&a.join(name), plane_count(m, ce));
        }
    }

    let b = root.path().join("b");
    fs::create_dir(&b).unwrap();
    write_fasta(&b.join("mismatches_0-coverextension_0.fasta"), 10);
    fs::write(b.join("run.log"), "finished\n").unwrap();

    root
}

pub fn probe_budget() -> Command {
    let mut cmd = Command::cargo_bin("probe-budget").unwrap();
    cmd.env("RUST_LOG", "warn");
    cmd
}

pub fn stdout_of(cmd: &mut Command) -> String {
    let out = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(out).unwrap()
}
