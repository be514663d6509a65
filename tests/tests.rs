extern crate lithium;
extern crate tempdir;

use std::fs;
use std::io::{Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

fn binary_path() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("target");
    path.push(if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    });
    path.push("lithium");
    path
}

fn write_executable(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let mut f = fs::File::create(&path).unwrap();
    writeln!(f, "#!/bin/sh").unwrap();
    writeln!(f, "{}", body).unwrap();
    drop(f);
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn read_to_string(path: &Path) -> String {
    let mut s = String::new();
    fs::File::open(path)
        .unwrap()
        .read_to_string(&mut s)
        .unwrap();
    s
}

fn run_lithium(args: &[&str]) -> std::process::Output {
    Command::new(binary_path())
        .args(args)
        .output()
        .expect("should spawn lithium binary")
}

#[test]
fn reduces_to_the_line_containing_the_needle() {
    let dir = tempdir::TempDir::new("lithium-it").unwrap();
    let test_case = dir.path().join("test.txt");
    fs::File::create(&test_case)
        .unwrap()
        .write_all(b"one\ntwo\nneedle\nfour\n")
        .unwrap();
    // The test case path is the last oracle-arg, per the oracle plugin
    // contract: the oracle itself locates it there.
    let oracle = write_executable(dir.path(), "oracle.sh", "grep -q needle \"$1\"");

    let output = run_lithium(&[oracle.to_str().unwrap(), test_case.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let reduced = read_to_string(&test_case);
    assert_eq!(reduced, "needle\n");
}

#[test]
fn respects_ddbegin_ddend_markers() {
    let dir = tempdir::TempDir::new("lithium-it").unwrap();
    let test_case = dir.path().join("test.txt");
    fs::File::create(&test_case)
        .unwrap()
        .write_all(b"// DDBEGIN\na\nb\nc\n// DDEND\ntail\n")
        .unwrap();
    let oracle = write_executable(
        dir.path(),
        "oracle.sh",
        "tail -c 5 \"$1\" | grep -q '^tail$' && grep -q '^b$' \"$1\"",
    );

    let output = run_lithium(&[oracle.to_str().unwrap(), test_case.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let reduced = read_to_string(&test_case);
    assert_eq!(reduced, "// DDBEGIN\nb\n// DDEND\ntail\n");
}

#[test]
fn character_reduction_with_char_atomizer() {
    let dir = tempdir::TempDir::new("lithium-it").unwrap();
    let test_case = dir.path().join("test.txt");
    fs::File::create(&test_case)
        .unwrap()
        .write_all(b"abcdefgh")
        .unwrap();
    let oracle = write_executable(dir.path(), "oracle.sh", "grep -q ce \"$1\"");

    let output = run_lithium(&[
        oracle.to_str().unwrap(),
        test_case.to_str().unwrap(),
        "--char",
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let reduced = read_to_string(&test_case);
    assert_eq!(reduced, "ce");
}

#[test]
fn check_only_never_modifies_the_test_case() {
    let dir = tempdir::TempDir::new("lithium-it").unwrap();
    let test_case = dir.path().join("test.txt");
    let original = b"A\nB\nC\n".to_vec();
    fs::File::create(&test_case)
        .unwrap()
        .write_all(&original)
        .unwrap();
    let oracle = write_executable(dir.path(), "oracle.sh", "exit 0");

    let output = run_lithium(&[
        oracle.to_str().unwrap(),
        test_case.to_str().unwrap(),
        "--strategy=check-only",
    ]);
    assert!(output.status.success());

    let after = read_to_string(&test_case);
    assert_eq!(after.as_bytes(), &original[..]);
}

#[test]
fn check_only_on_uninteresting_file_exits_one_and_leaves_file_unchanged() {
    let dir = tempdir::TempDir::new("lithium-it").unwrap();
    let test_case = dir.path().join("test.txt");
    let original = b"A\nB\n".to_vec();
    fs::File::create(&test_case)
        .unwrap()
        .write_all(&original)
        .unwrap();
    let oracle = write_executable(dir.path(), "oracle.sh", "exit 1");

    let output = run_lithium(&[
        oracle.to_str().unwrap(),
        test_case.to_str().unwrap(),
        "--strategy=check-only",
    ]);
    assert_eq!(output.status.code(), Some(1));

    let after = read_to_string(&test_case);
    assert_eq!(after.as_bytes(), &original[..]);
}

#[test]
fn exits_with_code_two_on_config_error() {
    let dir = tempdir::TempDir::new("lithium-it").unwrap();
    let test_case = dir.path().join("test.txt");
    fs::File::create(&test_case)
        .unwrap()
        .write_all(b"A\n")
        .unwrap();
    let oracle = write_executable(dir.path(), "oracle.sh", "exit 0");

    let output = run_lithium(&[
        oracle.to_str().unwrap(),
        test_case.to_str().unwrap(),
        "--min=3",
    ]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn one_minimal_under_chunk_size_one() {
    // A non-monotonic oracle: interesting only when the file contains both
    // an "a" line and a "b" line. Chunk-size=1 proves the final result is
    // 1-minimal (no single remaining atom can be removed without losing
    // interestingness).
    let dir = tempdir::TempDir::new("lithium-it").unwrap();
    let test_case = dir.path().join("test.txt");
    fs::File::create(&test_case)
        .unwrap()
        .write_all(b"x\na\ny\nb\nz\n")
        .unwrap();
    let oracle = write_executable(
        dir.path(),
        "oracle.sh",
        "grep -q '^a$' \"$1\" && grep -q '^b$' \"$1\"",
    );

    let output = run_lithium(&[
        oracle.to_str().unwrap(),
        test_case.to_str().unwrap(),
        "--chunk-size=1",
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let reduced = read_to_string(&test_case);
    assert_eq!(reduced, "a\nb\n");
}

#[test]
fn resuming_with_chunk_size_one_removes_nothing_more() {
    let dir = tempdir::TempDir::new("lithium-it").unwrap();
    let test_case = dir.path().join("test.txt");
    fs::File::create(&test_case)
        .unwrap()
        .write_all(b"one\ntwo\nneedle\nfour\n")
        .unwrap();
    let oracle = write_executable(dir.path(), "oracle.sh", "grep -q needle \"$1\"");

    let first = run_lithium(&[oracle.to_str().unwrap(), test_case.to_str().unwrap()]);
    assert!(
        first.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&first.stderr)
    );
    let once_reduced = read_to_string(&test_case);
    assert_eq!(once_reduced, "needle\n");

    let second = run_lithium(&[
        oracle.to_str().unwrap(),
        test_case.to_str().unwrap(),
        "--chunk-size=1",
    ]);
    assert!(second.status.success());
    let summary_path = test_case.with_extension("lithium-summary.json");
    let summary = read_to_string(&summary_path);
    assert!(summary.contains("\"atoms_removed\": 0"));

    let twice_reduced = read_to_string(&test_case);
    assert_eq!(twice_reduced, once_reduced);
}

#[test]
fn verbose_mode_logs_a_line_per_oracle_call_and_a_timed_summary() {
    let dir = tempdir::TempDir::new("lithium-it").unwrap();
    let test_case = dir.path().join("test.txt");
    fs::File::create(&test_case)
        .unwrap()
        .write_all(b"one\ntwo\nneedle\nfour\n")
        .unwrap();
    let oracle = write_executable(dir.path(), "oracle.sh", "grep -q needle \"$1\"");

    let output = run_lithium(&[
        oracle.to_str().unwrap(),
        test_case.to_str().unwrap(),
        "--verbose",
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let per_call_lines = stderr.lines().filter(|l| l.contains("chunk=")).count();
    // One progress line for the initial check plus at least one per
    // speculative removal the minimize strategy attempts.
    assert!(
        per_call_lines > 1,
        "expected more than one progress line, got:\n{}",
        stderr
    );
    let summary_line = stderr
        .lines()
        .find(|l| l.contains("oracle calls") && l.contains("wallclock"))
        .unwrap_or_else(|| panic!("no summary line in stderr:\n{}", stderr));

    // "<n> oracle calls" in the summary must match the number of per-call
    // progress lines actually printed above it, including the initial
    // interestingness check.
    let n_oracle_calls: usize = summary_line
        .split("oracle calls")
        .next()
        .unwrap()
        .split_whitespace()
        .last()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(n_oracle_calls, per_call_lines);
}

#[test]
fn writes_a_json_summary_sidecar() {
    let dir = tempdir::TempDir::new("lithium-it").unwrap();
    let test_case = dir.path().join("test.txt");
    fs::File::create(&test_case)
        .unwrap()
        .write_all(b"A\nB\n")
        .unwrap();
    let oracle = write_executable(dir.path(), "oracle.sh", "exit 0");

    let output = run_lithium(&[
        oracle.to_str().unwrap(),
        test_case.to_str().unwrap(),
        "--strategy=check-only",
    ]);
    assert!(output.status.success());

    let summary_path = test_case.with_extension("lithium-summary.json");
    assert!(summary_path.exists());
    let summary = read_to_string(&summary_path);
    assert!(summary.contains("check-only"));
}
