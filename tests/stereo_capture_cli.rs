//! Exit status and summary of the `stereo_capture` binary with stub cameras.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};

fn spawn(output_dir: &Path, left: &str, right: &str) -> Child {
    Command::new(env!("CARGO_BIN_EXE_stereo_capture"))
        .args(["--left", left, "--right", right])
        .args(["--width", "64", "--height", "48", "--ui", "plain"])
        .arg("--output-dir")
        .arg(output_dir)
        .current_dir(output_dir)
        .env_remove("STEREO_CAPTURE_CONFIG")
        .env_remove("STEREO_CAPTURE_LEFT")
        .env_remove("STEREO_CAPTURE_RIGHT")
        .env_remove("STEREO_CAPTURE_WIDTH")
        .env_remove("STEREO_CAPTURE_HEIGHT")
        .env_remove("STEREO_CAPTURE_OUTPUT_DIR")
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn stereo_capture")
}

fn count_files(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[test]
fn capture_then_quit_exits_zero_with_summary() {
    let dir = tempfile::tempdir().unwrap();
    let mut child = spawn(dir.path(), "stub://a", "stub://b");
    {
        let mut stdin = child.stdin.take().unwrap();
        stdin.write_all(b"\nq\n").unwrap();
    }
    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(output.status.success(), "stderr: {stderr}");
    assert!(stdout.contains("Total image pairs captured: 1"), "stdout: {stdout}");
    assert_eq!(count_files(&dir.path().join("camera0")), 1);
    assert_eq!(count_files(&dir.path().join("camera1")), 1);
}

#[test]
fn unavailable_right_camera_exits_one_without_summary() {
    let dir = tempfile::tempdir().unwrap();
    let child = spawn(dir.path(), "stub://a", "stub://b?unavailable");
    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr.contains("Error: right source stub://b?unavailable unavailable"),
        "stderr: {stderr}"
    );
    assert!(!stdout.contains("Total image pairs captured"), "stdout: {stdout}");
}

#[test]
fn read_failure_exits_one_after_summary() {
    let dir = tempfile::tempdir().unwrap();
    let mut child = spawn(dir.path(), "stub://a?fail_after=2", "stub://b");
    // Holding stdin open keeps end-of-input from quitting before the read fails.
    let stdin = child.stdin.take().unwrap();

    let mut stdout = String::new();
    child.stdout.take().unwrap().read_to_string(&mut stdout).unwrap();
    let status = child.wait().unwrap();
    drop(stdin);

    assert_eq!(status.code(), Some(1));
    assert!(stdout.contains("Total image pairs captured: 0"), "stdout: {stdout}");
    assert_eq!(count_files(&dir.path().join("camera0")), 0);
}
