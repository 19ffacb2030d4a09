use std::fs;
use std::path::Path;
use std::process::Command;

/// Run a .wren file with the wrenvm CLI and return (stdout, stderr, exit_code)
fn run_wren_file(path: &Path, extra_args: &[&str]) -> (String, String, i32) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_wrenvm"));
    cmd.arg("run");
    cmd.arg(path);
    for arg in extra_args {
        cmd.arg(arg);
    }
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));

    let output = cmd.output().expect("failed to execute wrenvm");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

/// Run a single snapshot test.
///
/// Next to `name.wren` may sit `name.stdout` (exact match), `name.stderr`
/// (substring), `name.exitcode` (default 0) and `name.args` (one extra CLI
/// argument per line).
fn run_snapshot_test(wren_path: &Path) {
    let base_path = wren_path.with_extension("");

    let mut extra_args = Vec::new();
    let args_path = base_path.with_extension("args");
    if args_path.exists() {
        let args_content = fs::read_to_string(&args_path)
            .unwrap_or_else(|e| panic!("Failed to read {:?}: {}", args_path, e));
        for arg in args_content.lines() {
            let arg = arg.trim();
            if !arg.is_empty() && !arg.starts_with('#') {
                extra_args.push(arg.to_string());
            }
        }
    }

    let extra_args_refs: Vec<&str> = extra_args.iter().map(|s| s.as_str()).collect();
    let (actual_stdout, actual_stderr, actual_exitcode) = run_wren_file(wren_path, &extra_args_refs);

    // Check stdout (exact match)
    let stdout_path = base_path.with_extension("stdout");
    if stdout_path.exists() {
        let expected_stdout = fs::read_to_string(&stdout_path)
            .unwrap_or_else(|e| panic!("Failed to read {:?}: {}", stdout_path, e));
        assert_eq!(
            actual_stdout, expected_stdout,
            "stdout mismatch for {:?}\n--- expected ---\n{}\n--- actual ---\n{}\n--- stderr ---\n{}",
            wren_path, expected_stdout, actual_stdout, actual_stderr
        );
    }

    // Check stderr (partial match - expected must be contained in actual)
    let stderr_path = base_path.with_extension("stderr");
    if stderr_path.exists() {
        let expected_stderr = fs::read_to_string(&stderr_path)
            .unwrap_or_else(|e| panic!("Failed to read {:?}: {}", stderr_path, e));
        assert!(
            actual_stderr.contains(&expected_stderr),
            "stderr mismatch for {:?}\n--- expected (substring) ---\n{}\n--- actual ---\n{}",
            wren_path, expected_stderr, actual_stderr
        );
    }

    // Check exit code (default: 0)
    let exitcode_path = base_path.with_extension("exitcode");
    let expected_exitcode = if exitcode_path.exists() {
        fs::read_to_string(&exitcode_path)
            .unwrap_or_else(|e| panic!("Failed to read {:?}: {}", exitcode_path, e))
            .trim()
            .parse::<i32>()
            .unwrap_or_else(|e| panic!("Invalid exitcode in {:?}: {}", exitcode_path, e))
    } else {
        0
    };

    assert_eq!(
        actual_exitcode, expected_exitcode,
        "exit code mismatch for {:?}: expected {}, got {}\n--- stderr ---\n{}",
        wren_path, expected_exitcode, actual_exitcode, actual_stderr
    );
}

/// Discover and run all .wren tests in a directory
fn run_snapshot_dir(dir: &str) {
    let dir_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
        .join(dir);

    let mut entries: Vec<_> = fs::read_dir(&dir_path)
        .unwrap_or_else(|e| panic!("Failed to read {:?}: {}", dir_path, e))
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "wren"))
        .collect();
    entries.sort();
    assert!(!entries.is_empty(), "no snapshot tests in {:?}", dir_path);

    for path in entries {
        run_snapshot_test(&path);
    }
}

#[test]
fn snapshot_basic() {
    run_snapshot_dir("basic");
}

#[test]
fn snapshot_errors() {
    run_snapshot_dir("errors");
}

#[test]
fn snapshot_fibers() {
    run_snapshot_dir("fibers");
}

#[test]
fn snapshot_gc() {
    run_snapshot_dir("gc");
}
