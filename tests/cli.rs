//! End-to-end runs of the eksphemeral binary against fake scripts
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const LIST_SCRIPT: &str = r#"#!/bin/sh
case "$1" in
  "") echo '["a","b"]' ;;
  a) echo '{"name":"alpha","numworkers":1,"kubeversion":"1.12","timeout":20,"ttl":30,"owner":"a@example.com"}' ;;
  b) echo '{"name":"beta","numworkers":3,"kubeversion":"1.13","timeout":20,"ttl":60,"owner":"b@example.com"}' ;;
  abc123) echo '{"name":"","details":{}}' ;;
  *) exit 1 ;;
esac
"#;

fn write_script(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Script that leaves a marker file behind when it runs
fn write_marker_script(dir: &Path, name: &str) {
    let marker = dir.join(format!("{}.ran", name));
    write_script(
        dir,
        name,
        &format!("#!/bin/sh\necho \"$@\" > {}\n", marker.display()),
    );
}

fn ran(dir: &Path, name: &str) -> bool {
    dir.join(format!("{}.ran", name)).exists()
}

fn eksphemeral(home: Option<&Path>, args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_eksphemeral"));
    cmd.args(args)
        .env_remove("EKSPHEMERAL_HOME")
        .env_remove("EKSPHEMERAL_SCRIPT_TIMEOUT")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    if let Some(home) = home {
        cmd.env("EKSPHEMERAL_HOME", home);
    }
    cmd.output().unwrap()
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

#[test]
fn test_no_command_exits_1() {
    let output = eksphemeral(None, &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("This is EKSphemeral in version"));
}

#[test]
fn test_missing_home_exits_1_without_running_scripts() {
    let dir = TempDir::new().unwrap();
    write_marker_script(dir.path(), "eksp-up.sh");
    write_marker_script(dir.path(), "eksp-list.sh");

    let cases: [&[&str]; 4] = [&["install"], &["list"], &["prolong", "abc123", "30"], &["bogus"]];
    for args in cases {
        let output = eksphemeral(None, args);
        assert_eq!(output.status.code(), Some(1), "args: {:?}", args);
        assert!(String::from_utf8_lossy(&output.stderr).contains("EKSPHEMERAL_HOME"));
    }
    assert!(!ran(dir.path(), "eksp-up.sh"));
    assert!(!ran(dir.path(), "eksp-list.sh"));
}

#[test]
fn test_home_flag_overrides_environment() {
    let dir = TempDir::new().unwrap();
    write_marker_script(dir.path(), "eksp-up.sh");

    let home = dir.path().to_string_lossy().into_owned();
    let output = eksphemeral(None, &["install", "--home", &home]);
    assert_eq!(output.status.code(), Some(0));
    assert!(ran(dir.path(), "eksp-up.sh"));
}

#[test]
fn test_install_and_uninstall_stream_output() {
    let dir = TempDir::new().unwrap();
    write_script(dir.path(), "eksp-up.sh", "#!/bin/sh\necho installing\necho warn >&2\n");
    write_script(dir.path(), "eksp-down.sh", "#!/bin/sh\necho removing\n");

    let output = eksphemeral(Some(dir.path()), &["i"]);
    assert_eq!(output.status.code(), Some(0));
    let lines = stdout_lines(&output);
    assert!(lines.contains(&"installing".to_string()));
    assert!(lines.contains(&"warn".to_string()));

    let output = eksphemeral(Some(dir.path()), &["uninstall"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout_lines(&output).contains(&"removing".to_string()));
}

#[test]
fn test_create_with_missing_spec_exits_2() {
    let dir = TempDir::new().unwrap();
    write_marker_script(dir.path(), "eksp-create.sh");

    let output = eksphemeral(Some(dir.path()), &["create", "/nonexistent/cluster.json"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!ran(dir.path(), "eksp-create.sh"));
}

#[test]
fn test_create_passes_spec_file() {
    let dir = TempDir::new().unwrap();
    write_marker_script(dir.path(), "eksp-create.sh");
    let spec = dir.path().join("cluster.json");
    fs::write(&spec, "{\"numworkers\":2}").unwrap();

    let spec_arg = spec.to_string_lossy().into_owned();
    let output = eksphemeral(Some(dir.path()), &["c", &spec_arg]);
    assert_eq!(output.status.code(), Some(0));

    let args = fs::read_to_string(dir.path().join("eksp-create.sh.ran")).unwrap();
    assert_eq!(args.trim(), spec_arg);
}

#[test]
fn test_prolong_requires_two_arguments() {
    let dir = TempDir::new().unwrap();
    write_marker_script(dir.path(), "eksp-prolong.sh");

    let cases: [&[&str]; 3] = [&["prolong"], &["prolong", "abc123"], &["p", "abc123", "soon"]];
    for args in cases {
        let output = eksphemeral(Some(dir.path()), args);
        assert_eq!(output.status.code(), Some(3), "args: {:?}", args);
    }
    assert!(!ran(dir.path(), "eksp-prolong.sh"));

    let output = eksphemeral(Some(dir.path()), &["p", "abc123", "30"]);
    assert_eq!(output.status.code(), Some(0));
    let args = fs::read_to_string(dir.path().join("eksp-prolong.sh.ran")).unwrap();
    assert_eq!(args.trim(), "abc123 30");
}

#[test]
fn test_list_missing_cluster_prints_sentinel() {
    let dir = TempDir::new().unwrap();
    write_script(dir.path(), "eksp-list.sh", LIST_SCRIPT);

    let output = eksphemeral(Some(dir.path()), &["list", "abc123"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim_end(),
        "Cluster does not exist or control plane is down"
    );
}

#[test]
fn test_list_single_cluster_details() {
    let dir = TempDir::new().unwrap();
    write_script(dir.path(), "eksp-list.sh", LIST_SCRIPT);

    let output = eksphemeral(Some(dir.path()), &["ls", "a"]);
    let lines = stdout_lines(&output);
    assert_eq!(lines[0], "ID:\t\ta");
    assert_eq!(lines[1], "Name:\t\talpha");
    assert_eq!(lines[2], "Kubernetes:\tv1.12");
}

#[test]
fn test_list_failed_lookup_does_not_crash() {
    let dir = TempDir::new().unwrap();
    write_script(dir.path(), "eksp-list.sh", LIST_SCRIPT);

    let output = eksphemeral(Some(dir.path()), &["l", "unknown"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Cluster could be gone"));
}

#[test]
fn test_list_all_prints_table_in_order() {
    let dir = TempDir::new().unwrap();
    write_script(dir.path(), "eksp-list.sh", LIST_SCRIPT);

    for concurrency in ["1", "2"] {
        let output = eksphemeral(Some(dir.path()), &["list", "--concurrency", concurrency]);
        assert_eq!(output.status.code(), Some(0));

        let lines = stdout_lines(&output);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NAME"));
        assert!(lines[0].contains("NUM WORKERS"));
        assert!(lines[1].starts_with("alpha"));
        assert!(lines[2].starts_with("beta"));
    }
}

#[test]
fn test_list_all_empty() {
    let dir = TempDir::new().unwrap();
    write_script(dir.path(), "eksp-list.sh", "#!/bin/sh\necho '[]'\n");

    let output = eksphemeral(Some(dir.path()), &["list"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout_lines(&output), vec!["No clusters found"]);
}

#[test]
fn test_list_all_malformed() {
    let dir = TempDir::new().unwrap();
    write_script(dir.path(), "eksp-list.sh", "#!/bin/sh\necho '[\"a\",'\n");

    let output = eksphemeral(Some(dir.path()), &["list"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout_lines(&output).is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Can't render cluster spec"));
}

#[test]
fn test_unknown_verb_prints_usage() {
    let dir = TempDir::new().unwrap();

    let output = eksphemeral(Some(dir.path()), &["destroy"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Please specify one of the following commands"));
}

#[test]
fn test_script_failure_exit_code() {
    let dir = TempDir::new().unwrap();
    write_script(dir.path(), "eksp-up.sh", "#!/bin/sh\nexit 5\n");

    let output = eksphemeral(Some(dir.path()), &["install"]);
    assert_eq!(output.status.code(), Some(0));

    let output = eksphemeral(Some(dir.path()), &["install", "--strict"]);
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_timeout_kills_hung_script() {
    let dir = TempDir::new().unwrap();
    write_script(dir.path(), "eksp-up.sh", "#!/bin/sh\nexec sleep 30\n");

    let start = std::time::Instant::now();
    let output = eksphemeral(Some(dir.path()), &["install", "--timeout", "1", "--strict"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(start.elapsed() < std::time::Duration::from_secs(20));
}

#[test]
fn test_timeout_kills_whole_script_tree() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("finished");
    write_script(
        dir.path(),
        "eksp-up.sh",
        &format!("#!/bin/sh\n(sleep 3; touch {}) &\nwait\n", marker.display()),
    );

    let start = std::time::Instant::now();
    let output = eksphemeral(Some(dir.path()), &["install", "--timeout", "1", "--strict"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(start.elapsed() < std::time::Duration::from_millis(2500));

    std::thread::sleep(std::time::Duration::from_secs(3));
    assert!(!marker.exists());
}

#[test]
fn test_usage_errors_check_home_first() {
    let cases: [&[&str]; 3] = [&["--bogus"], &["list", "--bogus"], &["prolong", "x", "5", "--bogus"]];
    for args in cases {
        let output = eksphemeral(None, args);
        assert_eq!(output.status.code(), Some(1), "args: {:?}", args);
    }

    let dir = TempDir::new().unwrap();
    let output = eksphemeral(Some(dir.path()), &["--bogus"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Please specify one of the following commands"));
}

#[test]
fn test_extra_positionals_are_ignored() {
    let dir = TempDir::new().unwrap();
    write_script(dir.path(), "eksp-list.sh", LIST_SCRIPT);
    write_marker_script(dir.path(), "eksp-prolong.sh");

    let output = eksphemeral(None, &["list", "a", "b"]);
    assert_eq!(output.status.code(), Some(1));

    let output = eksphemeral(Some(dir.path()), &["list", "a", "b"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout_lines(&output)[1], "Name:\t\talpha");

    let output = eksphemeral(Some(dir.path()), &["prolong", "abc123", "30", "extra"]);
    assert_eq!(output.status.code(), Some(0));
    let args = fs::read_to_string(dir.path().join("eksp-prolong.sh.ran")).unwrap();
    assert_eq!(args.trim(), "abc123 30");
}

#[test]
fn test_create_with_extra_positional_uses_first() {
    let dir = TempDir::new().unwrap();
    write_marker_script(dir.path(), "eksp-create.sh");

    let output = eksphemeral(Some(dir.path()), &["create", "/nonexistent/cluster.json", "b"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!ran(dir.path(), "eksp-create.sh"));
}

#[test]
fn test_prolong_negative_minutes_exits_3() {
    let dir = TempDir::new().unwrap();
    write_marker_script(dir.path(), "eksp-prolong.sh");

    let output = eksphemeral(Some(dir.path()), &["prolong", "abc123", "-5"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(!ran(dir.path(), "eksp-prolong.sh"));
}
