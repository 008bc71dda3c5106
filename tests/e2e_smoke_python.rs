use std::process::Command;
use tempfile::tempdir;

#[test]
fn smoke_python_flag_initializes_python_and_exits() {
    let home_dir = tempdir().expect("create temp home");
    let xdg_config_home = tempdir().expect("create temp xdg config home");

    let output = Command::new(binary_path())
        .arg("--smoke-python")
        .env_remove("PYREFLECT_LISTEN")
        .env("HOME", home_dir.path())
        .env("XDG_CONFIG_HOME", xdg_config_home.path())
        .output()
        .expect("run --smoke-python");

    assert!(
        output.status.success(),
        "--smoke-python should exit successfully"
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout is utf-8");
    assert!(
        stdout.contains("smoke-python: ok"),
        "smoke output should report success, got: {stdout:?}"
    );
}

#[test]
fn invalid_config_fails_before_starting() {
    let home_dir = tempdir().expect("create temp home");
    let xdg_config_home = tempdir().expect("create temp xdg config home");
    let config_dir = xdg_config_home.path().join("pyreflect");
    std::fs::create_dir_all(&config_dir).expect("create config dir");
    std::fs::write(config_dir.join("config.toml"), "bogus = true").expect("write config");

    let output = Command::new(binary_path())
        .arg("--smoke-python")
        .env_remove("PYREFLECT_LISTEN")
        .env("HOME", home_dir.path())
        .env("XDG_CONFIG_HOME", xdg_config_home.path())
        .output()
        .expect("run --smoke-python");

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).expect("stderr is utf-8");
    assert!(stderr.contains("Failed to load config"), "got: {stderr:?}");
}

fn binary_path() -> String {
    option_env!("CARGO_BIN_EXE_pyreflect")
        .map_or_else(|| "target/debug/pyreflect".to_string(), ToString::to_string)
}
