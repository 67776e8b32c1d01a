use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn unique_temp_dir(tag: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("lowerforge-it-{tag}-{now}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub fn write_source(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).expect("write source");
    path
}

fn binary_path() -> PathBuf {
    option_env!("CARGO_BIN_EXE_lowerforge")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("target/debug/lowerforge"))
}

/// Run the CLI with a clean `LOWERFORGE_*` environment.
pub fn run(args: &[&str]) -> Output {
    let mut command = Command::new(binary_path());
    command.args(args);
    for var in [
        "LOWERFORGE_LIBRARY",
        "LOWERFORGE_CLASS",
        "LOWERFORGE_KEEP_GOING",
        "LOWERFORGE_NO_WARN",
        "LOWERFORGE_WERROR",
        "LOWERFORGE_ERROR_FILE",
    ] {
        command.env_remove(var);
    }
    command.output().expect("run lowerforge")
}

pub fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
