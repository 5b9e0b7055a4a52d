#![allow(dead_code)]

use cscope_project::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

// Writing an executable while another test thread forks can make the exec
// fail with ETXTBSY, so script creation and process spawning are serialized.
static SPAWN_LOCK: Mutex<()> = Mutex::new(());

pub fn spawn_guard() -> MutexGuard<'static, ()> {
    SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Stand-in for cscope: logs its arguments next to itself and copies the
/// file list to the output path.
pub const FAKE_CSCOPE: &str = r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/cscope.log"
while [ $# -gt 0 ]; do
  case "$1" in
    -i) list="$2"; shift ;;
    -f) out="$2"; shift ;;
  esac
  shift
done
cp "$list" "$out"
"#;

pub const FAILING_CSCOPE: &str = "#!/bin/sh\necho 'cscope: cannot open file' >&2\nexit 3\n";

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn fake_cscope(dir: &Path) -> PathBuf {
    write_script(dir, "cscope", FAKE_CSCOPE)
}

/// Arguments of every run of the fake cscope in `dir`.
pub fn cscope_invocations(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("cscope.log"))
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn settings(cscope_dir: &Path, cscope_program: &Path) -> Settings {
    Settings {
        cscope_dir: cscope_dir.to_path_buf(),
        cscope_program: cscope_program.to_string_lossy().to_string(),
        ..Settings::default()
    }
}

/// `a.c`, `b.h` and `readme.txt` under `<dir>/proj`.
pub fn demo_project(dir: &Path) -> PathBuf {
    let root = dir.join("proj");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("a.c"), "int main(void) { return 0; }\n").unwrap();
    fs::write(root.join("b.h"), "#define B 1\n").unwrap();
    fs::write(root.join("readme.txt"), "demo\n").unwrap();
    root
}

pub fn write_config(dir: &Path, file: &str, body: &str) -> PathBuf {
    let path = dir.join(file);
    fs::write(&path, body).unwrap();
    path
}

pub fn demo_config(dir: &Path, root: &Path) -> PathBuf {
    write_config(
        dir,
        "cscope.cfg",
        &format!("name = demo\npath = {}\nfiles = *.c,*.h\nlibs =\n", root.display()),
    )
}

pub fn sorted_lines(path: &Path) -> Vec<String> {
    let mut lines: Vec<String> = fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    lines.sort();
    lines
}
