use std::env;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

/// Resolves `program` to an executable file.
///
/// A bare name (single path component) is looked up on `PATH` with `which`;
/// anything else is treated as a path and must exist, be a regular file, and
/// be executable. The error string is suitable as a `LaunchFailed` reason.
pub fn locate(program: &Path) -> Result<PathBuf, String> {
    if program.as_os_str().is_empty() {
        return Err("empty program name".to_string());
    }

    if program.components().count() > 1 || program.is_absolute() {
        return check_executable(program).map(|()| program.to_path_buf());
    }

    which::which(program).map_err(|e| not_on_path(program, e))
}

/// Looks `program` up in a `PATH`-style directory list instead of the
/// process environment.
pub fn search_path(program: &Path, path_var: &OsStr) -> Result<PathBuf, String> {
    let cwd = env::current_dir().map_err(|e| e.to_string())?;
    which::which_in(program, Some(path_var), cwd).map_err(|e| not_on_path(program, e))
}

fn not_on_path(program: &Path, err: which::Error) -> String {
    format!("'{}' was not found on PATH ({})", program.display(), err)
}

fn check_executable(path: &Path) -> Result<(), String> {
    let meta = path
        .metadata()
        .map_err(|_| format!("not found at {}", path.display()))?;
    if !meta.is_file() {
        return Err(format!("{} is not a file", path.display()));
    }
    if !is_executable(&meta) {
        return Err(format!("{} is not executable", path.display()));
    }
    Ok(())
}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    true
}

/// Adds execute permission to `path` when it lacks it. No-op off Unix.
pub fn ensure_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = path.metadata()?.permissions();
        let mode = perms.mode();
        if mode & 0o111 == 0 {
            perms.set_mode(mode | 0o755);
            std::fs::set_permissions(path, perms)?;
        }
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// File name of the Gradle wrapper script on this platform.
pub fn gradle_wrapper_name() -> &'static str {
    if cfg!(windows) {
        "gradlew.bat"
    } else {
        "gradlew"
    }
}

/// Picks the adb program: the SDK's `platform-tools/adb` when `ANDROID_HOME`
/// or `ANDROID_SDK_ROOT` points at an SDK that has one, otherwise `adb` on `PATH`.
pub fn default_adb_program() -> PathBuf {
    let exe = if cfg!(windows) { "adb.exe" } else { "adb" };
    for var in ["ANDROID_HOME", "ANDROID_SDK_ROOT"] {
        if let Some(root) = env::var_os(var) {
            let candidate = PathBuf::from(root).join("platform-tools").join(exe);
            if candidate.is_file() {
                return candidate;
            }
        }
    }
    PathBuf::from("adb")
}
