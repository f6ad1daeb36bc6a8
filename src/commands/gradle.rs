use std::path::{Path, PathBuf};

use super::Captured;
use crate::process::locator::gradle_wrapper_name;

/// Default variant assembled when the caller names none.
pub const DEFAULT_BUILD_TYPE: &str = "Debug";

/// Path of the wrapper script inside `project_dir`.
pub fn wrapper_path(project_dir: &Path) -> PathBuf {
    project_dir.join(gradle_wrapper_name())
}

/// `assemble<BuildType>`, with the build type's first letter upper-cased so
/// `release` and `Release` name the same task.
pub fn assemble_task(build_type: &str) -> String {
    let build_type = build_type.trim();
    let build_type = if build_type.is_empty() {
        DEFAULT_BUILD_TYPE
    } else {
        build_type
    };
    let mut chars = build_type.chars();
    match chars.next() {
        Some(first) => format!("assemble{}{}", first.to_uppercase(), chars.as_str()),
        None => format!("assemble{DEFAULT_BUILD_TYPE}"),
    }
}

pub fn assemble(build_type: &str) -> Vec<String> {
    vec![assemble_task(build_type)]
}

/// Build logs are spread over both streams, so failures carry both.
pub fn failure_detail(captured: &Captured) -> String {
    format!("\n{}\n{}", captured.stdout_text(), captured.stderr_text())
}

/// Successful build output: stdout, a newline, then stderr.
pub fn build_log(captured: &Captured) -> String {
    format!("{}\n{}", captured.stdout_text(), captured.stderr_text())
}
