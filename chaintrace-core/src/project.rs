//! Project shape checks run before anything is parsed.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{ChainTraceError, ChainTraceResult};
use crate::pom::POM_FILE;

/// Sources are only read from the main source set.
pub const SRC_MAIN_JAVA: &str = "src/main/java";

pub fn source_root(root: &Path) -> PathBuf {
    root.join(SRC_MAIN_JAVA)
}

/// Requires an existing directory with a `pom.xml` and a `src/main/java` tree.
pub fn validate_project(root: &Path) -> ChainTraceResult<()> {
    if !root.exists() {
        return Err(ChainTraceError::project(
            root,
            format!("Project path does not exist: {}", root.display()),
        ));
    }
    if !root.is_dir() {
        return Err(ChainTraceError::project(
            root,
            format!("Project path is not a directory: {}", root.display()),
        ));
    }
    if !root.join(POM_FILE).exists() {
        warn!(path = %root.join(POM_FILE).display(), "No pom.xml found");
        return Err(ChainTraceError::project(root, "No pom.xml found in project root"));
    }
    if !source_root(root).exists() {
        warn!(path = %source_root(root).display(), "No src/main/java directory found");
        return Err(ChainTraceError::project(root, "No src/main/java directory found"));
    }

    debug!(path = %root.display(), "Project validation passed");
    Ok(())
}

/// Rejects multi-module builds: any immediate sub-directory other than
/// dot directories, `src` and `target` that has its own `pom.xml`.
///
/// A root that cannot be listed only logs a warning.
pub fn check_single_module(root: &Path) -> ChainTraceResult<()> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Could not check for multi-module project structure");
            return Ok(());
        }
    };

    let has_modules = entries.filter_map(Result::ok).any(|entry| {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let path = entry.path();
        path.is_dir()
            && !name.starts_with('.')
            && name != "src"
            && name != "target"
            && path.join(POM_FILE).exists()
    });

    if has_modules {
        return Err(ChainTraceError::unsupported_project(
            root,
            "Multi-module Maven projects are not supported. Please analyze each module separately.",
        ));
    }
    Ok(())
}
