//! Locating a MATLAB installation and its engine libraries.

use std::env;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    /// The platform this binary was built for, if MATLAB supports it.
    pub fn current() -> Option<Self> {
        if cfg!(target_os = "linux") {
            Some(Platform::Linux)
        } else if cfg!(target_os = "macos") {
            Some(Platform::MacOs)
        } else if cfg!(target_os = "windows") {
            Some(Platform::Windows)
        } else {
            None
        }
    }

    fn arch_dir(self, bits64: bool) -> Option<&'static str> {
        match (self, bits64) {
            (Platform::Linux, true) => Some("glnxa64"),
            (Platform::Linux, false) => Some("glnx86"),
            (Platform::MacOs, true) => Some("maci64"),
            (Platform::MacOs, false) => None,
            (Platform::Windows, true) => Some("win64"),
            (Platform::Windows, false) => Some("win32"),
        }
    }

    fn library_file(self, name: &str) -> String {
        match self {
            Platform::Linux => format!("{name}.so"),
            Platform::MacOs => format!("{name}.dylib"),
            Platform::Windows => format!("{name}.dll"),
        }
    }
}

/// Find the MATLAB root from the `matlab` launcher on `PATH`.
pub fn find_matlab_root() -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    find_matlab_root_in(&path)
}

/// Search a `PATH`-style list for `matlab` (or `matlab.exe`), resolve
/// symlinks, and return the directory two levels above the launcher.
pub fn find_matlab_root_in(path: &OsStr) -> Option<PathBuf> {
    for dir in env::split_paths(path) {
        let launcher = dir.join("matlab");
        for candidate in [launcher.clone(), launcher.with_extension("exe")] {
            if !candidate.is_file() {
                continue;
            }
            let resolved = fs::canonicalize(&candidate).unwrap_or(candidate);
            if let Some(root) = resolved.parent().and_then(Path::parent) {
                debug!("found MATLAB launcher at {}", resolved.display());
                return Some(root.to_path_buf());
            }
        }
    }
    None
}

/// Where the engine libraries live for one installation, and how to launch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineLayout {
    pub platform: Platform,
    pub lib_dir: PathBuf,
    pub libeng: PathBuf,
    pub libmx: PathBuf,
    /// Command passed to `engOpen`; `None` lets Windows pick the registered
    /// COM server.
    pub command: Option<String>,
}

impl EngineLayout {
    /// Layout for `root` on the current platform and pointer width.
    pub fn for_root(root: &Path, options: &str) -> Result<Self> {
        let platform = Platform::current().ok_or_else(|| unsupported(env::consts::OS, bits()))?;
        Self::for_platform(root, options, platform, cfg!(target_pointer_width = "64"))
    }

    pub fn for_platform(
        root: &Path,
        options: &str,
        platform: Platform,
        bits64: bool,
    ) -> Result<Self> {
        let bits = if bits64 { "64bit" } else { "32bit" };
        let arch = platform
            .arch_dir(bits64)
            .ok_or_else(|| unsupported(&format!("{platform:?}"), bits))?;
        let lib_dir = root.join("bin").join(arch);
        if !lib_dir.is_dir() {
            return Err(EngineError::Startup(format!(
                "this is a {bits} build, but there is no matching MATLAB installation in {}",
                lib_dir.display()
            )));
        }

        let command = match platform {
            Platform::Windows => None,
            Platform::Linux | Platform::MacOs => Some(format!(
                "{} {}",
                root.join("bin").join("matlab").display(),
                options
            )),
        };

        Ok(Self {
            platform,
            libeng: lib_dir.join(platform.library_file("libeng")),
            libmx: lib_dir.join(platform.library_file("libmx")),
            lib_dir,
            command,
        })
    }

    /// Log known problems with the host or the installed MATLAB release.
    pub fn check_environment(&self, version: Option<(u32, u32)>) {
        if self.platform == Platform::Linux && !Path::new("/bin/csh").exists() {
            warn!("MATLAB engine requires /bin/csh; the engine may fail to start without it");
        }
        match version {
            None => warn!("Unable to identify MATLAB (libeng) version"),
            Some((8, 3)) if matches!(self.platform, Platform::Linux | Platform::MacOs) => warn!(
                "MATLAB 8.3 (R2014a) on {:?} has a bug in engGetVariable(); {}",
                self.platform,
                "only double arrays will transfer correctly"
            ),
            Some(_) => {}
        }
    }
}

/// Parse the leading `major.minor` of a libeng version string.
pub fn parse_version(text: &str) -> Option<(u32, u32)> {
    let mut parts = text.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

fn bits() -> &'static str {
    if cfg!(target_pointer_width = "64") {
        "64bit"
    } else {
        "32bit"
    }
}

fn unsupported(system: &str, bits: &str) -> EngineError {
    EngineError::Startup(format!("Unsupported OS or architecture: {system} {bits}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_versions() {
        assert_eq!(parse_version("9.14"), Some((9, 14)));
        assert_eq!(parse_version("8.3.0.532"), Some((8, 3)));
        assert_eq!(parse_version("unknown"), None);
        assert_eq!(parse_version("9"), None);
    }

    #[test]
    fn mac_32bit_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineLayout::for_platform(dir.path(), "", Platform::MacOs, false).unwrap_err();
        assert!(matches!(err, EngineError::Startup(msg) if msg.contains("Unsupported")));
    }
}
