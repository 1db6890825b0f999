//! Operating system detection and per-user config location.

use std::fmt;
use std::path::PathBuf;

/// The operating system family of the host receiving input.
///
/// Only macOS and Windows have swipe chords; everything else is grouped so
/// that gesture lookups can return `None` for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostPlatform {
    MacOs,
    Windows,
    Linux,
    Other,
}

impl HostPlatform {
    /// Returns the platform this binary was compiled for.
    pub fn current() -> Self {
        #[cfg(target_os = "macos")]
        {
            HostPlatform::MacOs
        }
        #[cfg(target_os = "windows")]
        {
            HostPlatform::Windows
        }
        #[cfg(target_os = "linux")]
        {
            HostPlatform::Linux
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        {
            HostPlatform::Other
        }
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostPlatform::MacOs => "macos",
            HostPlatform::Windows => "windows",
            HostPlatform::Linux => "linux",
            HostPlatform::Other => "other",
        };
        f.write_str(name)
    }
}

/// Returns the per-user directory Rein keeps its files in, or `None` when
/// the environment does not say where that is.
///
/// - Windows:  `%APPDATA%\Rein`
/// - Linux:    `$XDG_CONFIG_HOME/rein` or `~/.config/rein`
/// - macOS:    `~/Library/Application Support/Rein`
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Rein"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("rein"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Library").join("Application Support").join("Rein"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_matches_compile_target() {
        let platform = HostPlatform::current();
        if cfg!(target_os = "linux") {
            assert_eq!(platform, HostPlatform::Linux);
        } else if cfg!(target_os = "macos") {
            assert_eq!(platform, HostPlatform::MacOs);
        } else if cfg!(target_os = "windows") {
            assert_eq!(platform, HostPlatform::Windows);
        }
    }

    #[test]
    fn test_config_dir_is_rein_specific() {
        if let Some(dir) = config_dir() {
            let name = dir.file_name().unwrap().to_string_lossy().to_lowercase();
            assert_eq!(name, "rein");
        }
    }

    #[test]
    fn test_display_is_lowercase() {
        assert_eq!(HostPlatform::MacOs.to_string(), "macos");
        assert_eq!(HostPlatform::Other.to_string(), "other");
    }
}
