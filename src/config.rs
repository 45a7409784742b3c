use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_SOLVER: &str = "build/tinydpll";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Bound used when answering a single interactive request.
pub const WEB_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_PREVIEW_LEN: usize = 200;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarnessConfig {
    pub solver: PathBuf,
    pub timeout: Duration,
    /// Number of characters of solver output shown for failing cases.
    pub preview_len: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            solver: PathBuf::from(DEFAULT_SOLVER),
            timeout: DEFAULT_TIMEOUT,
            preview_len: DEFAULT_PREVIEW_LEN,
        }
    }
}

/// Contents of an optional `satcheck.toml`. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub solver: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub preview_len: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::parse(&text)
            .map_err(|e| Error::Configuration(format!("bad config {}: {e}", path.display())))
    }

    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

impl HarnessConfig {
    pub fn web() -> Self {
        Self {
            timeout: WEB_TIMEOUT,
            ..Self::default()
        }
    }

    /// Layers the file's values over `self`.
    pub fn merge(mut self, file: FileConfig) -> Self {
        if let Some(solver) = file.solver {
            self.solver = solver;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(preview_len) = file.preview_len {
            self.preview_len = preview_len;
        }
        self
    }

    /// Checks that the solver binary can be run at all.
    pub fn validate(&self) -> Result<()> {
        let metadata = fs::metadata(&self.solver).map_err(|_| {
            Error::Configuration(format!(
                "solver binary not found at {}",
                self.solver.display()
            ))
        })?;
        if !metadata.is_file() {
            return Err(Error::Configuration(format!(
                "solver path {} is not a file",
                self.solver.display()
            )));
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            if metadata.permissions().mode() & 0o111 == 0 {
                return Err(Error::Configuration(format!(
                    "solver binary {} is not executable",
                    self.solver.display()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf, time::Duration};

    use super::{FileConfig, HarnessConfig, DEFAULT_TIMEOUT, WEB_TIMEOUT};
    use crate::error::Error;

    #[test]
    fn defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.solver, PathBuf::from("build/tinydpll"));
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.preview_len, 200);
        assert_eq!(HarnessConfig::web().timeout, WEB_TIMEOUT);
    }

    #[test]
    fn file_overrides() {
        let file = FileConfig::parse("solver = \"/opt/dpll\"\ntimeout_secs = 3\n").unwrap();
        let config = HarnessConfig::default().merge(file);
        assert_eq!(config.solver, PathBuf::from("/opt/dpll"));
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.preview_len, 200);
    }

    #[test]
    fn unknown_key_rejected() {
        assert!(FileConfig::parse("solvr = \"x\"\n").is_err());
    }

    #[test]
    fn load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("satcheck.toml");
        fs::write(&path, "timeout_secs = \"soon\"\n").unwrap();
        match FileConfig::load(&path) {
            Err(Error::Configuration(message)) => assert!(message.contains("satcheck.toml")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_solver() {
        let config = HarnessConfig {
            solver: PathBuf::from("/definitely/not/here/tinydpll"),
            ..HarnessConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn directory_is_not_a_solver() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig {
            solver: dir.path().to_path_buf(),
            ..HarnessConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_solver() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solver");
        fs::write(&path, "#!/bin/sh\n").unwrap();
        let config = HarnessConfig {
            solver: path,
            ..HarnessConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }
}
