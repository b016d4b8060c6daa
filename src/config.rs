use crate::errors;
use std::path::PathBuf;

const NAME: &str = env!("CARGO_PKG_NAME");

/// Where builder state is kept.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreLocation {
    Directory(PathBuf),
    Memory,
}

/// Runtime settings resolved from the command line and environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub store: StoreLocation,
    pub assistant_cmd: Option<String>,
    pub history_path: Option<PathBuf>,
}

impl Config {
    /// Resolves settings, defaulting the data directory to `<data dir>/querycraft`.
    pub fn resolve(
        data_dir: Option<PathBuf>,
        ephemeral: bool,
        assistant_cmd: Option<String>,
    ) -> Result<Self, errors::Error> {
        let store = if ephemeral {
            StoreLocation::Memory
        } else {
            match data_dir {
                Some(dir) => StoreLocation::Directory(dir),
                None => StoreLocation::Directory(default_data_dir()?),
            }
        };
        Ok(Self {
            store,
            assistant_cmd: assistant_cmd.filter(|c| !c.trim().is_empty()),
            history_path: dirs::home_dir().map(|home| home.join(format!(".{}_history", NAME))),
        })
    }
}

pub fn default_data_dir() -> Result<PathBuf, errors::Error> {
    dirs::data_dir()
        .map(|dir| dir.join(NAME))
        .ok_or_else(|| err!(Other, "Failed to determine the user data directory. Use --data-dir."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ephemeral_wins_over_data_dir() {
        let config = Config::resolve(Some("/tmp/qc".into()), true, None).unwrap();
        assert_eq!(config.store, StoreLocation::Memory);
    }

    #[test]
    fn test_explicit_data_dir() {
        let config = Config::resolve(Some("/tmp/qc".into()), false, Some("llm".into())).unwrap();
        assert_eq!(config.store, StoreLocation::Directory("/tmp/qc".into()));
        assert_eq!(config.assistant_cmd.as_deref(), Some("llm"));
    }

    #[test]
    fn test_blank_assistant_command_is_ignored() {
        let config = Config::resolve(None, true, Some("  ".into())).unwrap();
        assert_eq!(config.assistant_cmd, None);
    }

    #[test]
    fn test_history_file_name() {
        let config = Config::resolve(None, true, None).unwrap();
        if let Some(path) = config.history_path {
            assert!(path.ends_with(".querycraft_history"));
        }
    }
}
