//! Loading [`StorageConfig`] from defaults, a config file and the environment.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use std::path::Path;
use storage::config::{DEFAULT_BLOCK_SIZE, DEFAULT_DIRECTORY};
use storage::StorageConfig;

/// Prefix of environment overrides, e.g. `SDB_BLOCK_SIZE=8192`.
pub const ENV_PREFIX: &str = "SDB";

/// Builds the storage configuration.
///
/// Later sources win: built-in defaults, then the file at `path` (any format
/// the `config` crate recognises by extension), then `SDB_*` variables.
pub fn load(path: Option<&Path>) -> Result<StorageConfig> {
    load_with_env(path, Environment::with_prefix(ENV_PREFIX))
}

fn load_with_env(path: Option<&Path>, env: Environment) -> Result<StorageConfig> {
    let mut builder = Config::builder()
        .set_default("directory", DEFAULT_DIRECTORY)?
        .set_default("block_size", DEFAULT_BLOCK_SIZE as i64)?;

    if let Some(path) = path {
        builder = builder.add_source(File::from(path));
    }
    builder = builder.add_source(env.try_parsing(true));

    let config = builder
        .build()
        .context("Failed to read configuration")?
        .try_deserialize::<StorageConfig>()
        .context("Invalid storage configuration")?;

    log::debug!("Loaded {:?}", config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    // Tests read a fixed variable set, never the developer's own `SDB_*`.
    fn load_with(path: &Path, vars: &[(&str, &str)]) -> Result<StorageConfig> {
        let vars: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_with_env(
            Some(path),
            Environment::with_prefix(ENV_PREFIX).source(Some(vars)),
        )
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("sdb.toml");
        fs::write(
            &path,
            "directory = \"/var/lib/sdb\"\nblock_size = 512\nmax_open_files = 16\n",
        )?;

        let config = load_with(&path, &[])?;

        assert_eq!(config.directory, PathBuf::from("/var/lib/sdb"));
        assert_eq!(config.block_size, 512);
        assert_eq!(config.max_open_files, Some(16));
        Ok(())
    }

    #[test]
    fn test_file_fills_in_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("sdb.json");
        fs::write(&path, r#"{ "directory": "db" }"#)?;

        let config = load_with(&path, &[])?;

        assert_eq!(config.directory, PathBuf::from("db"));
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
        Ok(())
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let result = load_with(&dir.path().join("absent.toml"), &[]);

        assert!(result.is_err());
    }

    #[test]
    fn test_environment_overrides_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("sdb.toml");
        fs::write(&path, "block_size = 512\n")?;

        let config = load_with(&path, &[("SDB_BLOCK_SIZE", "8192")])?;

        assert_eq!(config.block_size, 8192);
        assert_eq!(config.directory, PathBuf::from(DEFAULT_DIRECTORY));
        Ok(())
    }
}
