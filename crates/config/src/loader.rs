use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    Error, Result,
    env_subst::substitute_env,
    schema::ChanstoreConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "chanstore.toml",
    "chanstore.yaml",
    "chanstore.yml",
    "chanstore.json",
];

/// Env var overriding `discord.token`.
pub const TOKEN_ENV: &str = "CHANSTORE_DISCORD_TOKEN";
/// Env var overriding `discord.guild_id`.
pub const GUILD_ID_ENV: &str = "CHANSTORE_GUILD_ID";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<ChanstoreConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./chanstore.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/chanstore/chanstore.{toml,yaml,yml,json}` (user-global)
///
/// Returns `ChanstoreConfig::default()` if no config file is found.
pub fn discover_and_load() -> ChanstoreConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    ChanstoreConfig::default()
}

/// Overlay `CHANSTORE_DISCORD_TOKEN` / `CHANSTORE_GUILD_ID` onto `config`.
pub fn apply_env_overrides(config: ChanstoreConfig) -> Result<ChanstoreConfig> {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    mut config: ChanstoreConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ChanstoreConfig> {
    if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
        config.discord.token = Secret::new(token.trim().to_string());
    }
    if let Some(raw) = lookup(GUILD_ID_ENV).filter(|g| !g.trim().is_empty()) {
        config.discord.guild_id = raw
            .trim()
            .parse()
            .map_err(|e| Error::invalid(format!("{GUILD_ID_ENV}={raw}: {e}")))?;
    }
    Ok(config)
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/chanstore/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "chanstore").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> Result<ChanstoreConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        _ => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret, std::io::Write};

    fn write_config(name: &str, body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_toml() {
        let (_dir, path) = write_config(
            "chanstore.toml",
            "[discord]\ntoken = \"tok\"\nguild_id = 1234\n",
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.discord.token.expose_secret(), "tok");
        assert_eq!(cfg.discord.guild_id, 1234);
    }

    #[test]
    fn loads_yaml_and_json() {
        let (_dir, path) = write_config(
            "chanstore.yaml",
            "discord:\n  token: yaml-tok\n  guild_id: \"55\"\n",
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.discord.token.expose_secret(), "yaml-tok");
        assert_eq!(cfg.discord.guild_id, 55);

        let (_dir, path) = write_config(
            "chanstore.json",
            r#"{"discord": {"token": "json-tok", "guild_id": 66}}"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.discord.token.expose_secret(), "json-tok");
        assert_eq!(cfg.discord.guild_id, 66);
    }

    #[test]
    fn rejects_unknown_extension() {
        let (_dir, path) = write_config("chanstore.ini", "token=x");
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat { extension }) if extension == "ini"
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let (_dir, path) = write_config("chanstore.toml", "[discord\ntoken = ");
        assert!(matches!(load_config(&path), Err(Error::Parse { .. })));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let lookup = |name: &str| match name {
            TOKEN_ENV => Some("env-tok".to_string()),
            GUILD_ID_ENV => Some(" 777 ".to_string()),
            _ => None,
        };
        let cfg = apply_env_overrides_with(ChanstoreConfig::default(), lookup).unwrap();
        assert_eq!(cfg.discord.token.expose_secret(), "env-tok");
        assert_eq!(cfg.discord.guild_id, 777);
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut base = ChanstoreConfig::default();
        base.discord.guild_id = 9;
        let cfg = apply_env_overrides_with(base, |_| Some("  ".to_string())).unwrap();
        assert_eq!(cfg.discord.guild_id, 9);
    }

    #[test]
    fn bad_guild_id_env_is_invalid() {
        let lookup = |name: &str| (name == GUILD_ID_ENV).then(|| "main".to_string());
        let err = apply_env_overrides_with(ChanstoreConfig::default(), lookup).unwrap_err();
        assert!(matches!(err, Error::Invalid { .. }));
    }
}
