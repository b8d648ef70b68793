use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::abac::mask::MaskMode;
use crate::abac::types::Resolution;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub server: Server,
    pub engine: Engine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Engine {
    /// Rule tree: a JSON file or a directory of JSON files. Default: rules
    pub rules_path: PathBuf,
    /// Verdict when no rule matches. Default: deny
    #[serde(default)]
    pub default_resolution: Resolution,
    /// How mask entries are applied: "nested" (dotted paths) or "top_level"
    #[serde(default)]
    pub mask_mode: MaskMode,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8181,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from("rules"),
            default_resolution: Resolution::Deny,
            mask_mode: MaskMode::Nested,
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("server.host", Server::default().host)
            .into_diagnostic()?
            .set_default("server.port", Server::default().port)
            .into_diagnostic()?
            .set_default(
                "engine.rules_path",
                Engine::default().rules_path.to_string_lossy().to_string(),
            )
            .into_diagnostic()?
            .set_default(
                "engine.default_resolution",
                Engine::default().default_resolution.to_string(),
            )
            .into_diagnostic()?
            .set_default("engine.mask_mode", "nested")
            .into_diagnostic()?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: PALISADE__SERVER__PORT=9090, etc.
        builder = builder.add_source(config::Environment::with_prefix("PALISADE").separator("__"));

        let cfg = builder.build().into_diagnostic()?;
        let mut s: Settings = cfg.try_deserialize().into_diagnostic()?;

        // Normalize rules path to be relative to current dir
        if s.engine.rules_path.is_relative() {
            s.engine.rules_path = std::env::current_dir()
                .into_diagnostic()?
                .join(&s.engine.rules_path);
        }

        Ok(s)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_settings_load_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nonexistent.toml");

        let settings = Settings::load(config_path.to_str().unwrap())
            .expect("Failed to load settings");

        assert_eq!(settings.server.port, 8181);
        assert_eq!(settings.engine.default_resolution, Resolution::Deny);
        assert!(settings.engine.rules_path.ends_with("rules"));
    }

    #[test]
    fn test_settings_load_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");

        let config_content = r#"
[server]
host = "127.0.0.1"
port = 9090

[engine]
rules_path = "/etc/palisade/rules.json"
default_resolution = "allow"
mask_mode = "top_level"
"#;
        fs::write(&config_path, config_content).expect("Failed to write config");

        let settings = Settings::load(config_path.to_str().unwrap())
            .expect("Failed to load settings");

        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.bind_addr(), "127.0.0.1:9090");
        assert_eq!(
            settings.engine.rules_path,
            PathBuf::from("/etc/palisade/rules.json")
        );
        assert_eq!(settings.engine.default_resolution, Resolution::Allow);
        assert_eq!(settings.engine.mask_mode, MaskMode::TopLevel);
    }

    #[test]
    fn test_settings_env_override() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");

        let config_content = r#"
[server]
host = "127.0.0.1"
"#;
        fs::write(&config_path, config_content).expect("Failed to write config");

        // Other tests do not assert on the host, so overriding it is race-free
        env::set_var("PALISADE__SERVER__HOST", "192.168.1.1");

        let settings = Settings::load(config_path.to_str().unwrap())
            .expect("Failed to load settings");

        assert_eq!(settings.server.host, "192.168.1.1");

        env::remove_var("PALISADE__SERVER__HOST");
    }

    #[test]
    fn test_settings_path_normalization() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");

        let config_content = r#"
[engine]
rules_path = "relative/rules"
"#;
        fs::write(&config_path, config_content).expect("Failed to write config");

        let settings = Settings::load(config_path.to_str().unwrap())
            .expect("Failed to load settings");

        assert!(settings.engine.rules_path.is_absolute());
        assert!(settings.engine.rules_path.ends_with("relative/rules"));
    }

    #[test]
    fn test_engine_default() {
        let engine = Engine::default();
        assert_eq!(engine.default_resolution, Resolution::Deny);
        assert_eq!(engine.mask_mode, MaskMode::Nested);
    }
}
