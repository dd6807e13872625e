use crate::config::{EditorConfigOverrides, DEFAULT_CONFIG_PATH};
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOverrides {
    config_path: Option<PathBuf>,
    asset_root: Option<PathBuf>,
    application: Option<PathBuf>,
    tick_ms: Option<u64>,
    settings_path: Option<PathBuf>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // program name
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                bail!("Unexpected argument '{flag}'. Flags take the form --name VALUE.");
            };
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            if value.is_empty() {
                bail!("Empty value for '{flag}'");
            }
            match key {
                "config" => overrides.config_path = Some(PathBuf::from(value)),
                "assets" => overrides.asset_root = Some(PathBuf::from(value)),
                "app" => overrides.application = Some(PathBuf::from(value)),
                "settings" => overrides.settings_path = Some(PathBuf::from(value)),
                "tick-ms" => {
                    overrides.tick_ms =
                        Some(value.parse::<u64>().with_context(|| format!("Invalid tick-ms '{value}'"))?);
                }
                _ => bail!("Unknown flag '{flag}'. Supported flags: --assets, --app, --tick-ms, --settings, --config."),
            }
        }
        Ok(overrides)
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn into_config_overrides(self) -> EditorConfigOverrides {
        EditorConfigOverrides {
            asset_root: self.asset_root,
            application: self.application,
            tick_ms: self.tick_ms,
            settings_path: self.settings_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_flag() {
        let args = [
            "pegasus_editor",
            "--assets",
            "demo/assets",
            "--app",
            "libdemo_app.so",
            "--tick-ms",
            "8",
            "--settings",
            "s.json",
            "--config",
            "c.json",
        ];
        let cli = CliOverrides::parse(args).expect("parse overrides");
        assert_eq!(cli.config_path(), PathBuf::from("c.json"));
        let overrides = cli.into_config_overrides();
        assert_eq!(overrides.asset_root, Some(PathBuf::from("demo/assets")));
        assert_eq!(overrides.application, Some(PathBuf::from("libdemo_app.so")));
        assert_eq!(overrides.tick_ms, Some(8));
        assert_eq!(overrides.settings_path, Some(PathBuf::from("s.json")));
    }

    #[test]
    fn latest_flag_wins_and_config_defaults() {
        let cli = CliOverrides::parse(["app", "--tick-ms", "4", "--tick-ms", "30"]).expect("parse overrides");
        assert_eq!(cli.config_path(), PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(cli.into_config_overrides().tick_ms, Some(30));
    }

    #[test]
    fn missing_value_errors() {
        let err = CliOverrides::parse(["app", "--assets"]).unwrap_err();
        assert!(err.to_string().contains("Expected a value"), "error should mention missing value");
    }

    #[test]
    fn rejects_unknown_flags_and_bad_numbers() {
        let err = CliOverrides::parse(["app", "--width", "800"]).unwrap_err();
        assert!(err.to_string().contains("Unknown flag"), "unknown flags should error");
        let err = CliOverrides::parse(["app", "--tick-ms", "fast"]).unwrap_err();
        assert!(err.to_string().contains("Invalid tick-ms"));
        let err = CliOverrides::parse(["app", "positional"]).unwrap_err();
        assert!(err.to_string().contains("Unexpected argument"));
    }
}
