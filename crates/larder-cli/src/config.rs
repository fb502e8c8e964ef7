// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use larder_app::{IngredientColumn, RecipeColumn, SortKey};
use larder_view::{DEFAULT_PER_PAGE, ViewConfig, parse_sort_key};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_VERSION: i64 = 1;
const DEFAULT_KEY_PER_PAGE: usize = 15;
const DEFAULT_SORT: &str = "title";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub view: View,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            view: View::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct View {
    pub per_page: Option<i64>,
    pub key_per_page: Option<i64>,
    pub default_sort: Option<Vec<String>>,
}

impl Default for View {
    fn default() -> Self {
        Self {
            per_page: Some(DEFAULT_PER_PAGE as i64),
            key_per_page: Some(DEFAULT_KEY_PER_PAGE as i64),
            default_sort: Some(vec![DEFAULT_SORT.to_owned()]),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("LARDER_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set LARDER_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(larder_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and move values under [storage] and [view]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            larder_db::validate_db_path(db_path)?;
        }

        for (name, value) in [
            ("view.per_page", self.view.per_page),
            ("view.key_per_page", self.view.key_per_page),
        ] {
            if let Some(value) = value
                && value <= 0
            {
                bail!(
                    "{name} in {} must be positive, got {value}",
                    path.display()
                );
            }
        }

        self.default_sort()
            .with_context(|| format!("invalid view.default_sort in {}", path.display()))?;
        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => larder_db::default_db_path(),
        }
    }

    pub fn per_page(&self) -> usize {
        positive(self.view.per_page).unwrap_or(DEFAULT_PER_PAGE)
    }

    pub fn key_per_page(&self) -> usize {
        positive(self.view.key_per_page).unwrap_or(DEFAULT_KEY_PER_PAGE)
    }

    pub fn default_sort(&self) -> Result<Vec<SortKey<RecipeColumn>>> {
        let specs = match &self.view.default_sort {
            Some(specs) => specs.clone(),
            None => vec![DEFAULT_SORT.to_owned()],
        };
        let mut keys: Vec<SortKey<RecipeColumn>> = Vec::with_capacity(specs.len());
        for spec in &specs {
            let key = parse_sort_key(spec)?;
            if keys.iter().any(|prior| prior.column == key.column) {
                bail!("sort column {spec:?} is listed twice");
            }
            keys.push(key);
        }
        Ok(keys)
    }

    pub fn recipe_view(&self) -> Result<ViewConfig<RecipeColumn>> {
        Ok(ViewConfig {
            per_page: self.per_page(),
            default_sort: self.default_sort()?,
        })
    }

    pub fn key_view(&self) -> ViewConfig<IngredientColumn> {
        ViewConfig {
            per_page: self.key_per_page(),
            default_sort: vec![SortKey::asc(IngredientColumn::IngKey)],
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# larder config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/larder/larder.db)\n# db_path = \"/absolute/path/to/larder.db\"\n\n[view]\nper_page = {}\nkey_per_page = {}\n# Column names; prefix with - to sort descending.\ndefault_sort = [\"{}\"]\n",
            path.display(),
            DEFAULT_PER_PAGE,
            DEFAULT_KEY_PER_PAGE,
            DEFAULT_SORT,
        )
    }
}

fn positive(value: Option<i64>) -> Option<usize> {
    value
        .filter(|value| *value > 0)
        .and_then(|value| usize::try_from(value).ok())
}

#[cfg(test)]
mod tests {
    use super::Config;
    use anyhow::Result;
    use larder_app::{IngredientColumn, RecipeColumn, SortKey};
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.per_page(), 12);
        assert_eq!(config.key_per_page(), 15);
        assert_eq!(config.default_sort()?, vec![SortKey::asc(RecipeColumn::Title)]);
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[view]\nper_page = 20\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[storage] and [view]"));
        Ok(())
    }

    #[test]
    fn v1_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[view]\nper_page = 20\nkey_per_page = 30\ndefault_sort = [\"-rating\", \"title\"]\n",
        )?;
        let config = Config::load(&path)?;
        let view = config.recipe_view()?;
        assert_eq!(view.per_page, 20);
        assert_eq!(
            view.default_sort,
            vec![
                SortKey::desc(RecipeColumn::Rating),
                SortKey::asc(RecipeColumn::Title)
            ]
        );
        let keys = config.key_view();
        assert_eq!(keys.per_page, 30);
        assert_eq!(keys.default_sort, vec![SortKey::asc(IngredientColumn::IngKey)]);
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn page_sizes_must_be_positive() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[view]\nper_page = 0\n")?;
        let error = Config::load(&path).expect_err("zero page size should fail");
        assert!(error.to_string().contains("view.per_page"));
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn default_sort_rejects_unknown_unsortable_and_repeated_columns() -> Result<()> {
        for (spec, expected) in [
            ("[\"flavour\"]", "unknown sort column"),
            ("[\"instructions\"]", "cannot sort by instructions"),
            ("[\"title\", \"-title\"]", "listed twice"),
        ] {
            let (_temp, path) =
                write_config(&format!("version = 1\n[view]\ndefault_sort = {spec}\n"))?;
            let error = Config::load(&path).expect_err("bad sort should fail");
            let message = format!("{error:#}");
            assert!(message.contains("view.default_sort"), "got {message}");
            assert!(message.contains(expected), "got {message}");
        }
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("LARDER_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("LARDER_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn db_path_prefers_storage_config_over_env_override() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) =
            write_config("version = 1\n[storage]\ndb_path = \"/explicit/from-config.db\"\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("LARDER_DB_PATH", "/from/env.db");
        }
        let config = Config::load(&path)?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("LARDER_DB_PATH");
        }
        assert_eq!(config.db_path()?, PathBuf::from("/explicit/from-config.db"));
        Ok(())
    }

    #[test]
    fn db_path_defaults_to_larder_db_when_unset() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var("LARDER_DB_PATH");
        }
        let config = Config::load(&path)?;
        let resolved = config.db_path()?;
        assert!(
            resolved.ends_with("larder.db"),
            "got {}",
            resolved.display()
        );
        Ok(())
    }

    #[test]
    fn db_path_rejects_uri_style_storage_value() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[storage]\ndb_path = \"https://example.com/larder.db\"\n")?;
        let error = Config::load(&path).expect_err("URI db_path should fail validation");
        let message = error.to_string();
        assert!(
            message.contains("looks like a URI") || message.contains("filesystem path"),
            "unexpected message: {message}"
        );
        Ok(())
    }

    #[test]
    fn example_config_round_trips() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        assert!(example.contains("[storage]"));
        assert!(example.contains("[view]"));
        std::fs::write(&path, &example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.per_page(), 12);
        Ok(())
    }
}
