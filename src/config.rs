//! Ambient TOML configuration (§4.G **[ADDED]**): session-start defaults for
//! the policy knobs and the default database path, loaded the way
//! `init.rs`'s `INITSQL` seeds default schema in the teacher — a single
//! "install defaults once at open" step, just sourced from a file instead
//! of an embedded SQL string.
//!
//! Two-tier precedence (file default, then SQL override via
//! `config(key, value)`), collapsing the teacher's three-tier
//! module-args/SQL-function/session-default precedence since this crate has
//! no per-module argument syntax.

use std::path::Path;

use serde::Deserialize;

use crate::error::{EngineError, EngineResult};
use crate::policy::Policy;

/// Deserialized `idasql.toml`. Every field is optional; an absent file or an
/// absent field falls back to the compiled-in default (`cache=on`,
/// `undo=on`, `batch=off`, no default database path).
#[derive(Debug, Default, Deserialize)]
pub struct IdasqlConfig {
    pub cache: Option<bool>,
    pub undo: Option<bool>,
    pub batch: Option<bool>,
    pub default_database: Option<String>,
}

impl IdasqlConfig {
    /// Loads and parses `path`. A missing file is not an error — callers use
    /// [`IdasqlConfig::load_optional`] for the common "maybe there's a config"
    /// case.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::InvalidArgument(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&text)
            .map_err(|e| EngineError::InvalidArgument(format!("parsing {}: {e}", path.display())))
    }

    /// Loads `path` if it exists, otherwise returns compiled-in defaults.
    pub fn load_optional(path: &Path) -> EngineResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Applies the loaded values onto a freshly constructed [`Policy`].
    pub fn apply(&self, policy: &Policy) -> EngineResult<()> {
        if let Some(v) = self.cache {
            policy.set("cache", if v { "on" } else { "off" })?;
        }
        if let Some(v) = self.undo {
            policy.set("undo", if v { "on" } else { "off" })?;
        }
        if let Some(v) = self.batch {
            policy.set("batch", if v { "on" } else { "off" })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = IdasqlConfig::load_optional(Path::new("/nonexistent/idasql.toml")).unwrap();
        assert!(cfg.cache.is_none());
        assert!(cfg.default_database.is_none());
    }

    #[test]
    fn parses_partial_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idasql.toml");
        std::fs::write(&path, "batch = true\n").unwrap();
        let cfg = IdasqlConfig::load_optional(&path).unwrap();
        assert_eq!(cfg.batch, Some(true));
        assert_eq!(cfg.cache, None);

        let policy = Policy::new();
        cfg.apply(&policy).unwrap();
        assert!(policy.batch_enabled());
        assert!(policy.cache_enabled());
    }
}
