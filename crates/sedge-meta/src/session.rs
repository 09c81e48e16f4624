//! The caller-owned compilation session.

use std::collections::BTreeMap;

use rhizome_sedge_ast::{Config, ConfigError};
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Configuration plus persistent compile-time bindings for one run.
///
/// A session outlives individual units on purpose: a directive in one unit
/// may flip the target version or set a global observed by every later unit
/// compiled against the same session. There is no hidden process-wide copy;
/// whoever drives compilation owns the session and threads it through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    config: Config,
    globals: BTreeMap<String, Value>,
}

impl Session {
    /// Create a session, rejecting an incoherent configuration up front.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Session {
            config,
            globals: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Read a session global set by an earlier directive.
    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// Bind a session global, visible to every later directive.
    pub fn set_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }
}

impl Default for Session {
    fn default() -> Self {
        Session {
            config: Config::default(),
            globals: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhizome_sedge_ast::{Backend, LuaVersion};

    #[test]
    fn test_new_validates_config() {
        let config = Config {
            target_version: LuaVersion::Lua54,
            target_backend: Backend::LuaJit,
            flags: BTreeMap::new(),
        };
        assert!(matches!(
            Session::new(config),
            Err(ConfigError::Incompatible { .. })
        ));
    }

    #[test]
    fn test_globals_persist() {
        let mut s = Session::default();
        assert_eq!(s.global("seen"), None);
        s.set_global("seen", Value::Bool(true));
        assert_eq!(s.global("seen"), Some(&Value::Bool(true)));
    }
}
