//! Target configuration: language version, backend, feature flags.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target language versions, ordered so capability checks can compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LuaVersion {
    #[serde(rename = "5.1")]
    Lua51,
    #[serde(rename = "5.2")]
    Lua52,
    #[serde(rename = "5.3")]
    Lua53,
    #[serde(rename = "5.4")]
    Lua54,
}

impl FromStr for LuaVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "5.1" => Ok(LuaVersion::Lua51),
            "5.2" => Ok(LuaVersion::Lua52),
            "5.3" => Ok(LuaVersion::Lua53),
            "5.4" => Ok(LuaVersion::Lua54),
            _ => Err(ConfigError::UnknownVersion(s.to_string())),
        }
    }
}

impl fmt::Display for LuaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LuaVersion::Lua51 => "5.1",
            LuaVersion::Lua52 => "5.2",
            LuaVersion::Lua53 => "5.3",
            LuaVersion::Lua54 => "5.4",
        };
        write!(f, "{s}")
    }
}

/// Code generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    /// Plain PUC Lua source.
    #[serde(rename = "lua")]
    Lua,
    /// LuaJIT source; unlocks the FFI bridge.
    #[serde(rename = "luajit")]
    LuaJit,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lua" => Ok(Backend::Lua),
            "luajit" => Ok(Backend::LuaJit),
            _ => Err(ConfigError::UnknownBackend(s.to_string())),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Backend::Lua => "lua",
            Backend::LuaJit => "luajit",
        };
        write!(f, "{s}")
    }
}

/// The full target configuration one unit is compiled against.
///
/// There is no process-global copy of this; it lives in the caller's session
/// and is only changed through explicit directive effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub target_version: LuaVersion,
    pub target_backend: Backend,
    /// Open-world feature toggles. Unset flags read as false.
    pub flags: BTreeMap<String, bool>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target_version: LuaVersion::Lua54,
            target_backend: Backend::Lua,
            flags: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Bitwise operators, integer division and the integer subtype exist
    /// natively from 5.3 on; below that the compatibility shims take over.
    pub fn has_native_bitops(&self) -> bool {
        self.target_version >= LuaVersion::Lua53
    }

    pub fn has_native_integers(&self) -> bool {
        self.target_version >= LuaVersion::Lua53
    }

    /// goto/label landed in 5.2; LuaJIT carries it as an extension.
    pub fn supports_goto(&self) -> bool {
        self.target_version >= LuaVersion::Lua52 || self.target_backend == Backend::LuaJit
    }

    pub fn supports_ffi(&self) -> bool {
        self.target_backend == Backend::LuaJit
    }

    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Rejects incoherent version/backend pairs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_backend == Backend::LuaJit && self.target_version > LuaVersion::Lua52 {
            return Err(ConfigError::Incompatible {
                backend: self.target_backend,
                version: self.target_version,
            });
        }
        Ok(())
    }
}

/// Invalid configuration value or combination.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown target version {0:?}")]
    UnknownVersion(String),
    #[error("unknown target backend {0:?}")]
    UnknownBackend(String),
    #[error("backend {backend} does not implement language level {version}")]
    Incompatible {
        backend: Backend,
        version: LuaVersion,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse_and_order() {
        assert_eq!("5.1".parse::<LuaVersion>(), Ok(LuaVersion::Lua51));
        assert_eq!("5.4".parse::<LuaVersion>(), Ok(LuaVersion::Lua54));
        assert!(LuaVersion::Lua51 < LuaVersion::Lua53);
        assert!(matches!(
            "5.0".parse::<LuaVersion>(),
            Err(ConfigError::UnknownVersion(_))
        ));
        assert_eq!(LuaVersion::Lua52.to_string(), "5.2");
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!("luajit".parse::<Backend>(), Ok(Backend::LuaJit));
        assert!(matches!(
            "jvm".parse::<Backend>(),
            Err(ConfigError::UnknownBackend(_))
        ));
    }

    #[test]
    fn test_capabilities() {
        let mut c = Config::default();
        assert!(c.has_native_bitops());
        assert!(c.supports_goto());
        assert!(!c.supports_ffi());

        c.target_version = LuaVersion::Lua51;
        assert!(!c.has_native_bitops());
        assert!(!c.supports_goto());

        c.target_backend = Backend::LuaJit;
        assert!(c.supports_goto());
        assert!(c.supports_ffi());
    }

    #[test]
    fn test_validate_rejects_luajit_above_52() {
        let c = Config {
            target_version: LuaVersion::Lua53,
            target_backend: Backend::LuaJit,
            flags: BTreeMap::new(),
        };
        assert!(matches!(
            c.validate(),
            Err(ConfigError::Incompatible { .. })
        ));

        let c = Config {
            target_version: LuaVersion::Lua52,
            target_backend: Backend::LuaJit,
            flags: BTreeMap::new(),
        };
        assert_eq!(c.validate(), Ok(()));
    }

    #[test]
    fn test_flags_default_false() {
        let mut c = Config::default();
        assert!(!c.flag("debug_asserts"));
        c.flags.insert("debug_asserts".to_string(), true);
        assert!(c.flag("debug_asserts"));
    }
}
