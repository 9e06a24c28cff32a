//! Injector options.
//!
//! Options are set through the injector builder, read from the environment,
//! or (with the `config` feature) deserialized from JSON.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "config")]
use crate::error::{DiError, DiResult};

/// Environment variable enabling just-in-time bindings.
pub const AUTO_BINDINGS_ENV: &str = "FERROUS_WIRE_AUTO_BINDINGS";

/// Options shared by every injection state of an injector.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::InjectorOptions;
///
/// let options = InjectorOptions::new().with_auto_bindings(true);
/// assert!(options.auto_bindings);
/// assert!(!InjectorOptions::default().auto_bindings);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct InjectorOptions {
    /// Build unbound constructible types on demand
    pub auto_bindings: bool,
}

impl InjectorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_bindings(mut self, enabled: bool) -> Self {
        self.auto_bindings = enabled;
        self
    }

    /// Options read from the environment.
    ///
    /// `FERROUS_WIRE_AUTO_BINDINGS` enables auto-bindings when set to `1`,
    /// `true`, `yes` or `on` (case-insensitive).
    pub fn from_env() -> Self {
        Self {
            auto_bindings: env::var(AUTO_BINDINGS_ENV)
                .map(|value| parse_flag(&value))
                .unwrap_or(false),
        }
    }

    /// Options from a JSON document such as `{"auto_bindings": true}`.
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> DiResult<Self> {
        serde_json::from_str(json).map_err(|err| DiError::binding(format!("invalid injector options: {err}")))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
