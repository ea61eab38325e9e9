//! Display configuration
//!
//! Parses an optional `display.toml` overriding terminal detection.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::render::terminal::{capabilities_from_env, resolve_capabilities, Capabilities};

/// How to decide between the live grid and the plain log
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Live grid when the output is a terminal
    #[default]
    Auto,
    /// Always draw the live grid
    Terminal,
    /// Never move the cursor
    Plain,
}

impl OutputMode {
    /// Whether to draw the live grid, given what the output reports
    #[must_use]
    pub const fn use_terminal(self, detected: bool) -> bool {
        match self {
            Self::Auto => detected,
            Self::Terminal => true,
            Self::Plain => false,
        }
    }
}

/// Display configuration parsed from `display.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DisplayConfig {
    /// Terminal type used instead of `TERM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    /// Fixed width in columns instead of asking the terminal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,
    /// Live grid or plain log
    #[serde(default)]
    pub mode: OutputMode,
}

impl DisplayConfig {
    /// Parse a configuration file from a path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration content from a string
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.width == Some(0) {
            return Err(Error::Config("width must be greater than zero".to_string()));
        }
        if self.term.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(Error::Config("term cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Capability set for the configured terminal type, or `TERM`
    #[must_use]
    pub fn capabilities(&self) -> Box<dyn Capabilities> {
        match &self.term {
            Some(term) => resolve_capabilities(Some(term.as_str())),
            None => capabilities_from_env(),
        }
    }
}
