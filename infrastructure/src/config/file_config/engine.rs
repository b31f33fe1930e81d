//! Decision engine configuration from TOML (`[engine]` section)

use crate::engine::{DEFAULT_SYSTEM_INSTRUCTION, EngineConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which decision engine adapter to build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Replay a scripted conversation (offline, deterministic)
    #[default]
    Script,
    /// Gemini `generateContent` REST API (requires the `gemini` feature)
    Gemini,
}

impl std::str::FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "script" | "scripted" => Ok(EngineKind::Script),
            "gemini" => Ok(EngineKind::Gemini),
            other => Err(format!(
                "unknown engine '{}' (expected 'script' or 'gemini')",
                other
            )),
        }
    }
}

/// Raw engine configuration
///
/// # Example
///
/// ```toml
/// [engine]
/// kind = "gemini"
/// model = "gemini-2.5-flash-lite"
/// api_key_env = "GOOGLE_API_KEY"   # or api_key = "..." (not recommended)
/// use_vertexai = false
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEngineConfig {
    pub kind: EngineKind,
    /// Model identifier passed to the API
    pub model: String,
    /// Direct API key (prefer `api_key_env`)
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Vertex AI mode (not supported; rejected at startup)
    pub use_vertexai: bool,
    /// Script file for the `script` engine
    pub script: Option<PathBuf>,
    /// Overrides the built-in system instruction
    pub system_instruction: Option<String>,
}

impl Default for FileEngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Script,
            model: "gemini-2.5-flash-lite".to_string(),
            api_key: None,
            api_key_env: "GOOGLE_API_KEY".to_string(),
            use_vertexai: false,
            script: None,
            system_instruction: None,
        }
    }
}

impl FileEngineConfig {
    /// Resolve credentials once and build the runtime engine configuration.
    ///
    /// An explicit `api_key` wins over the environment variable. The
    /// environment is read here and nowhere else.
    pub fn to_engine_config(&self) -> EngineConfig {
        let api_key = self
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| {
                std::env::var(&self.api_key_env)
                    .ok()
                    .filter(|k| !k.is_empty())
            });

        EngineConfig {
            model: self.model.clone(),
            api_key,
            use_vertexai: self.use_vertexai,
            system_instruction: self
                .system_instruction
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTION.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_kind_parse() {
        assert_eq!("script".parse::<EngineKind>(), Ok(EngineKind::Script));
        assert_eq!("Gemini".parse::<EngineKind>(), Ok(EngineKind::Gemini));
        assert!("openai".parse::<EngineKind>().is_err());
    }

    #[test]
    fn test_explicit_key_wins() {
        let config = FileEngineConfig {
            api_key: Some("inline-key".to_string()),
            api_key_env: "TOOLRELAY_TEST_UNSET_KEY_VAR".to_string(),
            ..Default::default()
        };
        let engine = config.to_engine_config();
        assert_eq!(engine.api_key.as_deref(), Some("inline-key"));
        assert_eq!(engine.system_instruction, DEFAULT_SYSTEM_INSTRUCTION);
    }

    #[test]
    fn test_missing_key_is_none() {
        let config = FileEngineConfig {
            api_key: Some(String::new()),
            api_key_env: "TOOLRELAY_TEST_UNSET_KEY_VAR".to_string(),
            system_instruction: Some("Be brief.".to_string()),
            ..Default::default()
        };
        let engine = config.to_engine_config();
        assert!(engine.api_key.is_none());
        assert_eq!(engine.system_instruction, "Be brief.");
    }
}
