//! Provider selection from environment variables

use tracing::debug;

pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
pub const OPENAI_MODEL_VAR: &str = "OPENAI_MODEL";
pub const OPENAI_BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const ANTHROPIC_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const ANTHROPIC_MODEL_VAR: &str = "ANTHROPIC_MODEL";
pub const ANTHROPIC_BASE_URL_VAR: &str = "ANTHROPIC_BASE_URL";

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

/// Credentials and endpoint for one provider
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("kind", &self.kind)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Selected provider, if any key is configured
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayConfig {
    pub provider: Option<ProviderSettings>,
}

impl RelayConfig {
    /// Read the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Select a provider from an arbitrary variable source
    ///
    /// Empty values count as unset. OpenAI wins when both keys are present.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let provider = if let Some(api_key) = get(OPENAI_KEY_VAR) {
            Some(ProviderSettings {
                kind: ProviderKind::OpenAi,
                api_key,
                model: get(OPENAI_MODEL_VAR).unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                base_url: get(OPENAI_BASE_URL_VAR)
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            })
        } else {
            get(ANTHROPIC_KEY_VAR).map(|api_key| ProviderSettings {
                kind: ProviderKind::Anthropic,
                api_key,
                model: get(ANTHROPIC_MODEL_VAR)
                    .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
                base_url: get(ANTHROPIC_BASE_URL_VAR)
                    .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.to_string()),
            })
        };

        if let Some(settings) = &provider {
            debug!("Relay provider: {:?} ({})", settings.kind, settings.model);
        }
        Self { provider }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> RelayConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RelayConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_nothing_configured() {
        assert!(!config(&[]).is_configured());
        assert!(!config(&[(OPENAI_KEY_VAR, "  ")]).is_configured());
    }

    #[test]
    fn test_openai_preferred_over_anthropic() {
        let cfg = config(&[(OPENAI_KEY_VAR, "sk-o"), (ANTHROPIC_KEY_VAR, "sk-a")]);
        let provider = cfg.provider.unwrap();
        assert_eq!(provider.kind, ProviderKind::OpenAi);
        assert_eq!(provider.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(provider.base_url, DEFAULT_OPENAI_BASE_URL);
    }

    #[test]
    fn test_anthropic_fallback_with_model_override() {
        let cfg = config(&[
            (OPENAI_KEY_VAR, ""),
            (ANTHROPIC_KEY_VAR, "sk-a"),
            (ANTHROPIC_MODEL_VAR, "claude-3-haiku"),
        ]);
        let provider = cfg.provider.unwrap();
        assert_eq!(provider.kind, ProviderKind::Anthropic);
        assert_eq!(provider.model, "claude-3-haiku");
    }

    #[test]
    fn test_debug_redacts_key() {
        let cfg = config(&[(OPENAI_KEY_VAR, "sk-secret")]);
        assert!(!format!("{:?}", cfg).contains("sk-secret"));
    }
}
