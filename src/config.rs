use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Default spam-indicative tokens. Replaceable or extendable through the
/// config file or an indicator file. Tokens that routinely appear in
/// legitimate mail (unsubscribe footers, sale copy) stay off this list.
fn default_indicators() -> Vec<String> {
    [
        "viagra", "cialis", "pills", "pharmacy", "casino", "lottery", "jackpot", "winner",
        "prize", "bitcoin", "crypto", "forex", "unclaimed", "inheritance", "loan",
        "refinance", "rolex", "replica", "cheap", "singles", "escort", "enlargement",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_threshold() -> f32 {
    0.7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Divergence above which dissimilar hidden text flags the email.
    /// 0.0 flags any hidden text; 1.0 effectively disables the check.
    #[serde(default = "default_threshold")]
    pub divergence_threshold: f32,
    /// Spam-indicative tokens checked against each partition.
    #[serde(default = "default_indicators")]
    pub spam_indicators: Vec<String>,
    /// Optional file of additional indicator tokens, one per line.
    /// `#`-prefixed lines are comments.
    #[serde(default)]
    pub indicator_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            divergence_threshold: default_threshold(),
            spam_indicators: default_indicators(),
            indicator_file: None,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {path}"))?;
        let config: Config =
            serde_yaml::from_str(&content).with_context(|| format!("parsing config {path}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content).with_context(|| format!("writing config {path}"))?;
        Ok(())
    }

    /// Configuration problems are fatal before any document is analyzed;
    /// nothing else in the pipeline is.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.divergence_threshold)
            || self.divergence_threshold.is_nan()
        {
            anyhow::bail!(
                "divergence_threshold must be within [0, 1], got {}",
                self.divergence_threshold
            );
        }
        if let Some(path) = &self.indicator_file {
            if !std::path::Path::new(path).is_file() {
                anyhow::bail!("indicator_file {path:?} does not exist");
            }
        }
        Ok(())
    }

    /// The full indicator token list: inline tokens plus the indicator
    /// file, if configured.
    pub fn indicator_tokens(&self) -> anyhow::Result<Vec<String>> {
        let mut tokens = self.spam_indicators.clone();
        if let Some(path) = &self.indicator_file {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading indicator file {path}"))?;
            tokens.extend(
                content
                    .lines()
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty() && !l.starts_with('#')),
            );
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(!config.spam_indicators.is_empty());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let config = Config {
            divergence_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = Config {
            divergence_threshold: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_indicator_file_rejected() {
        let config = Config {
            indicator_file: Some("/nonexistent/indicators.txt".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.divergence_threshold, config.divergence_threshold);
        assert_eq!(back.spam_indicators, config.spam_indicators);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let back: Config = serde_yaml::from_str("divergence_threshold: 0.5\n").unwrap();
        assert_eq!(back.divergence_threshold, 0.5);
        assert!(!back.spam_indicators.is_empty());
    }
}
