//! The analysis pipeline: raw HTML string in, `EmailVerdict` out.

use crate::cascade::resolve_styles;
use crate::catalogue::Catalogue;
use crate::classifier::Classifier;
use crate::config::Config;
use crate::css::collect::{collect_styles, ParseWarning};
use crate::dom::Document;
use crate::partition::partition_text;
use crate::verdict::{EmailVerdict, TokenDice, TokenListIndicators, VerdictEngine};

/// A configured analyzer. Construction validates the configuration (the
/// only fatal error class); afterwards each document is analyzed
/// independently with no shared mutable state, so one analyzer can serve
/// any number of documents, concurrently if the caller shards them.
pub struct CloakAnalyzer {
    catalogue: Catalogue,
    engine: VerdictEngine,
}

impl CloakAnalyzer {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;
        let indicators = config.indicator_tokens()?;
        log::debug!(
            "analyzer ready: threshold {}, {} indicator tokens",
            config.divergence_threshold,
            indicators.len()
        );
        Ok(CloakAnalyzer {
            catalogue: Catalogue::standard(),
            engine: VerdictEngine::new(
                config.divergence_threshold,
                Box::new(TokenDice),
                Box::new(TokenListIndicators::new(indicators)),
            ),
        })
    }

    /// Analyze one extracted HTML email body. Never fails: malformed input
    /// degrades to warnings on the verdict.
    pub fn analyze(&self, html: &str) -> EmailVerdict {
        let doc = Document::parse(html);
        let collected = collect_styles(&doc);
        let styles = resolve_styles(&doc, &collected);
        let verdicts = Classifier::new(&self.catalogue).classify(&doc, &styles);
        let partition = partition_text(&doc, &verdicts);

        let mut warnings: Vec<ParseWarning> = doc
            .warnings
            .iter()
            .map(|w| ParseWarning { detail: w.clone() })
            .collect();
        warnings.extend(collected.warnings);

        self.engine.decide(&partition, warnings)
    }
}
