//! Cloak Verdict Engine: compares the visible and hidden text partitions
//! and decides whether the document is cloaked.
//!
//! The divergence measure and the spam-indicator check are policies behind
//! traits; the engine's contract is only the comparison step.

use crate::css::collect::ParseWarning;
use crate::partition::Partition;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Disposition {
    Clean,
    Cloaked,
}

/// One piece of evidence behind a Cloaked disposition.
#[derive(Debug, Clone, Serialize)]
pub struct Evidence {
    pub config: &'static str,
    pub node: usize,
    /// A short excerpt of the affected text.
    pub excerpt: String,
}

/// The final per-email result.
#[derive(Debug, Serialize)]
pub struct EmailVerdict {
    pub disposition: Disposition,
    pub visible_text: String,
    pub hidden_text: String,
    /// 1 - similarity between the partitions, in [0, 1].
    pub divergence: f32,
    pub reasons: Vec<String>,
    pub evidence: Vec<Evidence>,
    pub warnings: Vec<String>,
}

/// Lexical similarity between two texts, in [0, 1].
pub trait Similarity {
    fn score(&self, a: &str, b: &str) -> f32;
}

/// Token-set Sørensen–Dice coefficient over lowercased word tokens.
pub struct TokenDice;

impl Similarity for TokenDice {
    fn score(&self, a: &str, b: &str) -> f32 {
        let ta = tokens(a);
        let tb = tokens(b);
        if ta.is_empty() && tb.is_empty() {
            return 1.0;
        }
        if ta.is_empty() || tb.is_empty() {
            return 0.0;
        }
        let common = ta.intersection(&tb).count() as f32;
        2.0 * common / (ta.len() + tb.len()) as f32
    }
}

fn tokens(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Read-only lookup deciding whether a token is spam-indicative. Backed by
/// the configuration by default; an external model can stand in.
pub trait IndicatorSource {
    fn is_indicator(&self, token: &str) -> bool;
}

pub struct TokenListIndicators {
    tokens: HashSet<String>,
}

impl TokenListIndicators {
    pub fn new<I: IntoIterator<Item = String>>(tokens: I) -> Self {
        TokenListIndicators {
            tokens: tokens.into_iter().map(|t| t.to_lowercase()).collect(),
        }
    }
}

impl IndicatorSource for TokenListIndicators {
    fn is_indicator(&self, token: &str) -> bool {
        self.tokens.contains(&token.to_lowercase())
    }
}

pub struct VerdictEngine {
    divergence_threshold: f32,
    similarity: Box<dyn Similarity + Send + Sync>,
    indicators: Box<dyn IndicatorSource + Send + Sync>,
}

impl VerdictEngine {
    pub fn new(
        divergence_threshold: f32,
        similarity: Box<dyn Similarity + Send + Sync>,
        indicators: Box<dyn IndicatorSource + Send + Sync>,
    ) -> Self {
        VerdictEngine {
            divergence_threshold,
            similarity,
            indicators,
        }
    }

    /// Decide Cloaked or Clean from the two partitions.
    ///
    /// Cloaked iff hidden text exists and either the partitions are
    /// lexically dissimilar beyond the threshold, or spam-indicative tokens
    /// appear in one partition but not the other.
    pub fn decide(&self, partition: &Partition, warnings: Vec<ParseWarning>) -> EmailVerdict {
        let visible_text = partition.visible_text();
        let hidden_text = partition.hidden_text();

        let mut reasons = Vec::new();
        let mut disposition = Disposition::Clean;
        let mut divergence = 0.0;

        if !hidden_text.is_empty() {
            divergence = 1.0 - self.similarity.score(&visible_text, &hidden_text);

            if divergence > self.divergence_threshold {
                disposition = Disposition::Cloaked;
                reasons.push(format!(
                    "hidden text diverges from visible text (divergence {divergence:.2} > {:.2})",
                    self.divergence_threshold
                ));
            }

            let hidden_hits = self.indicator_hits(&hidden_text);
            let visible_hits = self.indicator_hits(&visible_text);
            if !hidden_hits.is_empty() && visible_hits.is_empty() {
                disposition = Disposition::Cloaked;
                reasons.push(format!(
                    "spam indicators only in hidden text: {}",
                    hidden_hits.join(", ")
                ));
            } else if !visible_hits.is_empty() && hidden_hits.is_empty() {
                disposition = Disposition::Cloaked;
                reasons.push(format!(
                    "spam indicators only in visible text: {}",
                    visible_hits.join(", ")
                ));
            }
        }

        let evidence = if disposition == Disposition::Cloaked {
            partition
                .hidden
                .iter()
                .flat_map(|seg| {
                    let excerpt = excerpt(&seg.text);
                    seg.configs.iter().map(move |&config| Evidence {
                        config,
                        node: seg.node.0,
                        excerpt: excerpt.clone(),
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        log::info!(
            "verdict: {:?} (visible {} chars, hidden {} chars, divergence {:.2})",
            disposition,
            visible_text.len(),
            hidden_text.len(),
            divergence
        );

        EmailVerdict {
            disposition,
            visible_text,
            hidden_text,
            divergence,
            reasons,
            evidence,
            warnings: warnings.into_iter().map(|w| w.detail).collect(),
        }
    }

    fn indicator_hits(&self, text: &str) -> Vec<String> {
        let mut hits: Vec<String> = tokens(text)
            .into_iter()
            .filter(|t| self.indicators.is_indicator(t))
            .collect();
        hits.sort();
        hits
    }
}

fn excerpt(text: &str) -> String {
    const MAX: usize = 80;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX).collect();
        format!("{cut}…")
    }
}
