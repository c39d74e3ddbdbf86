//! Statistical auto-detection of candidate noise rules from buffer
//! contents: frequency of repeated (category, key) pairs is used as a
//! cheap proxy for "this is infrastructure chatter, not signal."

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

use crate::rule::Classification;
use crate::rule::MatchSpec;
use crate::rule::NewRuleSpec;
use crate::rule::NoiseCategory;

#[derive(Debug, Clone, Deserialize)]
pub struct AutoDetectParams {
    /// Minimum fraction of sampled events a (category, key) group must
    /// account for to be proposed as a rule.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// When true, proposed rules above threshold are added to the store
    /// immediately; otherwise they are only returned for review.
    #[serde(default)]
    pub apply: bool,
}

fn default_confidence_threshold() -> f64 {
    0.1
}

impl Default for AutoDetectParams {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            apply: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProposedRule {
    pub category: NoiseCategory,
    pub key: String,
    pub occurrences: usize,
    pub confidence: f64,
    pub suggested_classification: Classification,
}

/// A single observation fed into the detector: a buffer event reduced to
/// the category plus a grouping key (URL host, message prefix, etc).
pub struct Observation {
    pub category: NoiseCategory,
    pub key: String,
}

pub fn propose(observations: &[Observation], params: &AutoDetectParams) -> Vec<ProposedRule> {
    if observations.is_empty() {
        return Vec::new();
    }
    let mut counts: HashMap<(NoiseCategory, String), usize> = HashMap::new();
    for obs in observations {
        *counts.entry((obs.category, obs.key.clone())).or_insert(0) += 1;
    }
    let total = observations.len() as f64;

    let mut proposals: Vec<ProposedRule> = counts
        .into_iter()
        .map(|((category, key), occurrences)| {
            let confidence = occurrences as f64 / total;
            ProposedRule {
                category,
                key,
                occurrences,
                confidence,
                suggested_classification: Classification::Infrastructure,
            }
        })
        .filter(|p| p.confidence >= params.confidence_threshold)
        .collect();

    proposals.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    proposals
}

pub fn proposal_to_rule_spec(proposal: &ProposedRule) -> NewRuleSpec {
    let match_spec = match proposal.category {
        NoiseCategory::Network | NoiseCategory::Websocket => MatchSpec {
            url_regex: Some(regex::escape(&proposal.key)),
            message_regex: None,
            status_equals: None,
        },
        NoiseCategory::Console | NoiseCategory::Action => MatchSpec {
            url_regex: None,
            message_regex: Some(regex::escape(&proposal.key)),
            status_equals: None,
        },
    };
    NewRuleSpec {
        category: proposal.category,
        match_spec,
        classification: proposal.suggested_classification,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proposes_only_above_threshold() {
        let observations = vec![
            Observation { category: NoiseCategory::Network, key: "a.com".into() },
            Observation { category: NoiseCategory::Network, key: "a.com".into() },
            Observation { category: NoiseCategory::Network, key: "b.com".into() },
        ];
        let params = AutoDetectParams { confidence_threshold: 0.5, apply: false };
        let proposals = propose(&observations, &params);
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].key, "a.com");
    }

    #[test]
    fn empty_observations_propose_nothing() {
        let proposals = propose(&[], &AutoDetectParams::default());
        assert!(proposals.is_empty());
    }
}
