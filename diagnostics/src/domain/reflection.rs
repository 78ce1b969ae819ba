// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Reflexion records
//!
//! Episodic records log every task outcome. Reflections capture the cause
//! and correction for a failed task, and carry a Laplace-smoothed
//! effectiveness score fed by later outcome reports.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::category::ErrorCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeId(pub Uuid);

impl EpisodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EpisodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReflectionId(pub Uuid);

impl ReflectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReflectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReflectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReflectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Partial,
    Failure,
}

impl OutcomeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeStatus::Success)
    }

    /// Failures are weighted above everything else.
    pub fn importance(&self) -> u8 {
        match self {
            OutcomeStatus::Failure => 75,
            OutcomeStatus::Success | OutcomeStatus::Partial => 50,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::Partial => "partial",
            OutcomeStatus::Failure => "failure",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodicRecord {
    pub id: EpisodeId,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub event_kind: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub outcome: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub importance: u8,
}

/// `(helped + 1) / (helped + failed + 2)`
pub fn effectiveness(times_helped: u32, times_failed: u32) -> f64 {
    (f64::from(times_helped) + 1.0) / (f64::from(times_helped) + f64::from(times_failed) + 2.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reflection {
    pub id: ReflectionId,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub task_type: String,
    pub task_description: String,
    pub attempt_number: u32,
    pub outcome: OutcomeStatus,
    pub root_cause: String,
    pub specific_error: String,
    pub correction_action: String,
    pub correction_reasoning: String,
    pub correction_confidence: f64,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub times_helped: u32,
    #[serde(default)]
    pub times_failed: u32,
    #[serde(default = "neutral_effectiveness")]
    pub effectiveness_score: f64,
}

fn neutral_effectiveness() -> f64 {
    effectiveness(0, 0)
}

impl Reflection {
    /// Count one observed outcome and recompute the score. Returns the previous score.
    pub fn record_outcome(&mut self, helped: bool) -> f64 {
        let old = self.effectiveness_score;
        if helped {
            self.times_helped += 1;
        } else {
            self.times_failed += 1;
        }
        self.effectiveness_score = effectiveness(self.times_helped, self.times_failed);
        old
    }

    pub fn observations(&self) -> u32 {
        self.times_helped + self.times_failed
    }

    /// Twice the case-insensitive task-type match plus the number of shared keywords.
    pub fn relevance(&self, task_type: &str, keywords: &[String]) -> usize {
        let type_match = if self.task_type.eq_ignore_ascii_case(task_type.trim()) {
            2
        } else {
            0
        };
        let shared = keywords
            .iter()
            .filter(|k| self.keywords.iter().any(|own| own == *k))
            .count();
        type_match + shared
    }
}

/// Score, filter and order reflections for retrieval.
///
/// Relevance descending, then effectiveness descending, then newest first.
/// Reflections with zero relevance are dropped.
pub fn rank_relevant<'a, I>(reflections: I, task_type: &str, keywords: &[String], limit: usize) -> Vec<Reflection>
where
    I: IntoIterator<Item = &'a Reflection>,
{
    let mut scored: Vec<(usize, &Reflection)> = reflections
        .into_iter()
        .map(|r| (r.relevance(task_type, keywords), r))
        .filter(|(score, _)| *score > 0)
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| {
        sb.cmp(sa)
            .then_with(|| b.effectiveness_score.total_cmp(&a.effectiveness_score))
            .then_with(|| b.timestamp.cmp(&a.timestamp))
    });

    scored.into_iter().take(limit).map(|(_, r)| r.clone()).collect()
}

struct KeywordPattern {
    keyword: &'static str,
    regex: Lazy<Regex>,
}

macro_rules! keyword {
    ($kw:literal, $re:literal) => {
        KeywordPattern {
            keyword: $kw,
            regex: Lazy::new(|| Regex::new($re).expect("static regex")),
        }
    };
}

static KEYWORD_PATTERNS: [KeywordPattern; 10] = [
    keyword!("api", r"\b(?:api|apis|endpoint|rest|graphql|http|https|webhook)\b"),
    keyword!("database", r"\b(?:database|db|sql|query|queries|schema|migrations?|postgres|supabase|table)\b"),
    keyword!("auth", r"\b(?:auth\w*|login|logout|oauth|token|session|credentials?|permissions?)\b"),
    keyword!("file", r"\b(?:files?|path|directory|directories|folder|fs|upload)\b"),
    keyword!("component", r"\b(?:components?|ui|react|view|page|layout|widget)\b"),
    keyword!("test", r"\b(?:tests?|testing|spec|jest|assert\w*|coverage)\b"),
    keyword!("deploy", r"\b(?:deploy\w*|release|vercel|build|pipeline|ci)\b"),
    keyword!("git", r"\b(?:git|github|commit|branch|merge|rebase|pull request|pr)\b"),
    keyword!("error", r"\b(?:errors?|exceptions?|fail\w*|bug|crash\w*)\b"),
    keyword!("async", r"\b(?:async|await|promises?|concurren\w*|parallel|race)\b"),
];

/// Keywords for a task: matched domain labels, then the category name,
/// then the error code. Lowercase, deduplicated, at most `max` entries.
pub fn extract_keywords(
    task_type: &str,
    task_description: &str,
    category: ErrorCategory,
    error_code: Option<&str>,
    max: usize,
) -> Vec<String> {
    let text = format!("{} {}", task_type, task_description).to_lowercase();

    let mut keywords: Vec<String> = Vec::new();
    let mut push = |kw: String| {
        if !kw.is_empty() && !keywords.contains(&kw) {
            keywords.push(kw);
        }
    };

    for pattern in KEYWORD_PATTERNS.iter() {
        if pattern.regex.is_match(&text) {
            push(pattern.keyword.to_string());
        }
    }
    push(category.as_str().to_lowercase());
    if let Some(code) = error_code {
        push(code.trim().to_lowercase());
    }

    keywords.truncate(max);
    keywords
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReflexionStats {
    pub episodes: usize,
    pub successes: usize,
    pub partials: usize,
    pub failures: usize,
    pub reflections: usize,
    /// `None` when no reflections exist.
    pub average_effectiveness: Option<f64>,
}

impl ReflexionStats {
    pub fn compute(episodes: &[EpisodicRecord], reflections: &[Reflection]) -> Self {
        let count = |status: OutcomeStatus| episodes.iter().filter(|e| e.outcome == status).count();
        let average_effectiveness = if reflections.is_empty() {
            None
        } else {
            let total: f64 = reflections.iter().map(|r| r.effectiveness_score).sum();
            Some(total / reflections.len() as f64)
        };

        Self {
            episodes: episodes.len(),
            successes: count(OutcomeStatus::Success),
            partials: count(OutcomeStatus::Partial),
            failures: count(OutcomeStatus::Failure),
            reflections: reflections.len(),
            average_effectiveness,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSummary {
    pub actor: String,
    pub episodes: usize,
    pub failures: usize,
    pub reflections: usize,
    pub last_activity: Option<DateTime<Utc>>,
}

impl ActorSummary {
    pub fn compute(actor: &str, episodes: &[EpisodicRecord], reflections: &[Reflection]) -> Self {
        let own_episodes: Vec<&EpisodicRecord> = episodes.iter().filter(|e| e.actor == actor).collect();
        let own_reflections: Vec<&Reflection> = reflections.iter().filter(|r| r.actor == actor).collect();

        let last_activity = own_episodes
            .iter()
            .map(|e| e.timestamp)
            .chain(own_reflections.iter().map(|r| r.timestamp))
            .max();

        Self {
            actor: actor.to_string(),
            episodes: own_episodes.len(),
            failures: own_episodes
                .iter()
                .filter(|e| e.outcome == OutcomeStatus::Failure)
                .count(),
            reflections: own_reflections.len(),
            last_activity,
        }
    }
}
