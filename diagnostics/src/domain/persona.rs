// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Response routing: picks the investigating persona and renders the report.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

use super::analysis::Analysis;
use super::category::ErrorCategory;

const REPORT_HYPOTHESES: usize = 3;
const REPORT_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Persona {
    #[serde(rename = "code-review")]
    CodeReviewer,
    #[serde(rename = "network-infrastructure")]
    InfrastructureInvestigator,
}

impl Persona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::CodeReviewer => "code-review",
            Persona::InfrastructureInvestigator => "network-infrastructure",
        }
    }

    pub fn primary_for(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Syntax | ErrorCategory::Runtime | ErrorCategory::State => Persona::CodeReviewer,
            ErrorCategory::Network
            | ErrorCategory::Auth
            | ErrorCategory::Resource
            | ErrorCategory::Dependency
            | ErrorCategory::Config
            | ErrorCategory::Unknown => Persona::InfrastructureInvestigator,
        }
    }

    pub fn other(&self) -> Self {
        match self {
            Persona::CodeReviewer => Persona::InfrastructureInvestigator,
            Persona::InfrastructureInvestigator => Persona::CodeReviewer,
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedResponse {
    pub primary_persona: Persona,
    pub secondary_persona: Persona,
    pub report: String,
}

pub fn route(analysis: &Analysis) -> RoutedResponse {
    let primary = Persona::primary_for(analysis.category);
    RoutedResponse {
        primary_persona: primary,
        secondary_persona: primary.other(),
        report: render_report(analysis),
    }
}

fn render_report(analysis: &Analysis) -> String {
    let d = &analysis.decomposition;
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "Error analysis {} [{}]", analysis.id, analysis.category);
    let _ = writeln!(out, "Signature: {}", analysis.signature);
    let _ = writeln!(out);
    let _ = writeln!(out, "What failed: {}", d.what_failed);
    let _ = writeln!(out, "Why it failed: {}", d.why_it_failed);
    let _ = writeln!(out, "Assumptions:");
    for assumption in &d.assumptions {
        let _ = writeln!(out, "  - {}", assumption);
    }
    let _ = writeln!(out, "Root cause: {}", d.root_cause);
    let _ = writeln!(out);

    let _ = writeln!(out, "Hypotheses:");
    for (i, h) in analysis.hypotheses.iter().take(REPORT_HYPOTHESES).enumerate() {
        let _ = writeln!(out, "  {}. {} ({}%) - test: {}", i + 1, h.description, h.likelihood, h.test_method);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Related fixes in memory: {}", analysis.related_fix_ids.len());
    let _ = writeln!(out, "Suggested fixes:");
    for (i, s) in analysis.top_suggestions(REPORT_SUGGESTIONS).enumerate() {
        let _ = writeln!(out, "  {}. [{}%] {}", i + 1, s.confidence, s.description);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::SuggestionPolicy;
    use crate::domain::observation::ErrorObservation;

    fn analyze(error: ErrorObservation) -> Analysis {
        Analysis::assemble(error, &[], &SuggestionPolicy::default())
    }

    #[test]
    fn test_network_error_routes_to_infrastructure() {
        let analysis = analyze(
            ErrorObservation::new("Connection timed out to api.example.com").with_code("ETIMEDOUT"),
        );
        let routed = route(&analysis);
        assert_eq!(routed.primary_persona, Persona::InfrastructureInvestigator);
        assert_eq!(routed.secondary_persona, Persona::CodeReviewer);
    }

    #[test]
    fn test_syntax_error_routes_to_code_review() {
        let routed = route(&analyze(ErrorObservation::new("SyntaxError: Unexpected token")));
        assert_eq!(routed.primary_persona, Persona::CodeReviewer);
        assert_eq!(routed.secondary_persona, Persona::InfrastructureInvestigator);
    }

    #[test]
    fn test_code_categories() {
        for category in ErrorCategory::ALL {
            let expected = matches!(
                category,
                ErrorCategory::Syntax | ErrorCategory::Runtime | ErrorCategory::State
            );
            assert_eq!(Persona::primary_for(category) == Persona::CodeReviewer, expected, "{category}");
        }
    }

    #[test]
    fn test_infrastructure_categories() {
        let infrastructure: Vec<_> = ErrorCategory::ALL
            .into_iter()
            .filter(|c| Persona::primary_for(*c) == Persona::InfrastructureInvestigator)
            .collect();
        assert_eq!(
            infrastructure,
            vec![
                ErrorCategory::Network,
                ErrorCategory::Auth,
                ErrorCategory::Resource,
                ErrorCategory::Dependency,
                ErrorCategory::Config,
                ErrorCategory::Unknown,
            ]
        );
    }

    #[test]
    fn test_report_embeds_analysis() {
        let analysis = analyze(ErrorObservation::new("ENOENT: no such file").with_code("ENOENT"));
        let report = route(&analysis).report;
        assert!(report.contains(&analysis.decomposition.root_cause));
        assert!(report.contains(&analysis.hypotheses[0].description));
        assert!(report.contains("Related fixes in memory: 0"));
        assert!(report.contains(&analysis.suggested_fixes[0].description));
    }

    #[test]
    fn test_persona_serializes_as_slug() {
        let json = serde_json::to_string(&Persona::CodeReviewer).unwrap();
        assert_eq!(json, "\"code-review\"");
    }
}
