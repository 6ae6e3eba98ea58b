use crate::interviewer::ReportSynthesizer;
use crate::session::Evaluation;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Qualitative rating used both per answer and as the report verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    Strong,
    Medium,
    Weak,
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Score::Strong => "Strong",
            Score::Medium => "Medium",
            Score::Weak => "Weak",
        };
        f.write_str(label)
    }
}

/// Final interview report handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub verdict: Score,
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
}

/// Two weak answers force a Weak verdict. Tunable policy constant.
pub const WEAK_VERDICT_THRESHOLD: usize = 2;

const NO_STRENGTHS_NOTE: &str = "No clearly strong answers stood out in this interview.";
const NO_GAPS_NOTE: &str = "No major gaps stood out in this interview.";
const INSUFFICIENT_DATA_SUMMARY: &str =
    "Insufficient interview data to evaluate performance.";

/// Deterministic report assembly from the ordered evaluation list.
///
/// Used directly when the synthesizer capability fails, and by
/// [`RuleBasedSynthesizer`] for offline runs. Always structurally valid,
/// including for an empty interview.
pub fn assemble_report(evaluations: &[Evaluation]) -> Report {
    if evaluations.is_empty() {
        return Report {
            verdict: Score::Weak,
            summary: INSUFFICIENT_DATA_SUMMARY.to_string(),
            strengths: Vec::new(),
            gaps: Vec::new(),
        };
    }

    let strong = evaluations.iter().filter(|e| e.score == Score::Strong).count();
    let medium = evaluations.iter().filter(|e| e.score == Score::Medium).count();
    let weak = evaluations.iter().filter(|e| e.score == Score::Weak).count();
    let verdict = derive_verdict(strong, weak, evaluations.len());

    let mut strengths: Vec<String> = evaluations
        .iter()
        .filter(|e| e.score == Score::Strong)
        .map(|e| format!("{} ({})", e.reasoning, e.project_name))
        .collect();
    if strengths.is_empty() {
        strengths.push(NO_STRENGTHS_NOTE.to_string());
    }

    let mut gaps: Vec<String> = evaluations
        .iter()
        .filter(|e| e.score == Score::Weak)
        .map(|e| format!("{} ({})", e.reasoning, e.project_name))
        .collect();
    if gaps.is_empty() {
        gaps.push(NO_GAPS_NOTE.to_string());
    }

    let projects: BTreeSet<&str> = evaluations
        .iter()
        .map(|e| e.project_name.as_str())
        .collect();
    let summary = format!(
        "Answered {} question(s) across {} project(s): {} strong, {} medium, {} weak. Overall the interview reads as {}.",
        evaluations.len(),
        projects.len(),
        strong,
        medium,
        weak,
        verdict,
    );

    Report {
        verdict,
        summary,
        strengths,
        gaps,
    }
}

fn derive_verdict(strong: usize, weak: usize, total: usize) -> Score {
    if weak >= WEAK_VERDICT_THRESHOLD {
        Score::Weak
    } else if weak == 0 && strong * 2 > total {
        Score::Strong
    } else {
        Score::Medium
    }
}

/// Synthesizer that never leaves the process; the offline counterpart of the
/// LLM-backed report builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedSynthesizer;

#[async_trait]
impl ReportSynthesizer for RuleBasedSynthesizer {
    async fn build_report(&self, evaluations: &[Evaluation]) -> Result<Report> {
        Ok(assemble_report(evaluations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluation(score: Score, reasoning: &str, project: &str) -> Evaluation {
        Evaluation {
            question: "Q".to_string(),
            answer: "A".to_string(),
            score,
            reasoning: reasoning.to_string(),
            project_name: project.to_string(),
        }
    }

    #[test]
    fn empty_interview_yields_low_confidence_report() {
        let report = assemble_report(&[]);
        assert_eq!(report.verdict, Score::Weak);
        assert_eq!(report.summary, INSUFFICIENT_DATA_SUMMARY);
        assert!(report.strengths.is_empty());
        assert!(report.gaps.is_empty());
    }

    #[test]
    fn two_weak_answers_force_weak_verdict() {
        let evaluations = vec![
            evaluation(Score::Strong, "Deep caching knowledge", "Shop App"),
            evaluation(Score::Weak, "Could not explain indexing", "Shop App"),
            evaluation(Score::Weak, "Vague on reconnects", "Chat Bot"),
        ];
        let report = assemble_report(&evaluations);
        assert_eq!(report.verdict, Score::Weak);
        assert_eq!(report.gaps.len(), 2);
        assert!(report.gaps[1].contains("Chat Bot"));
    }

    #[test]
    fn strong_majority_without_weak_is_strong() {
        let evaluations = vec![
            evaluation(Score::Strong, "Solid architecture rationale", "Shop App"),
            evaluation(Score::Strong, "Knew the tradeoffs cold", "Shop App"),
            evaluation(Score::Medium, "Basics only", "Shop App"),
        ];
        let report = assemble_report(&evaluations);
        assert_eq!(report.verdict, Score::Strong);
        assert_eq!(report.strengths.len(), 2);
        assert_eq!(report.gaps, vec![NO_GAPS_NOTE.to_string()]);
    }

    #[test]
    fn single_weak_answer_stays_medium() {
        let evaluations = vec![
            evaluation(Score::Strong, "Good depth", "Shop App"),
            evaluation(Score::Weak, "Shallow on testing", "Shop App"),
            evaluation(Score::Medium, "Adequate", "Shop App"),
        ];
        let report = assemble_report(&evaluations);
        assert_eq!(report.verdict, Score::Medium);
    }

    #[test]
    fn all_medium_gets_placeholder_buckets() {
        let evaluations = vec![
            evaluation(Score::Medium, "Adequate", "Shop App"),
            evaluation(Score::Medium, "Adequate", "Shop App"),
        ];
        let report = assemble_report(&evaluations);
        assert_eq!(report.verdict, Score::Medium);
        assert_eq!(report.strengths, vec![NO_STRENGTHS_NOTE.to_string()]);
        assert_eq!(report.gaps, vec![NO_GAPS_NOTE.to_string()]);
    }

    #[tokio::test]
    async fn rule_based_synthesizer_matches_assembly() {
        let evaluations = vec![evaluation(Score::Strong, "Good depth", "Shop App")];
        let report = RuleBasedSynthesizer
            .build_report(&evaluations)
            .await
            .expect("deterministic synthesis cannot fail");
        assert_eq!(report, assemble_report(&evaluations));
    }
}
