use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Name given to the stand-in project when extraction finds nothing usable.
pub const PLACEHOLDER_PROJECT_NAME: &str = "Primary Project";

/// A resume-derived unit of work the candidate is questioned about.
///
/// Projects are immutable for the lifetime of a session and their order is
/// significant: the interview walks them front to back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: BTreeSet<String>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            technologies: BTreeSet::new(),
        }
    }

    /// The stand-in used when a resume yields no extractable projects.
    /// Uploading a resume never hard-fails on extraction quality.
    pub fn placeholder() -> Self {
        Self {
            name: PLACEHOLDER_PROJECT_NAME.to_string(),
            description: "The candidate's main piece of work on the resume.".to_string(),
            technologies: BTreeSet::new(),
        }
    }

    /// One-line rendering used in interviewer prompts.
    pub fn summary(&self) -> String {
        let mut out = self.name.clone();
        if !self.description.trim().is_empty() {
            out.push_str(" - ");
            out.push_str(self.description.trim());
        }
        if !self.technologies.is_empty() {
            let tech = self
                .technologies
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(" (tech: {tech})"));
        }
        out
    }
}

/// Per-project question quota: a single-project resume gets a deeper run of
/// three questions; anything larger gets two per project so the total stays
/// bounded.
pub fn questions_per_project(project_count: usize) -> usize {
    if project_count <= 1 { 3 } else { 2 }
}

/// Drops unnamed entries from an extraction result and substitutes the
/// placeholder project when nothing is left. The returned list is never
/// empty.
pub fn ensure_projects(projects: Vec<Project>) -> Vec<Project> {
    let named: Vec<Project> = projects
        .into_iter()
        .filter(|p| !p.name.trim().is_empty())
        .collect();
    if named.is_empty() {
        vec![Project::placeholder()]
    } else {
        named
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_is_three_for_single_project() {
        assert_eq!(questions_per_project(1), 3);
        assert_eq!(questions_per_project(0), 3);
    }

    #[test]
    fn quota_is_two_for_multiple_projects() {
        assert_eq!(questions_per_project(2), 2);
        assert_eq!(questions_per_project(5), 2);
    }

    #[test]
    fn empty_extraction_yields_placeholder() {
        let projects = ensure_projects(vec![]);
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, PLACEHOLDER_PROJECT_NAME);
    }

    #[test]
    fn unnamed_projects_are_dropped() {
        let projects = ensure_projects(vec![
            Project::new("   "),
            Project::new("Shop App"),
            Project::new(""),
        ]);
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Shop App");
    }

    #[test]
    fn summary_includes_description_and_tech() {
        let mut project = Project::new("Chat Bot");
        project.description = "Realtime support bot".to_string();
        project.technologies.insert("redis".to_string());
        project.technologies.insert("rust".to_string());
        let summary = project.summary();
        assert!(summary.contains("Chat Bot"));
        assert!(summary.contains("Realtime support bot"));
        assert!(summary.contains("redis, rust"));
    }
}
