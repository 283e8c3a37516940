//! Hunter role system
//!
//! Static, read-only table of [`HunterProfile`]s. Built once at startup and
//! shared as `Arc<HunterRoleSystem>`; it is never mutated afterwards.

use crate::types::{AppError, HunterType, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HunterExpertise {
    SourceDiscovery,
    DeepAnalysis,
    FactVerification,
    InsightSynthesis,
}

impl HunterExpertise {
    pub const ALL: [HunterExpertise; 4] = [
        HunterExpertise::SourceDiscovery,
        HunterExpertise::DeepAnalysis,
        HunterExpertise::FactVerification,
        HunterExpertise::InsightSynthesis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HunterExpertise::SourceDiscovery => "source_discovery",
            HunterExpertise::DeepAnalysis => "deep_analysis",
            HunterExpertise::FactVerification => "fact_verification",
            HunterExpertise::InsightSynthesis => "insight_synthesis",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            HunterExpertise::SourceDiscovery => "Source Discovery",
            HunterExpertise::DeepAnalysis => "Deep Analysis",
            HunterExpertise::FactVerification => "Fact Verification",
            HunterExpertise::InsightSynthesis => "Insight Synthesis",
        }
    }
}

/// Query complexity used to pick a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Standard,
    Complex,
    VerificationHeavy,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Standard => "standard",
            Complexity::Complex => "complex",
            Complexity::VerificationHeavy => "verification_heavy",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Complexity {
    type Err = AppError;

    /// Unrecognized tags map to `Standard`.
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_lowercase().as_str() {
            "simple" => Complexity::Simple,
            "complex" => Complexity::Complex,
            "verification_heavy" => Complexity::VerificationHeavy,
            _ => Complexity::Standard,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HunterProfile {
    pub hunter_type: HunterType,
    pub name: &'static str,
    pub expertise: HunterExpertise,
    pub description: &'static str,
    pub primary_tools: &'static [&'static str],
    pub search_strategies: &'static [&'static str],
    pub success_metrics: &'static [&'static str],
    pub collaboration_style: &'static str,
}

/// Structured view of a profile for display.
#[derive(Debug, Clone, Serialize)]
pub struct HunterCapabilities {
    pub hunter_type: HunterType,
    pub name: String,
    pub expertise_area: String,
    pub primary_focus: String,
    pub tools: Vec<String>,
    pub strategies: Vec<String>,
    pub metrics: Vec<String>,
    pub team_role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamCoverage {
    pub coverage_score: f64,
    pub expertise_covered: Vec<HunterExpertise>,
    pub missing_expertise: Vec<HunterExpertise>,
    pub team_balanced: bool,
    pub recommendations: Vec<String>,
}

const SOURCE_SCOUT: HunterProfile = HunterProfile {
    hunter_type: HunterType::SourceScout,
    name: "Source Scout",
    expertise: HunterExpertise::SourceDiscovery,
    description: "Specialized in rapid source discovery, evaluation, and reconnaissance",
    primary_tools: &["search_web", "source_evaluator"],
    search_strategies: &[
        "Broad keyword sweeps with multiple search engines",
        "Authority site targeting (official sources, institutions)",
        "Recent content prioritization (2024-2025)",
        "Source diversity maximization",
        "Geographic and domain-specific searches",
    ],
    success_metrics: &[
        "Number of unique quality sources discovered",
        "Source credibility scores",
        "Coverage breadth across different perspectives",
        "Recency of information found",
    ],
    collaboration_style: "Sets foundation for team, provides source map to other hunters",
};

const DEEP_ANALYST: HunterProfile = HunterProfile {
    hunter_type: HunterType::DeepAnalyst,
    name: "Deep Analyst",
    expertise: HunterExpertise::DeepAnalysis,
    description: "Specialized in thorough content analysis and detailed information extraction",
    primary_tools: &["search_web", "content_extractor", "pattern_analyzer"],
    search_strategies: &[
        "Deep-dive searches on specific topics identified by scout",
        "Technical and detailed keyword combinations",
        "Academic and research paper searches",
        "Industry-specific terminology usage",
        "Comparative analysis searches",
    ],
    success_metrics: &[
        "Depth of information extracted",
        "Number of specific facts and figures gathered",
        "Quality of examples and case studies found",
        "Technical accuracy of information",
    ],
    collaboration_style: "Builds on scout findings, provides detailed content for verification",
};

const FACT_CHECKER: HunterProfile = HunterProfile {
    hunter_type: HunterType::FactChecker,
    name: "Fact Checker",
    expertise: HunterExpertise::FactVerification,
    description: "Specialized in verifying claims and cross-referencing information",
    primary_tools: &["search_web", "fact_validator", "cross_referencer"],
    search_strategies: &[
        "Verification searches for specific claims and statistics",
        "Alternative source searches for same information",
        "Authoritative source confirmation searches",
        "Date and timeline verification searches",
        "Contradiction detection searches",
    ],
    success_metrics: &[
        "Percentage of claims verified",
        "Number of sources cross-referenced",
        "Accuracy confidence scores",
        "Contradictions identified and resolved",
    ],
    collaboration_style: "Validates analyst findings, ensures information reliability",
};

const INSIGHT_SYNTHESIZER: HunterProfile = HunterProfile {
    hunter_type: HunterType::InsightSynthesizer,
    name: "Insight Synthesizer",
    expertise: HunterExpertise::InsightSynthesis,
    description: "Specialized in combining findings into actionable insights and recommendations",
    primary_tools: &["analysis_tool", "pattern_matcher", "insight_generator"],
    search_strategies: &[
        "Trend identification searches",
        "Implication and consequence searches",
        "Best practice and recommendation searches",
        "Future outlook and prediction searches",
        "Actionable insight validation searches",
    ],
    success_metrics: &[
        "Quality of synthesized insights",
        "Actionability of recommendations",
        "Comprehensiveness of final analysis",
        "User value and relevance",
    ],
    collaboration_style: "Synthesizes all team findings into final comprehensive research",
};

pub struct HunterRoleSystem {
    profiles: HashMap<HunterType, HunterProfile>,
}

impl Default for HunterRoleSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl HunterRoleSystem {
    pub fn new() -> Self {
        let profiles = [SOURCE_SCOUT, DEEP_ANALYST, FACT_CHECKER, INSIGHT_SYNTHESIZER]
            .into_iter()
            .map(|p| (p.hunter_type, p))
            .collect();
        Self { profiles }
    }

    pub fn profile(&self, hunter_type: HunterType) -> Option<&HunterProfile> {
        self.profiles.get(&hunter_type)
    }

    /// Profiles in hand-off order.
    pub fn profiles(&self) -> Vec<&HunterProfile> {
        HunterType::SEQUENCE
            .iter()
            .filter_map(|t| self.profiles.get(t))
            .collect()
    }

    pub fn optimal_team(&self, complexity: Complexity) -> Vec<HunterType> {
        use HunterType::*;
        match complexity {
            Complexity::Simple => vec![SourceScout, DeepAnalyst],
            Complexity::Standard | Complexity::Complex => {
                vec![SourceScout, DeepAnalyst, FactChecker, InsightSynthesizer]
            }
            Complexity::VerificationHeavy => {
                vec![SourceScout, FactChecker, DeepAnalyst, InsightSynthesizer]
            }
        }
    }

    /// Role prompt for one hunter working on `query`.
    pub fn generate_system_prompt(&self, hunter_type: HunterType, query: &str) -> Result<String> {
        let profile = self
            .profile(hunter_type)
            .ok_or_else(|| AppError::UnknownHunterType(hunter_type.to_string()))?;

        let bullets = |items: &[&str]| {
            items
                .iter()
                .map(|item| format!("• {}", item))
                .collect::<Vec<_>>()
                .join("\n")
        };

        Ok(format!(
            "YOU ARE: {name} - ELITE RESEARCH SPECIALIST\n\n\
             HUNTER IDENTITY:\n\
             Role: {description}\n\
             Expertise: {expertise}\n\
             Mission: {query}\n\n\
             YOUR SPECIALIZATION:\n{strategies}\n\n\
             YOUR PRIMARY TOOLS:\n{tools}\n\n\
             SUCCESS METRICS:\n{metrics}\n\n\
             TEAM COLLABORATION:\n{collaboration}\n\n\
             OPERATING PROTOCOL:\n\
             1. FOCUS EXCLUSIVELY on your specialization area\n\
             2. USE your specialized search strategies\n\
             3. COLLABORATE by building on team members' work\n\
             4. MEASURE success against your specific metrics\n\
             5. MAINTAIN quality standards expected of your expertise\n\n\
             CRITICAL: You are part of a coordinated research team. Your role is to excel in your \
             specialization while contributing to the overall research mission.",
            name = profile.name.to_uppercase(),
            description = profile.description,
            expertise = profile.expertise.label(),
            query = query,
            strategies = bullets(profile.search_strategies),
            tools = bullets(profile.primary_tools),
            metrics = bullets(profile.success_metrics),
            collaboration = profile.collaboration_style,
        ))
    }

    pub fn capabilities(&self, hunter_type: HunterType) -> Option<HunterCapabilities> {
        let profile = self.profile(hunter_type)?;
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Some(HunterCapabilities {
            hunter_type,
            name: profile.name.to_string(),
            expertise_area: profile.expertise.as_str().to_string(),
            primary_focus: profile.description.to_string(),
            tools: owned(profile.primary_tools),
            strategies: owned(profile.search_strategies),
            metrics: owned(profile.success_metrics),
            team_role: profile.collaboration_style.to_string(),
        })
    }

    /// How many of the four expertise areas a team covers.
    pub fn validate_team_coverage(&self, team: &[HunterType]) -> TeamCoverage {
        let covered: Vec<HunterExpertise> = HunterExpertise::ALL
            .iter()
            .copied()
            .filter(|e| {
                team.iter()
                    .filter_map(|t| self.profile(*t))
                    .any(|p| p.expertise == *e)
            })
            .collect();
        let missing: Vec<HunterExpertise> = HunterExpertise::ALL
            .iter()
            .copied()
            .filter(|e| !covered.contains(e))
            .collect();

        let coverage_score = covered.len() as f64 / HunterExpertise::ALL.len() as f64 * 100.0;
        let recommendations = missing
            .iter()
            .map(|e| {
                match e {
                    HunterExpertise::SourceDiscovery => {
                        "Add Source Scout for better initial source discovery"
                    }
                    HunterExpertise::DeepAnalysis => "Add Deep Analyst for thorough content analysis",
                    HunterExpertise::FactVerification => "Add Fact Checker for information validation",
                    HunterExpertise::InsightSynthesis => {
                        "Add Insight Synthesizer for final analysis"
                    }
                }
                .to_string()
            })
            .collect();

        TeamCoverage {
            coverage_score,
            expertise_covered: covered,
            missing_expertise: missing,
            team_balanced: coverage_score >= 75.0,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn every_specialized_hunter_has_a_profile() {
        let roles = HunterRoleSystem::new();
        for hunter in HunterType::SEQUENCE {
            let profile = roles.profile(hunter).unwrap();
            assert_eq!(profile.hunter_type, hunter);
            assert_eq!(profile.search_strategies.len(), 5);
            assert_eq!(profile.success_metrics.len(), 4);
        }
        assert!(roles.profile(HunterType::General).is_none());
    }

    #[rstest]
    #[case(Complexity::Simple, vec![HunterType::SourceScout, HunterType::DeepAnalyst])]
    #[case(Complexity::Standard, HunterType::SEQUENCE.to_vec())]
    #[case(Complexity::Complex, HunterType::SEQUENCE.to_vec())]
    #[case(
        Complexity::VerificationHeavy,
        vec![HunterType::SourceScout, HunterType::FactChecker, HunterType::DeepAnalyst, HunterType::InsightSynthesizer]
    )]
    fn team_composition_table(#[case] complexity: Complexity, #[case] expected: Vec<HunterType>) {
        assert_eq!(HunterRoleSystem::new().optimal_team(complexity), expected);
    }

    #[test]
    fn unknown_complexity_tag_is_standard() {
        assert_eq!("galaxy_brain".parse::<Complexity>().unwrap(), Complexity::Standard);
        assert_eq!("verification_heavy".parse::<Complexity>().unwrap(), Complexity::VerificationHeavy);
    }

    #[test]
    fn system_prompt_composes_profile() {
        let prompt = HunterRoleSystem::new()
            .generate_system_prompt(HunterType::FactChecker, "best budget hotels in Lisbon")
            .unwrap();
        assert!(prompt.starts_with("YOU ARE: FACT CHECKER - ELITE RESEARCH SPECIALIST"));
        assert!(prompt.contains("Expertise: Fact Verification"));
        assert!(prompt.contains("Mission: best budget hotels in Lisbon"));
        assert!(prompt.contains("• Contradiction detection searches"));
        assert!(prompt.contains("• cross_referencer"));
        assert!(prompt.contains("Validates analyst findings"));
    }

    #[test]
    fn system_prompt_for_general_is_unknown_hunter() {
        let err = HunterRoleSystem::new()
            .generate_system_prompt(HunterType::General, "q")
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownHunterType(ref t) if t == "general"));
    }

    #[test]
    fn coverage_of_partial_team() {
        let coverage = HunterRoleSystem::new()
            .validate_team_coverage(&[HunterType::SourceScout, HunterType::DeepAnalyst, HunterType::General]);
        assert_eq!(coverage.coverage_score, 50.0);
        assert!(!coverage.team_balanced);
        assert_eq!(
            coverage.missing_expertise,
            vec![HunterExpertise::FactVerification, HunterExpertise::InsightSynthesis]
        );
        assert_eq!(coverage.recommendations.len(), 2);
    }

    #[test]
    fn full_team_is_balanced() {
        let roles = HunterRoleSystem::new();
        let coverage = roles.validate_team_coverage(&roles.optimal_team(Complexity::Standard));
        assert_eq!(coverage.coverage_score, 100.0);
        assert!(coverage.team_balanced);
        assert!(coverage.recommendations.is_empty());
    }

    #[test]
    fn capabilities_mirror_profile() {
        let caps = HunterRoleSystem::new()
            .capabilities(HunterType::SourceScout)
            .unwrap();
        assert_eq!(caps.expertise_area, "source_discovery");
        assert_eq!(caps.tools, vec!["search_web", "source_evaluator"]);
    }
}
