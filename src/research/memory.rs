//! Shared research memory
//!
//! One [`ResearchMemory`] exists per research session and is shared by every
//! agent in it (`Arc<ResearchMemory>`). Findings and sources are append-only;
//! the only in-place mutations are verification status and cross-reference
//! lists. All writes go through [`ResearchMemory::add_finding`],
//! [`ResearchMemory::add_source`], [`ResearchMemory::verify_finding`] and
//! [`ResearchMemory::cross_reference`], each of which holds the write lock for
//! its whole duration, so the relatedness scan on insert is serialized.

use crate::types::HunterType;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingType {
    Source,
    Fact,
    Insight,
    Verification,
    Synthesis,
}

impl FindingType {
    /// Weight applied to confidence when scoring completed work.
    pub fn weight(&self) -> f32 {
        match self {
            FindingType::Source => 1.0,
            FindingType::Fact => 1.2,
            FindingType::Verification => 1.5,
            FindingType::Synthesis => 1.3,
            FindingType::Insight => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    Verified,
    Disputed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl SourceQuality {
    pub fn from_score(score: f32) -> Self {
        if score >= 0.8 {
            SourceQuality::Excellent
        } else if score >= 0.6 {
            SourceQuality::Good
        } else if score >= 0.4 {
            SourceQuality::Fair
        } else {
            SourceQuality::Poor
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub hunter_id: String,
    pub hunter_type: HunterType,
    pub finding_type: FindingType,
    pub content: String,
    pub sources: Vec<String>,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
    pub related_finding_ids: Vec<String>,
    pub verification_status: VerificationStatus,
    pub tags: Vec<String>,
    pub metadata: Map<String, Value>,
}

/// Input to [`ResearchMemory::add_finding`].
#[derive(Debug, Clone)]
pub struct NewFinding {
    pub hunter_id: String,
    pub hunter_type: HunterType,
    pub finding_type: FindingType,
    pub content: String,
    pub sources: Vec<String>,
    pub confidence: f32,
    pub tags: Vec<String>,
    pub metadata: Map<String, Value>,
}

impl NewFinding {
    pub fn new(
        hunter_id: impl Into<String>,
        hunter_type: HunterType,
        finding_type: FindingType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            hunter_id: hunter_id.into(),
            hunter_type,
            finding_type,
            content: content.into(),
            sources: Vec::new(),
            confidence: 0.5,
            tags: Vec::new(),
            metadata: Map::new(),
        }
    }

    pub fn sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    pub url: String,
    pub title: String,
    pub domain: String,
    pub discovered_by: String,
    pub discoverer_type: HunterType,
    pub quality: SourceQuality,
    pub credibility_score: f32,
    pub recency_score: f32,
    pub relevance_score: f32,
    pub extracted: bool,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
    pub tags: Vec<String>,
}

impl SourceRecord {
    /// Weighted score: credibility 0.4, recency 0.3, relevance 0.3.
    pub fn overall_score(&self) -> f32 {
        overall_score(self.credibility_score, self.recency_score, self.relevance_score)
    }
}

fn overall_score(credibility: f32, recency: f32, relevance: f32) -> f32 {
    credibility * 0.4 + recency * 0.3 + relevance * 0.3
}

/// Input to [`ResearchMemory::add_source`].
#[derive(Debug, Clone)]
pub struct NewSource {
    pub url: String,
    pub title: String,
    pub discovered_by: String,
    pub discoverer_type: HunterType,
    pub credibility_score: f32,
    pub recency_score: f32,
    pub relevance_score: f32,
    pub extracted: bool,
    pub summary: String,
    pub tags: Vec<String>,
}

/// Audit log entry; one per memory mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TimelineEntry {
    FindingAdded {
        finding_id: String,
        hunter_id: String,
        hunter_type: HunterType,
        summary: String,
        timestamp: DateTime<Utc>,
    },
    SourceAdded {
        source_id: String,
        url: String,
        discovered_by: String,
        timestamp: DateTime<Utc>,
    },
    FindingVerified {
        finding_id: String,
        verifier_id: String,
        result: VerificationStatus,
        timestamp: DateTime<Utc>,
    },
    CrossReferenced {
        finding_a: String,
        finding_b: String,
        relation: String,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub result: VerificationStatus,
    pub evidence: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Decides whether two findings are related.
///
/// Returns the relation label for a new edge, or `None`.
pub trait RelatednessScorer: Send + Sync {
    fn relation(&self, new: &Finding, existing: &Finding) -> Option<String>;
}

/// Lowercased whitespace-token overlap.
#[derive(Debug, Clone)]
pub struct KeywordOverlap {
    pub min_shared_tokens: usize,
}

impl Default for KeywordOverlap {
    fn default() -> Self {
        Self {
            min_shared_tokens: 3,
        }
    }
}

impl RelatednessScorer for KeywordOverlap {
    fn relation(&self, new: &Finding, existing: &Finding) -> Option<String> {
        let new_tokens = tokens(&new.content);
        let shared = tokens(&existing.content)
            .intersection(&new_tokens)
            .count();
        (shared >= self.min_shared_tokens).then(|| "keyword_related".to_string())
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Digest of other hunters' work, as seen by one hunter type.
#[derive(Debug, Clone, Serialize)]
pub struct HunterSummary {
    pub total_findings: usize,
    pub findings_by_type: BTreeMap<String, usize>,
    pub top_sources: Vec<SourceDigest>,
    pub verification_needed: Vec<FindingDigest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceDigest {
    pub url: String,
    pub title: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FindingDigest {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySummary {
    pub total_findings: usize,
    pub total_sources: usize,
    pub verified_findings: usize,
    pub top_source_domains: Vec<String>,
}

/// Full serialization of a memory instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub session_id: String,
    pub research_query: String,
    pub created_at: DateTime<Utc>,
    pub findings: Vec<Finding>,
    pub sources: Vec<SourceRecord>,
    pub cross_references: BTreeMap<String, Vec<String>>,
    pub timeline: Vec<TimelineEntry>,
    pub verification_matrix: BTreeMap<String, BTreeMap<String, VerificationRecord>>,
    pub summary: MemorySummary,
}

#[derive(Default)]
struct MemoryState {
    findings: Vec<Finding>,
    sources: Vec<SourceRecord>,
    cross_references: BTreeMap<String, Vec<String>>,
    timeline: Vec<TimelineEntry>,
    verification_matrix: BTreeMap<String, BTreeMap<String, VerificationRecord>>,
}

impl MemoryState {
    fn finding_mut(&mut self, id: &str) -> Option<&mut Finding> {
        self.findings.iter_mut().find(|f| f.id == id)
    }

    fn link(&mut self, a: &str, b: &str, relation: &str) -> bool {
        if a == b {
            return false;
        }
        let known = |id: &str, findings: &[Finding]| findings.iter().any(|f| f.id == id);
        if !known(a, &self.findings) || !known(b, &self.findings) {
            return false;
        }

        let mut added = false;
        for (from, to) in [(a, b), (b, a)] {
            let edges = self.cross_references.entry(from.to_string()).or_default();
            if !edges.iter().any(|e| e == to) {
                edges.push(to.to_string());
                added = true;
            }
            if let Some(finding) = self.finding_mut(from) {
                if !finding.related_finding_ids.iter().any(|e| e == to) {
                    finding.related_finding_ids.push(to.to_string());
                }
            }
        }

        if added {
            self.timeline.push(TimelineEntry::CrossReferenced {
                finding_a: a.to_string(),
                finding_b: b.to_string(),
                relation: relation.to_string(),
                timestamp: Utc::now(),
            });
        }
        added
    }
}

pub struct ResearchMemory {
    session_id: String,
    research_query: String,
    created_at: DateTime<Utc>,
    scorer: Box<dyn RelatednessScorer>,
    state: RwLock<MemoryState>,
}

impl ResearchMemory {
    /// Memory using [`KeywordOverlap`] for auto cross-referencing.
    pub fn new(session_id: impl Into<String>, research_query: impl Into<String>) -> Self {
        Self::with_scorer(session_id, research_query, Box::new(KeywordOverlap::default()))
    }

    pub fn with_scorer(
        session_id: impl Into<String>,
        research_query: impl Into<String>,
        scorer: Box<dyn RelatednessScorer>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            research_query: research_query.into(),
            created_at: Utc::now(),
            scorer,
            state: RwLock::new(MemoryState::default()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn research_query(&self) -> &str {
        &self.research_query
    }

    /// Append a finding and cross-reference it against every existing one.
    pub fn add_finding(&self, new: NewFinding) -> String {
        let mut state = self.state.write();
        let id = format!("finding_{:04}", state.findings.len());

        let finding = Finding {
            id: id.clone(),
            hunter_id: new.hunter_id,
            hunter_type: new.hunter_type,
            finding_type: new.finding_type,
            content: new.content,
            sources: new.sources,
            confidence: new.confidence.clamp(0.0, 1.0),
            timestamp: Utc::now(),
            related_finding_ids: Vec::new(),
            verification_status: VerificationStatus::Unverified,
            tags: new.tags,
            metadata: new.metadata,
        };

        let related: Vec<(String, String)> = state
            .findings
            .iter()
            .filter_map(|existing| {
                self.scorer
                    .relation(&finding, existing)
                    .map(|relation| (existing.id.clone(), relation))
            })
            .collect();

        state.timeline.push(TimelineEntry::FindingAdded {
            finding_id: id.clone(),
            hunter_id: finding.hunter_id.clone(),
            hunter_type: finding.hunter_type,
            summary: truncate(&finding.content, 100),
            timestamp: finding.timestamp,
        });
        state.findings.push(finding);

        for (existing, relation) in related {
            state.link(&id, &existing, &relation);
        }

        tracing::debug!(finding_id = %id, "Finding added to research memory");
        id
    }

    pub fn add_source(&self, new: NewSource) -> String {
        let mut state = self.state.write();
        let id = format!("source_{:04}", state.sources.len());
        let credibility = new.credibility_score.clamp(0.0, 1.0);
        let recency = new.recency_score.clamp(0.0, 1.0);
        let relevance = new.relevance_score.clamp(0.0, 1.0);

        let record = SourceRecord {
            id: id.clone(),
            domain: domain_of(&new.url),
            url: new.url,
            title: new.title,
            discovered_by: new.discovered_by,
            discoverer_type: new.discoverer_type,
            quality: SourceQuality::from_score(overall_score(credibility, recency, relevance)),
            credibility_score: credibility,
            recency_score: recency,
            relevance_score: relevance,
            extracted: new.extracted,
            summary: new.summary,
            timestamp: Utc::now(),
            tags: new.tags,
        };

        state.timeline.push(TimelineEntry::SourceAdded {
            source_id: id.clone(),
            url: record.url.clone(),
            discovered_by: record.discovered_by.clone(),
            timestamp: record.timestamp,
        });
        state.sources.push(record);
        id
    }

    /// Record a verdict on a finding. Returns `false` for unknown ids.
    pub fn verify_finding(
        &self,
        finding_id: &str,
        verifier_id: &str,
        result: VerificationStatus,
        evidence: Vec<String>,
    ) -> bool {
        let mut state = self.state.write();
        let Some(finding) = state.finding_mut(finding_id) else {
            return false;
        };
        finding.verification_status = result;

        let now = Utc::now();
        state
            .verification_matrix
            .entry(finding_id.to_string())
            .or_default()
            .insert(
                verifier_id.to_string(),
                VerificationRecord {
                    result,
                    evidence,
                    timestamp: now,
                },
            );
        state.timeline.push(TimelineEntry::FindingVerified {
            finding_id: finding_id.to_string(),
            verifier_id: verifier_id.to_string(),
            result,
            timestamp: now,
        });
        true
    }

    /// Insert a bidirectional edge. Idempotent; returns `true` only when a new
    /// edge was created.
    pub fn cross_reference(&self, a: &str, b: &str, relation: &str) -> bool {
        self.state.write().link(a, b, relation)
    }

    pub fn finding(&self, id: &str) -> Option<Finding> {
        self.state.read().findings.iter().find(|f| f.id == id).cloned()
    }

    pub fn finding_count(&self) -> usize {
        self.state.read().findings.len()
    }

    pub fn source_count(&self) -> usize {
        self.state.read().sources.len()
    }

    pub fn findings_by_hunter(&self, hunter_id: &str) -> Vec<Finding> {
        self.collect(|f| f.hunter_id == hunter_id)
    }

    pub fn findings_by_type(&self, finding_type: FindingType) -> Vec<Finding> {
        self.collect(|f| f.finding_type == finding_type)
    }

    pub fn verified_findings(&self) -> Vec<Finding> {
        self.collect(|f| f.verification_status == VerificationStatus::Verified)
    }

    fn collect(&self, pred: impl Fn(&Finding) -> bool) -> Vec<Finding> {
        self.state
            .read()
            .findings
            .iter()
            .filter(|f| pred(f))
            .cloned()
            .collect()
    }

    /// Sources ordered by overall score, highest first.
    pub fn top_sources(&self, limit: usize) -> Vec<SourceRecord> {
        let state = self.state.read();
        let mut sources: Vec<&SourceRecord> = state.sources.iter().collect();
        sort_by_score(&mut sources);
        sources.into_iter().take(limit).cloned().collect()
    }

    /// Findings per hunter type.
    pub fn contributions(&self) -> BTreeMap<HunterType, usize> {
        let mut counts = BTreeMap::new();
        for finding in &self.state.read().findings {
            *counts.entry(finding.hunter_type).or_insert(0) += 1;
        }
        counts
    }

    /// What hunters of other types have produced so far.
    pub fn hunter_summary(&self, hunter_type: HunterType) -> HunterSummary {
        let state = self.state.read();
        let others: Vec<&Finding> = state
            .findings
            .iter()
            .filter(|f| f.hunter_type != hunter_type)
            .collect();

        let mut findings_by_type = BTreeMap::new();
        for finding in &others {
            let key = serde_json::to_value(finding.finding_type)
                .ok()
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_default();
            *findings_by_type.entry(key).or_insert(0) += 1;
        }

        let mut sources: Vec<&SourceRecord> = state
            .sources
            .iter()
            .filter(|s| s.discoverer_type != hunter_type)
            .collect();
        sort_by_score(&mut sources);

        HunterSummary {
            total_findings: others.len(),
            findings_by_type,
            top_sources: sources
                .into_iter()
                .take(5)
                .map(|s| SourceDigest {
                    url: s.url.clone(),
                    title: s.title.clone(),
                    score: s.overall_score(),
                })
                .collect(),
            verification_needed: others
                .iter()
                .filter(|f| f.verification_status == VerificationStatus::Unverified)
                .take(3)
                .map(|f| FindingDigest {
                    id: f.id.clone(),
                    content: truncate(&f.content, 100),
                })
                .collect(),
        }
    }

    /// Prompt-ready digest of other hunters' work for `hunter_type`.
    pub fn generate_research_context(&self, hunter_type: HunterType) -> String {
        let summary = self.hunter_summary(hunter_type);
        let (total_sources, verified) = {
            let state = self.state.read();
            let verified = state
                .findings
                .iter()
                .filter(|f| f.verification_status == VerificationStatus::Verified)
                .count();
            (state.sources.len(), verified)
        };

        let mut context = format!(
            "RESEARCH CONTEXT for {}:\nQuery: {}\n\n",
            hunter_type.as_str().to_uppercase(),
            self.research_query
        );
        context.push_str("TEAM PROGRESS SO FAR:\n");
        context.push_str(&format!(
            "• {} findings discovered by other hunters\n",
            summary.total_findings
        ));
        context.push_str(&format!("• {} sources identified\n", total_sources));
        context.push_str(&format!("• {} findings verified\n\n", verified));

        if !summary.top_sources.is_empty() {
            context.push_str("TOP SOURCES FOUND:\n");
            for (i, source) in summary.top_sources.iter().enumerate() {
                context.push_str(&format!(
                    "{}. {} (Score: {:.2})\n",
                    i + 1,
                    source.title,
                    source.score
                ));
            }
        }

        if !summary.verification_needed.is_empty() {
            context.push_str("\nFINDINGS NEEDING VERIFICATION:\n");
            for finding in &summary.verification_needed {
                context.push_str(&format!("• {}\n", finding.content));
            }
        }

        context
    }

    pub fn export_memory(&self) -> MemorySnapshot {
        let state = self.state.read();

        let mut domains: HashMap<&str, usize> = HashMap::new();
        for source in &state.sources {
            *domains.entry(source.domain.as_str()).or_insert(0) += 1;
        }
        let mut domains: Vec<(&str, usize)> = domains.into_iter().collect();
        domains.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        MemorySnapshot {
            session_id: self.session_id.clone(),
            research_query: self.research_query.clone(),
            created_at: self.created_at,
            findings: state.findings.clone(),
            sources: state.sources.clone(),
            cross_references: state.cross_references.clone(),
            timeline: state.timeline.clone(),
            verification_matrix: state.verification_matrix.clone(),
            summary: MemorySummary {
                total_findings: state.findings.len(),
                total_sources: state.sources.len(),
                verified_findings: state
                    .findings
                    .iter()
                    .filter(|f| f.verification_status == VerificationStatus::Verified)
                    .count(),
                top_source_domains: domains
                    .into_iter()
                    .take(5)
                    .map(|(d, _)| d.to_string())
                    .collect(),
            },
        }
    }
}

fn sort_by_score(sources: &mut [&SourceRecord]) {
    sources.sort_by(|a, b| {
        b.overall_score()
            .partial_cmp(&a.overall_score())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Host part of a URL, or the raw string when it does not parse.
fn domain_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_else(|| url.to_string())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn memory() -> ResearchMemory {
        ResearchMemory::new("session-1", "best budget hotels in Lisbon")
    }

    fn finding(hunter: HunterType, content: &str) -> NewFinding {
        NewFinding::new(format!("{}_0", hunter), hunter, FindingType::Fact, content).confidence(0.7)
    }

    fn source(url: &str, by: HunterType, credibility: f32) -> NewSource {
        NewSource {
            url: url.to_string(),
            title: format!("Title for {}", url),
            discovered_by: format!("{}_0", by),
            discoverer_type: by,
            credibility_score: credibility,
            recency_score: 0.5,
            relevance_score: 0.5,
            extracted: false,
            summary: String::new(),
            tags: vec![],
        }
    }

    #[test]
    fn ids_are_monotonic_and_formatted() {
        let memory = memory();
        assert_eq!(memory.add_finding(finding(HunterType::SourceScout, "a")), "finding_0000");
        assert_eq!(memory.add_finding(finding(HunterType::SourceScout, "b")), "finding_0001");
        assert_eq!(
            memory.add_source(source("https://a.com", HunterType::SourceScout, 0.5)),
            "source_0000"
        );
    }

    #[test]
    fn add_finding_is_append_only() {
        let memory = memory();
        let first = memory.add_finding(finding(HunterType::DeepAnalyst, "hostels near the river"));
        let before = memory.finding(&first).unwrap();

        for i in 0..5 {
            memory.add_finding(finding(HunterType::FactChecker, &format!("claim {}", i)));
        }

        let after = memory.finding(&first).unwrap();
        assert_eq!(memory.finding_count(), 6);
        assert_eq!(before.content, after.content);
        assert_eq!(before.hunter_id, after.hunter_id);
        assert_eq!(before.finding_type, after.finding_type);
    }

    #[test]
    fn confidence_is_clamped() {
        let memory = memory();
        let id = memory.add_finding(finding(HunterType::DeepAnalyst, "x").confidence(1.7));
        assert_eq!(memory.finding(&id).unwrap().confidence, 1.0);
    }

    #[test]
    fn keyword_overlap_links_findings_both_ways() {
        let memory = memory();
        let a = memory.add_finding(finding(
            HunterType::SourceScout,
            "budget hotels in Lisbon start at 40 euros",
        ));
        let b = memory.add_finding(finding(
            HunterType::DeepAnalyst,
            "Lisbon budget hotels fill quickly in summer",
        ));
        let c = memory.add_finding(finding(HunterType::FactChecker, "unrelated remark"));

        let fa = memory.finding(&a).unwrap();
        let fb = memory.finding(&b).unwrap();
        assert_eq!(fa.related_finding_ids, vec![b.clone()]);
        assert_eq!(fb.related_finding_ids, vec![a.clone()]);
        assert!(memory.finding(&c).unwrap().related_finding_ids.is_empty());
    }

    #[test]
    fn cross_reference_is_idempotent() {
        let memory = memory();
        let a = memory.add_finding(finding(HunterType::SourceScout, "one"));
        let b = memory.add_finding(finding(HunterType::DeepAnalyst, "two"));

        assert!(memory.cross_reference(&a, &b, "supports"));
        assert!(!memory.cross_reference(&a, &b, "supports"));
        assert!(!memory.cross_reference(&b, &a, "supports"));
        assert!(!memory.cross_reference(&a, "finding_9999", "supports"));

        let snapshot = memory.export_memory();
        assert_eq!(snapshot.cross_references[&a], vec![b.clone()]);
        assert_eq!(snapshot.cross_references[&b], vec![a.clone()]);
        assert_eq!(memory.finding(&a).unwrap().related_finding_ids.len(), 1);
    }

    #[test]
    fn custom_scorer_replaces_keyword_overlap() {
        struct SameHunter;
        impl RelatednessScorer for SameHunter {
            fn relation(&self, new: &Finding, existing: &Finding) -> Option<String> {
                (new.hunter_type == existing.hunter_type).then(|| "same_hunter".to_string())
            }
        }

        let memory = ResearchMemory::with_scorer("s", "q", Box::new(SameHunter));
        let a = memory.add_finding(finding(HunterType::SourceScout, "alpha"));
        let b = memory.add_finding(finding(HunterType::SourceScout, "beta"));
        memory.add_finding(finding(HunterType::DeepAnalyst, "gamma"));

        assert_eq!(memory.finding(&a).unwrap().related_finding_ids, vec![b]);
    }

    #[test]
    fn verify_unknown_finding_is_noop() {
        let memory = memory();
        assert!(!memory.verify_finding("finding_0042", "fact_checker_1", VerificationStatus::Verified, vec![]));
        assert!(memory.export_memory().timeline.is_empty());
    }

    #[test]
    fn verification_updates_status_and_matrix() {
        let memory = memory();
        let id = memory.add_finding(finding(HunterType::DeepAnalyst, "claim"));
        assert!(memory.verify_finding(
            &id,
            "fact_checker_2",
            VerificationStatus::Disputed,
            vec!["https://example.org".into()]
        ));

        assert_eq!(memory.finding(&id).unwrap().verification_status, VerificationStatus::Disputed);
        let snapshot = memory.export_memory();
        assert_eq!(
            snapshot.verification_matrix[&id]["fact_checker_2"].result,
            VerificationStatus::Disputed
        );
        assert!(matches!(
            snapshot.timeline.last(),
            Some(TimelineEntry::FindingVerified { .. })
        ));
    }

    #[test]
    fn context_excludes_own_hunter_type() {
        let memory = memory();
        memory.add_finding(finding(HunterType::SourceScout, "scout note"));
        memory.add_finding(finding(HunterType::DeepAnalyst, "analyst note"));
        memory.add_source(source("https://scout.example.com/a", HunterType::SourceScout, 0.9));
        memory.add_source(source("https://analyst.example.com/b", HunterType::DeepAnalyst, 0.9));

        let context = memory.generate_research_context(HunterType::DeepAnalyst);
        assert!(context.starts_with("RESEARCH CONTEXT for DEEP_ANALYST:\nQuery: best budget hotels in Lisbon"));
        assert!(context.contains("• 1 findings discovered by other hunters"));
        assert!(context.contains("• 2 sources identified"));
        assert!(context.contains("scout.example.com"));
        assert!(!context.contains("analyst.example.com"));
        assert!(context.contains("• scout note"));
        assert!(!context.contains("• analyst note"));
    }

    #[test]
    fn top_sources_ordered_by_weighted_score() {
        let memory = memory();
        memory.add_source(source("https://low.com", HunterType::SourceScout, 0.1));
        memory.add_source(source("https://high.com", HunterType::SourceScout, 1.0));

        let top = memory.top_sources(10);
        assert_eq!(top[0].domain, "high.com");
        assert!((top[0].overall_score() - (0.4 + 0.15 + 0.15)).abs() < 1e-6);
        assert_eq!(top[0].quality, SourceQuality::Good);
    }

    #[test]
    fn long_findings_are_truncated_in_timeline() {
        let memory = memory();
        memory.add_finding(finding(HunterType::DeepAnalyst, &"x".repeat(150)));
        match &memory.export_memory().timeline[0] {
            TimelineEntry::FindingAdded { summary, .. } => {
                assert_eq!(summary.len(), 103);
                assert!(summary.ends_with("..."));
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn export_summarizes_domains() {
        let memory = memory();
        memory.add_source(source("https://a.com/1", HunterType::SourceScout, 0.5));
        memory.add_source(source("https://a.com/2", HunterType::SourceScout, 0.5));
        memory.add_source(source("https://b.com/1", HunterType::SourceScout, 0.5));

        let summary = memory.export_memory().summary;
        assert_eq!(summary.total_sources, 3);
        assert_eq!(summary.top_source_domains, vec!["a.com", "b.com"]);
    }

    #[test]
    fn concurrent_inserts_keep_unique_ids() {
        let memory = Arc::new(memory());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let memory = Arc::clone(&memory);
                std::thread::spawn(move || {
                    (0..25)
                        .map(|i| {
                            memory.add_finding(finding(
                                HunterType::DeepAnalyst,
                                &format!("thread {} item {} shared words here", t, i),
                            ))
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 200);
        assert_eq!(memory.finding_count(), 200);

        let snapshot = memory.export_memory();
        for (from, targets) in &snapshot.cross_references {
            for to in targets {
                assert!(snapshot.cross_references[to].contains(from));
            }
        }
    }
}
