//! Wire shapes returned by the operator API.
//!
//! Every DTO is a closed struct: no flattened maps, no pass-through JSON.
//! Each declares its cache class so the resolver's memo cache can only ever
//! hold metadata.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use warden_contracts::governance::ReasonCode;
use warden_core::cache::{CachePolicy, MetadataOnly, NoCache, ReadModelOnly};

use crate::{
    catalog::{OperatorQueryPolicy, PolicyTarget, ResultOrdering, RiskTier, SavedView},
    hook::HookDecision,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    V1,
    V2,
}

// ── Read endpoints ────────────────────────────────────────────────────────────

/// One page of a read endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDto<T> {
    pub version: ApiVersion,
    pub items: Vec<T>,
    /// Present only when `has_more` is true.
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub count: usize,
}

impl<T> CachePolicy for PageDto<T> {
    type Class = ReadModelOnly;
}

// ── Executions ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionKind {
    Policy,
    View,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionOutcome {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub message: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub count: usize,
    pub limit: usize,
}

/// The bounded outcome of a policy or view execution. Never carries rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResultDto {
    pub version: ApiVersion,
    pub execution_id: Uuid,
    pub kind: ExecutionKind,
    pub id: String,
    pub outcome: ExecutionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<ReasonCode>,
    /// The policy version that actually ran. Reported by v2 only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_version: Option<String>,
    pub result_summary: ResultSummary,
    pub page_info: PageInfo,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<HookDecision>,
}

impl CachePolicy for ExecutionResultDto {
    type Class = NoCache;
}

// ── Catalog listings ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogListDto<T> {
    pub version: ApiVersion,
    pub items: Vec<T>,
    pub count: usize,
}

impl<T> CatalogListDto<T> {
    pub(crate) fn new(version: ApiVersion, items: Vec<T>) -> Self {
        let count = items.len();
        Self {
            version,
            items,
            count,
        }
    }
}

impl<T> CachePolicy for CatalogListDto<T> {
    type Class = MetadataOnly;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySummaryV1 {
    pub policy_id: String,
    pub version: String,
    pub risk_tier: RiskTier,
    pub target: PolicyTarget,
    pub description: String,
}

impl From<&OperatorQueryPolicy> for PolicySummaryV1 {
    fn from(p: &OperatorQueryPolicy) -> Self {
        Self {
            policy_id: p.policy_id.clone(),
            version: p.version.clone(),
            risk_tier: p.risk_tier,
            target: p.target(),
            description: p.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySummaryV2 {
    pub policy_id: String,
    pub version: String,
    pub is_latest: bool,
    pub supersedes_version: Option<String>,
    pub deprecated_at: Option<DateTime<Utc>>,
    pub risk_tier: RiskTier,
    pub target: PolicyTarget,
    pub ordering: ResultOrdering,
    pub limit: usize,
    pub description: String,
}

impl From<&OperatorQueryPolicy> for PolicySummaryV2 {
    fn from(p: &OperatorQueryPolicy) -> Self {
        Self {
            policy_id: p.policy_id.clone(),
            version: p.version.clone(),
            is_latest: p.is_latest,
            supersedes_version: p.supersedes_version.clone(),
            deprecated_at: p.deprecated_at,
            risk_tier: p.risk_tier,
            target: p.target(),
            ordering: p.ordering(),
            limit: p.limit,
            description: p.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSummaryV1 {
    pub view_id: String,
    pub version: String,
    pub title: String,
    pub policy_id: String,
}

impl From<&SavedView> for ViewSummaryV1 {
    fn from(v: &SavedView) -> Self {
        Self {
            view_id: v.view_id.clone(),
            version: v.version.clone(),
            title: v.title.clone(),
            policy_id: v.policy_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSummaryV2 {
    pub view_id: String,
    pub version: String,
    pub is_latest: bool,
    pub supersedes_version: Option<String>,
    pub deprecated_at: Option<DateTime<Utc>>,
    pub title: String,
    pub policy_id: String,
}

impl From<&SavedView> for ViewSummaryV2 {
    fn from(v: &SavedView) -> Self {
        Self {
            view_id: v.view_id.clone(),
            version: v.version.clone(),
            is_latest: v.is_latest,
            supersedes_version: v.supersedes_version.clone(),
            deprecated_at: v.deprecated_at,
            title: v.title.clone(),
            policy_id: v.policy_id.clone(),
        }
    }
}
