//! The operator API.
//!
//! ```text
//! read:     filters ─▶ page window ─▶ source ─▶ PageDto        ─▶ audit
//! execute:  id + version ─▶ resolver ─▶ fixed filters + cursor
//!           ─▶ source ─▶ summary ─▶ hook ─▶ ExecutionResultDto ─▶ audit
//! ```
//!
//! Every call writes exactly one audit record. Reads return `Err` for input
//! that cannot be interpreted; executions never return `Err` and report
//! failure through the DTO's `outcome` and `reasonCode` instead.

use std::{sync::Arc, time::Instant};

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use warden_contracts::{
    audit::{AuditAction, AuditOutcome, AuditRecord},
    cursor::Cursor,
    error::{WardenError, WardenResult},
    governance::ReasonCode,
};
use warden_core::{contained::emit_audit, traits::AuditEmitter, SafeMetrics};
use warden_policy::{AgentRegistry, AgentRegistryEntry, AgentRegistryReader};
use warden_timeline::{EnrichedTimelineEvent, TimelineEvent, TimelineJoiner, TimelineSource};

use crate::{
    catalog::{OperatorQueryPolicy, PolicyCatalog, PolicyFilters},
    config::OperatorConfig,
    dto::{
        ApiVersion, CatalogListDto, ExecutionKind, ExecutionOutcome, ExecutionResultDto, PageDto,
        PageInfo, PolicySummaryV1, PolicySummaryV2, ResultSummary, ViewSummaryV1, ViewSummaryV2,
    },
    filters::{parse, AgentReadFilters, ExecuteRequest, PageRequest, TimelineReadFilters},
    hook::{DecisionContext, DecisionHook},
    resolver::VersionResolver,
};

/// A failed execution: the code reported to the caller and a log-only detail.
struct Failure {
    reason: ReasonCode,
    detail: String,
}

impl Failure {
    fn new(reason: ReasonCode, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

impl From<WardenError> for Failure {
    fn from(e: WardenError) -> Self {
        Failure::new(reason_for(&e), e.to_string())
    }
}

/// What one policy run produced.
struct RunSummary {
    count: usize,
    has_next_page: bool,
}

pub struct OperatorApi {
    resolver: VersionResolver,
    timeline: TimelineSource,
    agents: AgentRegistryReader,
    joiner: TimelineJoiner,
    audit: Arc<dyn AuditEmitter>,
    metrics: SafeMetrics,
    hook: Option<Arc<dyn DecisionHook>>,
    config: OperatorConfig,
}

impl OperatorApi {
    /// The registry projection and join table are built here, once.
    pub fn new(
        catalog: Arc<PolicyCatalog>,
        timeline: TimelineSource,
        registry: &AgentRegistry,
        audit: Arc<dyn AuditEmitter>,
    ) -> Self {
        let agents = AgentRegistryReader::new(registry);
        let joiner = TimelineJoiner::new(agents.entries());
        Self {
            resolver: VersionResolver::new(catalog),
            timeline,
            agents,
            joiner,
            audit,
            metrics: SafeMetrics::disabled(),
            hook: None,
            config: OperatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OperatorConfig) -> WardenResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn with_metrics(mut self, metrics: SafeMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_decision_hook(mut self, hook: Arc<dyn DecisionHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn resolver(&self) -> &VersionResolver {
        &self.resolver
    }

    // ── Catalog listings ──────────────────────────────────────────────────────

    pub fn list_policies(&self) -> CatalogListDto<PolicySummaryV1> {
        let items = self
            .catalog()
            .latest_policies()
            .map(|p| PolicySummaryV1::from(p.as_ref()))
            .collect();
        CatalogListDto::new(ApiVersion::V1, items)
    }

    pub fn list_policies_v2(&self) -> CatalogListDto<PolicySummaryV2> {
        let items = self
            .catalog()
            .policies()
            .map(|p| PolicySummaryV2::from(p.as_ref()))
            .collect();
        CatalogListDto::new(ApiVersion::V2, items)
    }

    pub fn list_views(&self) -> CatalogListDto<ViewSummaryV1> {
        let items = self
            .catalog()
            .latest_views()
            .map(|v| ViewSummaryV1::from(v.as_ref()))
            .collect();
        CatalogListDto::new(ApiVersion::V1, items)
    }

    pub fn list_views_v2(&self) -> CatalogListDto<ViewSummaryV2> {
        let items = self
            .catalog()
            .views()
            .map(|v| ViewSummaryV2::from(v.as_ref()))
            .collect();
        CatalogListDto::new(ApiVersion::V2, items)
    }

    // ── Read endpoints ────────────────────────────────────────────────────────

    pub fn get_timeline(&self, filters: &Value) -> WardenResult<PageDto<TimelineEvent>> {
        self.read(AuditAction::TimelineRead, "timeline", || self.timeline_page(filters))
    }

    pub fn get_agents(&self, filters: &Value) -> WardenResult<PageDto<AgentRegistryEntry>> {
        self.read(AuditAction::AgentsRead, "agents", || {
            let filters: AgentReadFilters = parse("agent filters", filters)?;
            let page = PageRequest::new(filters.limit, filters.cursor.as_deref(), &self.config)?;
            let selection = filters.selection();
            let rows = self
                .agents
                .page(page.after.as_ref(), |e| selection.matches(e), page.fetch());
            Ok(paginate(rows, page.limit, AgentRegistryEntry::cursor))
        })
    }

    /// Timeline page with each event joined to its registry entry.
    pub fn get_enriched_timeline(
        &self,
        filters: &Value,
    ) -> WardenResult<PageDto<EnrichedTimelineEvent>> {
        self.read(AuditAction::EnrichedTimelineRead, "enriched_timeline", || {
            let page = self.timeline_page(filters)?;
            Ok(PageDto {
                version: page.version,
                items: self.joiner.join(page.items),
                next_cursor: page.next_cursor,
                has_more: page.has_more,
                count: page.count,
            })
        })
    }

    fn timeline_page(&self, filters: &Value) -> WardenResult<PageDto<TimelineEvent>> {
        let filters: TimelineReadFilters = parse("timeline filters", filters)?;
        let page = PageRequest::new(filters.limit, filters.cursor.as_deref(), &self.config)?;
        let rows = self
            .timeline
            .read_page(&filters.to_query()?, page.after.as_ref(), page.fetch())?;
        Ok(paginate(rows, page.limit, TimelineEvent::cursor))
    }

    fn read<T, F>(&self, action: AuditAction, endpoint: &str, f: F) -> WardenResult<PageDto<T>>
    where
        F: FnOnce() -> WardenResult<PageDto<T>>,
    {
        let started = Instant::now();
        let execution_id = Uuid::new_v4();
        let result = f();

        let record = match &result {
            Ok(page) => {
                debug!(endpoint, count = page.count, has_more = page.has_more, "operator read");
                AuditRecord::new(action, AuditOutcome::Allowed, execution_id)
                    .with_target(endpoint)
                    .with_detail(json!({ "count": page.count, "hasMore": page.has_more }))
            }
            Err(e) => {
                let reason = reason_for(e);
                warn!(endpoint, reason = %reason, error = %e, "operator read rejected");
                AuditRecord::new(action, AuditOutcome::Rejected, execution_id)
                    .with_target(endpoint)
                    .with_reason(Some(reason))
            }
        };
        emit_audit(self.audit.as_ref(), &record);
        self.metrics.timing(
            "operator_read_ms",
            elapsed_ms(started),
            &[("endpoint", endpoint), ("outcome", outcome_label(result.is_ok()))],
        );
        result
    }

    // ── Executions ────────────────────────────────────────────────────────────

    /// Run a policy by id, pinned to `version` or the latest when `None`.
    /// `request` carries only the caller's `cursor`.
    pub fn execute_policy(
        &self,
        id: &str,
        version: Option<&str>,
        request: &Value,
    ) -> ExecutionResultDto {
        self.execute(ApiVersion::V1, ExecutionKind::Policy, id, version, request)
    }

    /// Run the policy a saved view points at. Same result as running that
    /// policy directly; only the audit action and DTO kind differ.
    pub fn execute_view(
        &self,
        id: &str,
        version: Option<&str>,
        request: &Value,
    ) -> ExecutionResultDto {
        self.execute(ApiVersion::V1, ExecutionKind::View, id, version, request)
    }

    /// As [`execute_policy`](Self::execute_policy), also reporting the policy
    /// version that ran and the decision hook's advice.
    pub fn execute_policy_v2(
        &self,
        id: &str,
        version: Option<&str>,
        request: &Value,
    ) -> ExecutionResultDto {
        self.execute(ApiVersion::V2, ExecutionKind::Policy, id, version, request)
    }

    pub fn execute_view_v2(
        &self,
        id: &str,
        version: Option<&str>,
        request: &Value,
    ) -> ExecutionResultDto {
        self.execute(ApiVersion::V2, ExecutionKind::View, id, version, request)
    }

    fn execute(
        &self,
        api_version: ApiVersion,
        kind: ExecutionKind,
        id: &str,
        pinned: Option<&str>,
        request: &Value,
    ) -> ExecutionResultDto {
        let started = Instant::now();
        let execution_id = Uuid::new_v4();

        let reference = match pinned {
            Some(v) => format!("{id}@{v}"),
            None => id.to_string(),
        };
        let reference = reference.as_str();

        let (policy, run) = match self.resolve(kind, id, pinned) {
            Ok(policy) => {
                let run = self.run(&policy, request);
                (Some(policy), run)
            }
            Err(failure) => (None, Err(failure)),
        };

        let limit = policy.as_ref().map_or(0, |p| p.limit);
        let (outcome, reason_code, summary, page_info) = match &run {
            Ok(summary) => (
                ExecutionOutcome::Success,
                None,
                ResultSummary {
                    message: format!("{} matching result(s)", summary.count),
                    count: summary.count,
                },
                PageInfo {
                    has_next_page: summary.has_next_page,
                    count: summary.count,
                    limit,
                },
            ),
            Err(failure) => (
                ExecutionOutcome::Error,
                Some(failure.reason),
                ResultSummary {
                    message: format!("execution failed: {}", failure.reason),
                    count: 0,
                },
                PageInfo {
                    has_next_page: false,
                    count: 0,
                    limit,
                },
            ),
        };

        let decision = match api_version {
            ApiVersion::V2 => self.hook.as_ref().and_then(|hook| {
                hook.decide(&DecisionContext {
                    risk_tier: policy.as_ref().map(|p| p.risk_tier),
                    outcome,
                    reason_code,
                })
            }),
            ApiVersion::V1 => None,
        };

        let dto = ExecutionResultDto {
            version: api_version,
            execution_id,
            kind,
            id: id.to_string(),
            outcome,
            reason_code,
            policy_version: match api_version {
                ApiVersion::V2 => policy.as_ref().map(|p| p.version.clone()),
                ApiVersion::V1 => None,
            },
            result_summary: summary,
            page_info,
            timestamp: Utc::now(),
            decision,
        };

        match &run {
            Ok(_) => info!(
                %execution_id,
                kind = ?kind,
                reference,
                count = dto.page_info.count,
                has_next_page = dto.page_info.has_next_page,
                "operator execution succeeded"
            ),
            Err(failure) => warn!(
                %execution_id,
                kind = ?kind,
                reference,
                reason = %failure.reason,
                detail = %failure.detail,
                "operator execution failed"
            ),
        }

        let action = match kind {
            ExecutionKind::Policy => AuditAction::PolicyExecute,
            ExecutionKind::View => AuditAction::ViewExecute,
        };
        let audit_outcome = match outcome {
            ExecutionOutcome::Success => AuditOutcome::Allowed,
            ExecutionOutcome::Error => AuditOutcome::Rejected,
        };
        let record = AuditRecord::new(action, audit_outcome, execution_id)
            .with_target(reference)
            .with_reason(reason_code)
            .with_detail(json!({
                "apiVersion": api_version,
                "policy": policy.as_ref().map(|p| p.reference()),
                "count": dto.page_info.count,
                "hasNextPage": dto.page_info.has_next_page,
                "decision": dto.decision,
            }));
        emit_audit(self.audit.as_ref(), &record);

        let kind_label = match kind {
            ExecutionKind::Policy => "policy",
            ExecutionKind::View => "view",
        };
        self.metrics.timing(
            "operator_execution_ms",
            elapsed_ms(started),
            &[("kind", kind_label), ("outcome", outcome_label(run.is_ok()))],
        );

        dto
    }

    /// The policy an execution runs: the referenced policy, or the latest
    /// version of the policy a view points at.
    fn resolve(
        &self,
        kind: ExecutionKind,
        id: &str,
        pinned: Option<&str>,
    ) -> Result<Arc<OperatorQueryPolicy>, Failure> {
        match kind {
            ExecutionKind::Policy => self
                .resolver
                .resolve_policy(id, pinned)
                .ok_or_else(|| Failure::new(ReasonCode::UnknownPolicyId, "policy not found")),
            ExecutionKind::View => {
                let view = self
                    .resolver
                    .resolve_view(id, pinned)
                    .ok_or_else(|| Failure::new(ReasonCode::UnknownViewId, "view not found"))?;
                self.resolver.resolve_policy(&view.policy_id, None).ok_or_else(|| {
                    Failure::new(ReasonCode::UnknownPolicyId, "view references a missing policy")
                })
            }
        }
    }

    /// Run a resolved policy with its fixed filters and the caller's cursor.
    fn run(&self, policy: &OperatorQueryPolicy, request: &Value) -> Result<RunSummary, Failure> {
        let request: ExecuteRequest = parse("execute request", request)?;
        let after = request.cursor.as_deref().map(Cursor::decode).transpose()?;
        let fetch = policy.limit + 1;

        let matched = match &policy.filters {
            PolicyFilters::Timeline(filters) => self
                .timeline
                .read_page(&filters.to_query(), after.as_ref(), fetch)?
                .len(),
            PolicyFilters::AgentRegistry(filters) => self
                .agents
                .page(after.as_ref(), |e| filters.matches(e), fetch)
                .len(),
        };

        Ok(RunSummary {
            count: matched.min(policy.limit),
            has_next_page: matched > policy.limit,
        })
    }

    fn catalog(&self) -> &PolicyCatalog {
        self.resolver.catalog()
    }
}

/// Trim a `limit + 1` fetch to `limit` rows and derive the next cursor.
fn paginate<T, F>(mut rows: Vec<T>, limit: usize, cursor_of: F) -> PageDto<T>
where
    F: Fn(&T) -> Cursor,
{
    let has_more = rows.len() > limit;
    rows.truncate(limit);
    let next_cursor = if has_more {
        rows.last().map(|row| cursor_of(row).encode())
    } else {
        None
    };
    PageDto {
        version: ApiVersion::V1,
        count: rows.len(),
        items: rows,
        next_cursor,
        has_more,
    }
}

/// Caller input problems are validation failures; anything else is ours.
fn reason_for(error: &WardenError) -> ReasonCode {
    match error {
        WardenError::Validation { .. } | WardenError::InvalidCursor { .. } => {
            ReasonCode::ValidationFailed
        }
        _ => ReasonCode::InternalError,
    }
}

fn outcome_label(ok: bool) -> &'static str {
    if ok {
        "success"
    } else {
        "error"
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
