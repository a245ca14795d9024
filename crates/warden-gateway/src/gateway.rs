//! The mutation gateway.
//!
//! ```text
//! command ─▶ structural check ─▶ tool allow-list ─▶ parameter schema
//!         ─▶ approval present ─▶ [key lock] idempotency get
//!         ─▶ dispatch ─▶ save [unlock]
//! ```
//!
//! Audit trail per submission: `MUTATION_RECEIVED`, then either
//! `MUTATION_REJECTED`, `MUTATION_REPLAYED`, or `MUTATION_DISPATCHED`
//! followed by `MUTATION_SUCCEEDED` / `MUTATION_FAILED`. The command
//! parameters are written to the audit store only; log lines carry the tool
//! name, execution id and outcome.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use warden_contracts::{
    audit::{AuditAction, AuditOutcome, AuditRecord},
    error::{WardenError, WardenResult},
    governance::ReasonCode,
    mutation::{MutationCommand, MutationResult, MutationStatus},
};
use warden_core::{
    contained::emit_audit,
    traits::{AuditEmitter, MutationExecutor},
    SafeMetrics,
};

use crate::{
    idempotency::{payload_hash, IdempotencyStore},
    tools::MutationToolRegistry,
};

type KeyLock = Arc<Mutex<()>>;

pub struct MutationGateway {
    tools: MutationToolRegistry,
    store: IdempotencyStore,
    executor: Arc<dyn MutationExecutor>,
    audit: Arc<dyn AuditEmitter>,
    metrics: SafeMetrics,
    key_locks: Mutex<HashMap<(String, String), KeyLock>>,
}

impl MutationGateway {
    pub fn new(
        tools: MutationToolRegistry,
        executor: Arc<dyn MutationExecutor>,
        audit: Arc<dyn AuditEmitter>,
    ) -> Self {
        Self {
            tools,
            store: IdempotencyStore::new(),
            executor,
            audit,
            metrics: SafeMetrics::disabled(),
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: SafeMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn store(&self) -> &IdempotencyStore {
        &self.store
    }

    /// Parse a raw JSON command and submit it.
    ///
    /// A document that is not a well-formed command is rejected with
    /// `VALIDATION_FAILED` and audited; nothing about its content is logged.
    pub fn submit_json(&self, raw: &Value) -> WardenResult<MutationResult> {
        match serde_json::from_value::<MutationCommand>(raw.clone()) {
            Ok(command) => self.submit(&command),
            Err(e) => {
                let execution_id = Uuid::new_v4();
                self.audit(
                    AuditRecord::new(AuditAction::MutationReceived, AuditOutcome::Allowed, execution_id)
                        .with_detail(json!({ "raw": raw })),
                );
                Ok(self.reject(
                    execution_id,
                    None,
                    ReasonCode::ValidationFailed,
                    json!({ "errors": [format!("malformed mutation command: {e}")] }),
                ))
            }
        }
    }

    /// Run one mutation command through the gateway.
    ///
    /// Returns `Err` only for an idempotency collision or an unusable store.
    /// Every other outcome, including executor failure, is a `MutationResult`.
    pub fn submit(&self, command: &MutationCommand) -> WardenResult<MutationResult> {
        let execution_id = Uuid::new_v4();
        let tool = command.tool_name.as_str();

        self.audit(
            AuditRecord::new(AuditAction::MutationReceived, AuditOutcome::Allowed, execution_id)
                .with_target(tool)
                .with_detail(json!({
                    "toolVersion": command.tool_version,
                    "parameters": command.parameters,
                })),
        );

        let structural = structural_errors(command);
        if !structural.is_empty() {
            return Ok(self.reject(
                execution_id,
                Some(tool),
                ReasonCode::ValidationFailed,
                json!({ "errors": structural }),
            ));
        }

        let resolved = match self.tools.resolve(tool, &command.tool_version) {
            Ok(resolved) => resolved,
            Err(reason) => {
                return Ok(self.reject(execution_id, Some(tool), reason, Value::Null));
            }
        };

        let violations = resolved.validate_parameters(&command.parameters);
        if !violations.is_empty() {
            return Ok(self.reject(
                execution_id,
                Some(tool),
                ReasonCode::ValidationFailed,
                json!({ "errors": violations }),
            ));
        }

        if command.approval.is_none() {
            return Ok(self.reject(
                execution_id,
                Some(tool),
                ReasonCode::ApprovalRequired,
                Value::Null,
            ));
        }

        let key = (command.tenant_id.clone(), command.idempotency_key.clone());
        let key_lock = self.key_lock(&key)?;
        let outcome = {
            let _held = match key_lock.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            self.dispatch_once(command, execution_id)
        };
        drop(key_lock);
        self.release_key_lock(&key);
        outcome
    }

    fn dispatch_once(
        &self,
        command: &MutationCommand,
        execution_id: Uuid,
    ) -> WardenResult<MutationResult> {
        let tool = command.tool_name.as_str();
        let hash = payload_hash(command);

        let prior = match self.store.get(&command.tenant_id, &command.idempotency_key, &hash) {
            Ok(prior) => prior,
            Err(e) => {
                warn!(tool, %execution_id, error = %e, "mutation refused");
                self.audit(
                    AuditRecord::new(AuditAction::MutationRejected, AuditOutcome::Rejected, execution_id)
                        .with_target(tool)
                        .with_detail(json!({ "error": e.to_string() })),
                );
                return Err(e);
            }
        };

        if let Some(prior) = prior {
            info!(tool, %execution_id, original = %prior.execution_id, "mutation replayed");
            self.metrics.increment("mutation_replayed", 1, &[("tool", tool)]);
            self.audit(
                AuditRecord::new(AuditAction::MutationReplayed, AuditOutcome::Allowed, execution_id)
                    .with_target(tool)
                    .with_detail(json!({ "originalExecutionId": prior.execution_id })),
            );
            return Ok(prior);
        }

        self.audit(
            AuditRecord::new(AuditAction::MutationDispatched, AuditOutcome::Allowed, execution_id)
                .with_target(tool),
        );

        let result = match self.executor.execute(command) {
            Ok(output) => {
                info!(tool, %execution_id, "mutation succeeded");
                self.audit(
                    AuditRecord::new(AuditAction::MutationSucceeded, AuditOutcome::Allowed, execution_id)
                        .with_target(tool)
                        .with_detail(json!({ "output": output })),
                );
                MutationResult {
                    execution_id,
                    status: MutationStatus::Succeeded,
                    reason_code: None,
                    output: Some(output),
                    timestamp: Utc::now(),
                }
            }
            Err(e) => {
                warn!(tool, %execution_id, "mutation failed in executor");
                self.audit(
                    AuditRecord::new(AuditAction::MutationFailed, AuditOutcome::Allowed, execution_id)
                        .with_target(tool)
                        .with_reason(Some(ReasonCode::InternalError))
                        .with_detail(json!({ "error": e.to_string() })),
                );
                MutationResult {
                    execution_id,
                    status: MutationStatus::Failed,
                    reason_code: Some(ReasonCode::InternalError),
                    output: None,
                    timestamp: Utc::now(),
                }
            }
        };

        self.metrics.increment(
            "mutation_dispatched",
            1,
            &[("tool", tool), ("status", status_label(result.status))],
        );
        self.store
            .save(&command.tenant_id, &command.idempotency_key, &hash, result.clone())?;
        Ok(result)
    }

    fn reject(
        &self,
        execution_id: Uuid,
        tool: Option<&str>,
        reason: ReasonCode,
        detail: Value,
    ) -> MutationResult {
        warn!(tool = tool.unwrap_or("-"), %execution_id, reason = %reason, "mutation rejected");
        let mut record =
            AuditRecord::new(AuditAction::MutationRejected, AuditOutcome::Rejected, execution_id)
                .with_reason(Some(reason))
                .with_detail(detail);
        if let Some(tool) = tool {
            record = record.with_target(tool);
        }
        self.audit(record);
        self.metrics
            .increment("mutation_rejected", 1, &[("reason", reason.as_str())]);

        MutationResult {
            execution_id,
            status: MutationStatus::Rejected,
            reason_code: Some(reason),
            output: None,
            timestamp: Utc::now(),
        }
    }

    fn audit(&self, record: AuditRecord) {
        emit_audit(self.audit.as_ref(), &record);
    }

    fn key_lock(&self, key: &(String, String)) -> WardenResult<KeyLock> {
        let mut locks = self.key_locks.lock().map_err(|e| WardenError::StoreUnavailable {
            reason: format!("key lock table poisoned: {}", e),
        })?;
        Ok(locks.entry(key.clone()).or_default().clone())
    }

    /// Drop the lock entry once no submission holds or waits on it.
    fn release_key_lock(&self, key: &(String, String)) {
        if let Ok(mut locks) = self.key_locks.lock() {
            if locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
                locks.remove(key);
            }
        }
    }
}

fn structural_errors(command: &MutationCommand) -> Vec<String> {
    let mut errors = Vec::new();
    for (field, value) in [
        ("tenantId", &command.tenant_id),
        ("actorId", &command.actor_id),
        ("idempotencyKey", &command.idempotency_key),
        ("toolName", &command.tool_name),
        ("toolVersion", &command.tool_version),
    ] {
        if value.trim().is_empty() {
            errors.push(format!("{field} must not be empty"));
        }
    }
    if !command.parameters.is_object() {
        errors.push("parameters must be an object".to_string());
    }
    if let Some(approval) = &command.approval {
        if approval.approval_id.trim().is_empty() || approval.approver_role.trim().is_empty() {
            errors.push("approval must name an approval id and approver role".to_string());
        }
    }
    errors
}

fn status_label(status: MutationStatus) -> &'static str {
    match status {
        MutationStatus::Succeeded => "succeeded",
        MutationStatus::Failed => "failed",
        MutationStatus::Rejected => "rejected",
    }
}
