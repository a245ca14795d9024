//! Sliding-window abuse detection over tool invocation outcomes.
//!
//! | Rule | Qualifying event       | Key                    | Threshold | Window | Severity |
//! |------|------------------------|------------------------|-----------|--------|----------|
//! | A    | outcome `RATE_LIMITED` | `A:tool:actorType`     | 10        | 5 min  | medium   |
//! | B    | error `FORBIDDEN`      | `B:tool`               | 5         | 10 min | high     |
//! | C    | error `FEATURE_DISABLED` | `C:tool`             | 1         | 1 min  | high     |
//! | D    | error `CONFLICT`       | `D:tool`               | 5         | 10 min | low      |
//!
//! Time is taken from the observation, never from the wall clock, so replays
//! of stored telemetry produce the same signals as the live stream did.
//!
//! Throttling is measured from the last emission for a key: once a signal
//! fires, that key stays quiet for one full window regardless of how many
//! qualifying events keep arriving.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use warden_contracts::{
    governance::Severity,
    telemetry::{RawToolGatewayEvent, ToolErrorCode, ToolOutcome},
};
use warden_core::SafeMetrics;

/// The four fixed abuse rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbuseRule {
    /// Repeated rate limiting for one tool and actor type.
    #[serde(rename = "A")]
    RateLimitBurst,
    /// Repeated authorization failures on one tool.
    #[serde(rename = "B")]
    ForbiddenBurst,
    /// Any call into a disabled feature.
    #[serde(rename = "C")]
    FeatureDisabledProbe,
    /// Repeated write conflicts on one tool.
    #[serde(rename = "D")]
    ConflictBurst,
}

impl AbuseRule {
    pub const ALL: [AbuseRule; 4] = [
        AbuseRule::RateLimitBurst,
        AbuseRule::ForbiddenBurst,
        AbuseRule::FeatureDisabledProbe,
        AbuseRule::ConflictBurst,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            AbuseRule::RateLimitBurst => "A",
            AbuseRule::ForbiddenBurst => "B",
            AbuseRule::FeatureDisabledProbe => "C",
            AbuseRule::ConflictBurst => "D",
        }
    }

    pub fn threshold(&self) -> usize {
        match self {
            AbuseRule::RateLimitBurst => 10,
            AbuseRule::ForbiddenBurst => 5,
            AbuseRule::FeatureDisabledProbe => 1,
            AbuseRule::ConflictBurst => 5,
        }
    }

    pub fn window(&self) -> Duration {
        match self {
            AbuseRule::RateLimitBurst => Duration::from_secs(5 * 60),
            AbuseRule::ForbiddenBurst => Duration::from_secs(10 * 60),
            AbuseRule::FeatureDisabledProbe => Duration::from_secs(60),
            AbuseRule::ConflictBurst => Duration::from_secs(10 * 60),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AbuseRule::RateLimitBurst => Severity::Medium,
            AbuseRule::ForbiddenBurst => Severity::High,
            AbuseRule::FeatureDisabledProbe => Severity::High,
            AbuseRule::ConflictBurst => Severity::Low,
        }
    }

    fn qualifies(&self, obs: &InvocationObservation) -> bool {
        match self {
            AbuseRule::RateLimitBurst => obs.outcome == ToolOutcome::RateLimited,
            AbuseRule::ForbiddenBurst => obs.error_code == Some(ToolErrorCode::Forbidden),
            AbuseRule::FeatureDisabledProbe => {
                obs.error_code == Some(ToolErrorCode::FeatureDisabled)
            }
            AbuseRule::ConflictBurst => obs.error_code == Some(ToolErrorCode::Conflict),
        }
    }

    fn window_key(&self, obs: &InvocationObservation) -> String {
        match self {
            AbuseRule::RateLimitBurst => {
                format!("{}:{}:{}", self.id(), obs.tool_name, obs.actor_type)
            }
            _ => format!("{}:{}", self.id(), obs.tool_name),
        }
    }
}

/// The part of a tool invocation the abuse rules look at.
///
/// Carries no tenant, actor, or request identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationObservation {
    pub tool_name: String,
    pub actor_type: String,
    pub outcome: ToolOutcome,
    pub error_code: Option<ToolErrorCode>,
    pub at: DateTime<Utc>,
}

impl From<&RawToolGatewayEvent> for InvocationObservation {
    fn from(event: &RawToolGatewayEvent) -> Self {
        Self {
            tool_name: event.tool_name.clone(),
            actor_type: event.actor_type.clone(),
            outcome: event.outcome,
            error_code: event.error_code,
            at: event.timestamp,
        }
    }
}

/// One emitted abuse signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbuseSignal {
    pub rule_id: AbuseRule,
    pub severity: Severity,
    pub observed_count: usize,
    pub threshold: usize,
    pub window_ms: u64,
    pub tool_name: String,
    /// Only set for rule A.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_type: Option<String>,
    pub detected_at: DateTime<Utc>,
}

/// Memory bounds for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AbuseEngineConfig {
    /// Eviction of idle windows starts once more keys than this are tracked.
    pub max_tracked_keys: usize,
    /// A window untouched for longer than this is evictable.
    #[serde(with = "duration_secs")]
    pub idle_eviction: Duration,
}

impl Default for AbuseEngineConfig {
    fn default() -> Self {
        Self {
            max_tracked_keys: 1000,
            idle_eviction: Duration::from_secs(60 * 60),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[derive(Debug, Default)]
struct WindowState {
    hits: VecDeque<DateTime<Utc>>,
    last_emitted: Option<DateTime<Utc>>,
    last_seen: Option<DateTime<Utc>>,
}

/// Stateful rule evaluator. Shareable across threads.
pub struct AbuseSignalEngine {
    config: AbuseEngineConfig,
    windows: Mutex<HashMap<String, WindowState>>,
    metrics: SafeMetrics,
}

impl AbuseSignalEngine {
    pub fn new(config: AbuseEngineConfig, metrics: SafeMetrics) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    /// Feed one observation through every rule and return the signals it
    /// triggered. Never fails; a poisoned lock is recovered.
    pub fn observe(&self, obs: &InvocationObservation) -> Vec<AbuseSignal> {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut signals = Vec::new();
        for rule in AbuseRule::ALL {
            if !rule.qualifies(obs) {
                continue;
            }
            let window = rule.window();
            let state = windows.entry(rule.window_key(obs)).or_default();
            prune(&mut state.hits, obs.at, window);
            state.hits.push_back(obs.at);
            state.last_seen = Some(obs.at);

            if state.hits.len() < rule.threshold() {
                continue;
            }
            if state
                .last_emitted
                .is_some_and(|last| elapsed(last, obs.at) < window)
            {
                debug!(rule = rule.id(), tool = %obs.tool_name, "abuse signal throttled");
                continue;
            }

            state.last_emitted = Some(obs.at);
            let signal = AbuseSignal {
                rule_id: rule,
                severity: rule.severity(),
                observed_count: state.hits.len(),
                threshold: rule.threshold(),
                window_ms: window.as_millis() as u64,
                tool_name: obs.tool_name.clone(),
                actor_type: matches!(rule, AbuseRule::RateLimitBurst)
                    .then(|| obs.actor_type.clone()),
                detected_at: obs.at,
            };
            info!(
                rule = rule.id(),
                severity = %signal.severity,
                tool = %signal.tool_name,
                observed = signal.observed_count,
                "abuse signal emitted"
            );
            self.metrics.increment(
                "abuse_signal_emitted",
                1,
                &[("rule", rule.id()), ("severity", signal.severity.as_str())],
            );
            signals.push(signal);
        }

        self.evict_idle(&mut windows, obs.at);
        signals
    }

    /// Convenience wrapper for raw gateway telemetry.
    pub fn observe_event(&self, event: &RawToolGatewayEvent) -> Vec<AbuseSignal> {
        self.observe(&InvocationObservation::from(event))
    }

    /// Number of keys currently holding window state.
    pub fn tracked_keys(&self) -> usize {
        match self.windows.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    fn evict_idle(&self, windows: &mut HashMap<String, WindowState>, now: DateTime<Utc>) {
        if windows.len() <= self.config.max_tracked_keys {
            return;
        }
        let before = windows.len();
        let idle = self.config.idle_eviction;
        windows.retain(|_, state| {
            state
                .last_seen
                .is_some_and(|seen| elapsed(seen, now) <= idle)
        });
        debug!(evicted = before - windows.len(), "idle abuse windows evicted");
    }
}

impl Default for AbuseSignalEngine {
    fn default() -> Self {
        Self::new(AbuseEngineConfig::default(), SafeMetrics::disabled())
    }
}

fn prune(hits: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) {
    while let Some(front) = hits.front() {
        if elapsed(*front, now) >= window {
            hits.pop_front();
        } else {
            break;
        }
    }
}

/// Time from `earlier` to `later`, zero when the clock went backwards.
fn elapsed(earlier: DateTime<Utc>, later: DateTime<Utc>) -> Duration {
    (later - earlier).to_std().unwrap_or(Duration::ZERO)
}
