//! Reference resolution: an explicit version pins that version, no version
//! means latest.
//!
//! Successful resolutions are memoised. Misses are not, so the memo never
//! holds more than the catalog's own references. Only catalog metadata is
//! cached; execution results and pages never pass through here.

use std::sync::Arc;

use warden_core::cache::{CachePolicy, MemoCache, MetadataOnly};

use crate::catalog::{OperatorQueryPolicy, PolicyCatalog, SavedView};

/// Cached outcome of resolving a policy reference.
#[derive(Debug, Clone)]
pub struct ResolvedPolicy(pub Arc<OperatorQueryPolicy>);

impl CachePolicy for ResolvedPolicy {
    type Class = MetadataOnly;
}

/// Cached outcome of resolving a view reference.
#[derive(Debug, Clone)]
pub struct ResolvedView(pub Arc<SavedView>);

impl CachePolicy for ResolvedView {
    type Class = MetadataOnly;
}

type ReferenceKey = (String, Option<String>);

fn key(id: &str, version: Option<&str>) -> ReferenceKey {
    (id.to_string(), version.map(str::to_string))
}

pub struct VersionResolver {
    catalog: Arc<PolicyCatalog>,
    policies: MemoCache<ReferenceKey, ResolvedPolicy>,
    views: MemoCache<ReferenceKey, ResolvedView>,
}

impl VersionResolver {
    pub fn new(catalog: Arc<PolicyCatalog>) -> Self {
        Self {
            catalog,
            policies: MemoCache::new(),
            views: MemoCache::new(),
        }
    }

    pub fn catalog(&self) -> &PolicyCatalog {
        &self.catalog
    }

    pub fn resolve_policy(
        &self,
        id: &str,
        version: Option<&str>,
    ) -> Option<Arc<OperatorQueryPolicy>> {
        self.policies
            .get_or_try_insert_with(key(id, version), || {
                let found = match version {
                    Some(version) => self.catalog.policy(id, version),
                    None => self.catalog.latest_policy(id),
                };
                found.map(ResolvedPolicy)
            })
            .map(|resolved| resolved.0)
    }

    pub fn resolve_view(&self, id: &str, version: Option<&str>) -> Option<Arc<SavedView>> {
        self.views
            .get_or_try_insert_with(key(id, version), || {
                let found = match version {
                    Some(version) => self.catalog.view(id, version),
                    None => self.catalog.latest_view(id),
                };
                found.map(ResolvedView)
            })
            .map(|resolved| resolved.0)
    }

    /// Number of memoised references, policies and views together.
    pub fn cached(&self) -> usize {
        self.policies.len() + self.views.len()
    }
}
