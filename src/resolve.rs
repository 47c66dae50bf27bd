//! Mapping of local path segments onto remote container ids (find-or-create).

use std::collections::HashMap;

use tracing::debug;

use crate::store::{Store, StoreError};

/// Resolves chains of path segments to container ids, creating containers on
/// demand. Lookups always precede creation and resolved (parent, name) pairs
/// are memoized, so resolving the same chain twice within a run never
/// duplicates a container. The cache lives for one run only.
pub struct ContainerResolver {
    root_id: String,
    cache: HashMap<(String, String), String>,
    created: usize,
}

impl ContainerResolver {
    pub fn new(root_id: impl Into<String>) -> Self {
        ContainerResolver {
            root_id: root_id.into(),
            cache: HashMap::new(),
            created: 0,
        }
    }

    /// How many containers this resolver created (for the run report).
    pub fn containers_created(&self) -> usize {
        self.created
    }

    /// Resolve a chain of path segments, in order, starting from the root
    /// container. An empty chain resolves to the root unchanged; empty and
    /// `"."` placeholder segments (the walk's way of saying "no
    /// subdirectory") are skipped.
    pub async fn resolve<S: Store + ?Sized>(
        &mut self,
        store: &S,
        chain: &[String],
    ) -> Result<String, StoreError> {
        let mut current = self.root_id.clone();
        for segment in chain {
            if segment.is_empty() || segment == "." {
                continue;
            }
            let key = (current.clone(), segment.clone());
            if let Some(id) = self.cache.get(&key) {
                current = id.clone();
                continue;
            }
            let container = match store.find_container(&current, segment).await? {
                Some(existing) => existing,
                None => {
                    debug!(parent_id = %current, name = %segment, "creating container");
                    self.created += 1;
                    store.create_container(&current, segment).await?
                }
            };
            self.cache.insert(key, container.id.clone());
            current = container.id;
        }
        Ok(current)
    }
}
