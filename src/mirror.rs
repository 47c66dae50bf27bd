//! Mirror engine: drives one pass over the source tree.
//!
//! For each directory the engine resolves the remote container, snapshots
//! the existing items once, classifies and conflict-resolves every file,
//! uploads data files, and only then runs the deferred metadata pass that
//! attaches sidecar documents to the items (or, for the dataset-level
//! descriptor, to the container) of the same directory.
//!
//! Failure semantics are deliberately blunt: the first transport failure,
//! local read failure, descriptor parse failure or name-conflict abort ends
//! the run. Nothing already uploaded is rolled back; re-running with
//! `OVERWRITE_ON_SAME_NAME` or `RESET_DATABASE` is the recovery path.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::classify::{self, FileKind};
use crate::conflict::{decide, Action, ImportPolicy};
use crate::reset;
use crate::resolve::ContainerResolver;
use crate::store::{Store, StoreError};

/// Everything the engine needs for one run. Credentials stay with the store
/// handle; the engine never sees them.
#[derive(Debug)]
pub struct MirrorConfig {
    pub source_root: PathBuf,
    pub destination_id: String,
    pub policy: ImportPolicy,
}

/// First-failure taxonomy for a run. `ValidationFailed` and `NameConflict`
/// are expected, user-actionable outcomes; the rest are fatal environment
/// failures, never retried.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("dataset validation failed for {root}")]
    ValidationFailed { root: PathBuf },

    #[error("item '{name}' already exists in container {container_id} (policy {policy:?})")]
    NameConflict {
        name: String,
        container_id: String,
        policy: ImportPolicy,
    },

    #[error("remote store call failed: {0}")]
    Transport(#[source] StoreError),

    #[error("failed to read local path {path}")]
    LocalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("descriptor {path} is not a valid JSON document")]
    DescriptorParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<StoreError> for MirrorError {
    fn from(e: StoreError) -> Self {
        MirrorError::Transport(e)
    }
}

/// What one run did, for the CLI summary and for tests.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MirrorReport {
    pub containers_created: usize,
    pub items_created: usize,
    pub items_overwritten: usize,
    pub items_skipped: usize,
    pub metadata_attached: usize,
}

/// Mirror the source tree into the destination container.
///
/// Under `RESET_DATABASE` the destination is emptied first, strictly before
/// the walk begins. The walk is depth-first; sibling order carries no
/// meaning, but every directory's files are fully uploaded before its
/// metadata pass runs.
pub async fn mirror<S: Store>(
    config: &MirrorConfig,
    store: &S,
) -> Result<MirrorReport, MirrorError> {
    info!(
        source_root = %config.source_root.display(),
        destination_id = %config.destination_id,
        policy = ?config.policy,
        "starting mirror run"
    );

    if config.policy == ImportPolicy::ResetDatabase {
        info!(container_id = %config.destination_id, "emptying destination before mirroring");
        reset::empty_container(store, &config.destination_id).await?;
    }

    let mut resolver = ContainerResolver::new(config.destination_id.clone());
    let mut report = MirrorReport::default();

    let mut pending: Vec<(PathBuf, Vec<String>)> = vec![(config.source_root.clone(), Vec::new())];
    while let Some((dir, chain)) = pending.pop() {
        let (files, subdirs) = list_directory(&dir)?;
        mirror_directory(store, &mut resolver, &chain, &files, config.policy, &mut report).await?;
        for (name, path) in subdirs {
            let mut child_chain = chain.clone();
            child_chain.push(name);
            pending.push((path, child_chain));
        }
    }

    report.containers_created = resolver.containers_created();
    info!(?report, "mirror run complete");
    Ok(report)
}

/// One directory level: snapshot, conflict-resolve, upload, then the
/// deferred metadata pass.
async fn mirror_directory<S: Store>(
    store: &S,
    resolver: &mut ContainerResolver,
    chain: &[String],
    files: &[(String, PathBuf)],
    policy: ImportPolicy,
    report: &mut MirrorReport,
) -> Result<(), MirrorError> {
    let container_id = resolver.resolve(store, chain).await?;
    debug!(container_id = %container_id, directory = %chain.join("/"), files = files.len(), "processing directory");

    // One snapshot per directory; items created in this pass are tracked
    // locally instead of re-listed from the remote.
    let existing: HashMap<String, String> = store
        .list_items(&container_id)
        .await?
        .into_iter()
        .map(|item| (item.name, item.id))
        .collect();

    let mut created_this_pass: HashMap<String, String> = HashMap::new();
    // Base key -> item id, for the metadata pass. Only data files that were
    // actually uploaded this pass are attachment targets.
    let mut data_items: HashMap<String, String> = HashMap::new();
    let mut descriptors: Vec<(FileKind, &String, &PathBuf)> = Vec::new();

    for (name, path) in files {
        let kind = classify::classify(name);
        if kind != FileKind::Data {
            // Descriptors are metadata sources only; they are never uploaded
            // as items.
            descriptors.push((kind, name, path));
            continue;
        }

        let existing_id: Option<String> = existing
            .get(name)
            .or_else(|| created_this_pass.get(name))
            .cloned();

        match decide(existing_id.as_deref(), policy) {
            Action::Create => {
                let bytes = read_file(path)?;
                let item = store.create_item(&container_id, name).await?;
                store.upload_content(&item.id, name, bytes).await?;
                debug!(item_id = %item.id, name = %name, "created item");
                created_this_pass.insert(name.clone(), item.id.clone());
                data_items.insert(classify::base_key(name).to_string(), item.id);
                report.items_created += 1;
            }
            Action::Overwrite => {
                // decide yields Overwrite only when a lookup found an id.
                if let Some(item_id) = existing_id {
                    let bytes = read_file(path)?;
                    store.upload_content(&item_id, name, bytes).await?;
                    debug!(item_id = %item_id, name = %name, "overwrote item content");
                    data_items.insert(classify::base_key(name).to_string(), item_id);
                    report.items_overwritten += 1;
                }
            }
            Action::Skip => {
                debug!(name = %name, "item already exists, skipping");
                report.items_skipped += 1;
            }
            Action::Abort => {
                error!(name = %name, container_id = %container_id, policy = ?policy, "name conflict, aborting run");
                return Err(MirrorError::NameConflict {
                    name: name.clone(),
                    container_id,
                    policy,
                });
            }
        }
    }

    // Deferred metadata pass: runs only after every file in this directory
    // has been handled.
    for (kind, name, path) in descriptors {
        match kind {
            FileKind::DatasetDescriptor => {
                let document = parse_descriptor(path)?;
                store
                    .set_container_metadata(&container_id, &document)
                    .await?;
                debug!(container_id = %container_id, "attached dataset descriptor to container");
                report.metadata_attached += 1;
            }
            FileKind::Descriptor => match data_items.get(classify::base_key(name)) {
                Some(item_id) => {
                    let document = parse_descriptor(path)?;
                    store.set_item_metadata(item_id, &document).await?;
                    debug!(item_id = %item_id, descriptor = %name, "attached descriptor to item");
                    report.metadata_attached += 1;
                }
                // Deliberate permissiveness: an unmatched descriptor never
                // fails the run.
                None => {
                    debug!(descriptor = %name, "no matching data file in this directory, dropping descriptor")
                }
            },
            FileKind::Data => {}
        }
    }

    Ok(())
}

fn list_directory(
    dir: &Path,
) -> Result<(Vec<(String, PathBuf)>, Vec<(String, PathBuf)>), MirrorError> {
    let mut files = Vec::new();
    let mut subdirs = Vec::new();

    let entries = fs::read_dir(dir).map_err(|e| MirrorError::LocalRead {
        path: dir.to_path_buf(),
        source: e,
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| MirrorError::LocalRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type().map_err(|e| MirrorError::LocalRead {
            path: path.clone(),
            source: e,
        })?;
        if file_type.is_dir() {
            subdirs.push((name, path));
        } else {
            files.push((name, path));
        }
    }
    files.sort();
    subdirs.sort();
    Ok((files, subdirs))
}

fn read_file(path: &Path) -> Result<Vec<u8>, MirrorError> {
    fs::read(path).map_err(|e| MirrorError::LocalRead {
        path: path.to_path_buf(),
        source: e,
    })
}

fn parse_descriptor(path: &Path) -> Result<Value, MirrorError> {
    let bytes = read_file(path)?;
    serde_json::from_slice(&bytes).map_err(|e| MirrorError::DescriptorParse {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Item, MockStore};
    use std::fs::write;
    use tempfile::tempdir;

    #[tokio::test]
    async fn existing_items_are_listed_once_per_directory() {
        let source = tempdir().unwrap();
        write(source.path().join("a.dat"), b"one").unwrap();
        write(source.path().join("b.dat"), b"two").unwrap();

        let mut store = MockStore::new();
        store
            .expect_list_items()
            .withf(|id| id == "root")
            .times(1)
            .returning(|_| Ok(Vec::new()));
        store.expect_create_item().times(2).returning(|_, name| {
            Ok(Item {
                id: format!("item-{name}"),
                name: name.to_string(),
            })
        });
        store
            .expect_upload_content()
            .times(2)
            .returning(|_, _, _| Ok(()));

        let config = MirrorConfig {
            source_root: source.path().to_path_buf(),
            destination_id: "root".to_string(),
            policy: ImportPolicy::SkipOnSameName,
        };
        let report = mirror(&config, &store).await.unwrap();

        assert_eq!(report.items_created, 2);
        assert_eq!(report.containers_created, 0);
    }

    #[tokio::test]
    async fn uploads_complete_before_the_metadata_pass() {
        let source = tempdir().unwrap();
        write(source.path().join("a.dat"), b"payload").unwrap();
        write(source.path().join("a.json"), br#"{"TaskName":"rest"}"#).unwrap();

        let mut seq = mockall::Sequence::new();
        let mut store = MockStore::new();
        store
            .expect_list_items()
            .times(1)
            .returning(|_| Ok(Vec::new()));
        store
            .expect_create_item()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, name| {
                Ok(Item {
                    id: "item-a".to_string(),
                    name: name.to_string(),
                })
            });
        store
            .expect_upload_content()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        store
            .expect_set_item_metadata()
            .withf(|id, doc| id == "item-a" && doc["TaskName"] == "rest")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let config = MirrorConfig {
            source_root: source.path().to_path_buf(),
            destination_id: "root".to_string(),
            policy: ImportPolicy::SkipOnSameName,
        };
        let report = mirror(&config, &store).await.unwrap();

        assert_eq!(report.items_created, 1);
        assert_eq!(report.metadata_attached, 1);
    }

    #[tokio::test]
    async fn unreadable_source_root_is_a_local_read_failure() {
        let store = MockStore::new();
        let config = MirrorConfig {
            source_root: PathBuf::from("/definitely/not/a/dataset"),
            destination_id: "root".to_string(),
            policy: ImportPolicy::SkipOnSameName,
        };

        let err = mirror(&config, &store).await.unwrap_err();
        assert!(matches!(err, MirrorError::LocalRead { .. }));
    }

    #[tokio::test]
    async fn malformed_matched_descriptor_fails_the_run() {
        let source = tempdir().unwrap();
        write(source.path().join("a.dat"), b"payload").unwrap();
        write(source.path().join("a.json"), b"{not json").unwrap();

        let mut store = MockStore::new();
        store
            .expect_list_items()
            .returning(|_| Ok(Vec::new()));
        store.expect_create_item().returning(|_, name| {
            Ok(Item {
                id: "item-a".to_string(),
                name: name.to_string(),
            })
        });
        store
            .expect_upload_content()
            .returning(|_, _, _| Ok(()));

        let config = MirrorConfig {
            source_root: source.path().to_path_buf(),
            destination_id: "root".to_string(),
            policy: ImportPolicy::SkipOnSameName,
        };

        let err = mirror(&config, &store).await.unwrap_err();
        assert!(matches!(err, MirrorError::DescriptorParse { .. }));
    }
}
