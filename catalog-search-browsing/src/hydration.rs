//! Loading full entities for index references.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::BrowsingConfig;
use crate::errors::BrowsingError;
use catalog_search_repository::EntityStore;
use catalog_search_shared::{CatalogEntity, DocumentRef, ResponseGroup};

/// Resolves document references to entities, from their snapshot when
/// allowed and from the store otherwise.
pub struct Hydrator<T: Send> {
    store: Arc<dyn EntityStore<T>>,
    config: BrowsingConfig,
}

impl<T> Hydrator<T>
where
    T: CatalogEntity + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(store: Arc<dyn EntityStore<T>>, config: BrowsingConfig) -> Self {
        Self { store, config }
    }

    /// Load the entities behind `refs`.
    ///
    /// The result holds at most one entity per requested id, in no
    /// particular order. Ids the store no longer knows are simply absent.
    #[instrument(skip(self, refs), fields(refs = refs.len()))]
    pub async fn hydrate(
        &self,
        refs: &[DocumentRef],
        response_group: ResponseGroup,
        catalog: Option<&str>,
    ) -> Result<Vec<T>, BrowsingError> {
        let parallelism = self.config.hydration_parallelism.max(1);
        let mut entities: Vec<T> = Vec::with_capacity(refs.len());
        let mut pending: Vec<String> = Vec::new();

        let (with_snapshot, without_snapshot): (Vec<&DocumentRef>, Vec<&DocumentRef>) = refs
            .iter()
            .partition(|r| self.config.use_snapshots && r.snapshot().is_some());
        pending.extend(without_snapshot.iter().map(|r| r.id.clone()));

        let decoded: Vec<(String, Option<T>)> = stream::iter(with_snapshot)
            .map(|r| {
                let id = r.id.clone();
                let raw = r.snapshot().unwrap_or_default().to_string();
                async move {
                    let entity = tokio::task::spawn_blocking(move || serde_json::from_str::<T>(&raw))
                        .await
                        .ok()
                        .and_then(|decoded| decoded.ok());
                    (id, entity)
                }
            })
            .buffer_unordered(parallelism)
            .collect()
            .await;

        for (id, entity) in decoded {
            match entity {
                Some(entity) => entities.push(entity),
                None => {
                    warn!(id = %id, "Failed to decode snapshot, loading from store");
                    pending.push(id);
                }
            }
        }

        let mut seen = HashSet::new();
        pending.retain(|id| seen.insert(id.to_lowercase()));

        if !pending.is_empty() {
            let batch_size = self.config.hydration_batch_size.max(1);
            let loaded: Vec<Vec<T>> = stream::iter(pending.chunks(batch_size))
                .map(|chunk| self.store.get_by_ids(chunk, response_group, catalog))
                .buffer_unordered(parallelism)
                .try_collect()
                .await?;
            entities.extend(loaded.into_iter().flatten());
        }

        let requested: HashSet<String> = refs.iter().map(|r| r.id.to_lowercase()).collect();
        let mut kept = HashSet::new();
        entities.retain(|entity| {
            let id = entity.id().to_lowercase();
            requested.contains(&id) && kept.insert(id)
        });

        debug!(hydrated = entities.len(), "Hydrated references");
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use catalog_search_repository::{StoreError, StorePage, StoreQuery};
    use catalog_search_shared::fields::OBJECT_FIELD;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
        source: String,
    }

    impl CatalogEntity for Item {
        fn id(&self) -> &str {
            &self.id
        }
    }

    struct MockStore {
        known: Vec<&'static str>,
        calls: AtomicUsize,
        catalogs: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl EntityStore<Item> for MockStore {
        async fn get_by_ids(
            &self,
            ids: &[String],
            _response_group: ResponseGroup,
            catalog: Option<&str>,
        ) -> Result<Vec<Item>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.catalogs.lock().await.push(catalog.map(str::to_string));
            Ok(ids
                .iter()
                .filter(|id| self.known.contains(&id.as_str()))
                .map(|id| Item {
                    id: id.clone(),
                    source: "store".into(),
                })
                .collect())
        }

        async fn search(&self, _query: &StoreQuery) -> Result<StorePage, StoreError> {
            Ok(StorePage::default())
        }
    }

    fn store(known: Vec<&'static str>) -> Arc<MockStore> {
        Arc::new(MockStore {
            known,
            calls: AtomicUsize::new(0),
            catalogs: Mutex::new(Vec::new()),
        })
    }

    fn with_snapshot(id: &str, snapshot: &str) -> DocumentRef {
        let mut r = DocumentRef::new(id);
        r.fields.insert(OBJECT_FIELD.into(), json!(snapshot));
        r
    }

    #[tokio::test]
    async fn test_store_fetch_in_batches_with_catalog_hint() {
        let store = store(vec!["a", "b", "c"]);
        let hydrator = Hydrator::new(
            store.clone(),
            BrowsingConfig {
                hydration_batch_size: 2,
                ..Default::default()
            },
        );
        let refs: Vec<DocumentRef> = ["a", "b", "gone", "c"].iter().map(|id| DocumentRef::new(*id)).collect();

        let mut items = hydrator
            .hydrate(&refs, ResponseGroup::INFO, Some("goods"))
            .await
            .unwrap();
        items.sort_by(|x, y| x.id.cmp(&y.id));

        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
        assert!(store
            .catalogs
            .lock()
            .await
            .iter()
            .all(|c| c.as_deref() == Some("goods")));
    }

    #[tokio::test]
    async fn test_snapshots_decoded_and_bad_ones_fall_back() {
        let store = store(vec!["b"]);
        let hydrator = Hydrator::new(
            store.clone(),
            BrowsingConfig {
                use_snapshots: true,
                ..Default::default()
            },
        );
        let refs = vec![
            with_snapshot("a", r#"{"id":"a","source":"snapshot"}"#),
            with_snapshot("b", "not json"),
        ];

        let mut items = hydrator.hydrate(&refs, ResponseGroup::INFO, None).await.unwrap();
        items.sort_by(|x, y| x.id.cmp(&y.id));

        assert_eq!(items[0].source, "snapshot");
        assert_eq!(items[1].source, "store");
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_snapshots_ignored_when_disabled() {
        let store = store(vec!["a"]);
        let hydrator = Hydrator::new(store.clone(), BrowsingConfig::default());
        let refs = vec![with_snapshot("a", r#"{"id":"a","source":"snapshot"}"#)];

        let items = hydrator.hydrate(&refs, ResponseGroup::INFO, None).await.unwrap();

        assert_eq!(items[0].source, "store");
    }
}
