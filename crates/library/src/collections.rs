//! Collection resolution.
//!
//! Maps a collection chain onto remote collection identifiers, creating the
//! ones that do not exist yet. The account's collections are listed once, on
//! the first name that is not cached yet, and everything resolved is cached
//! for the lifetime of the resolver. Creations are single-flight per name:
//! concurrent workers asking for the same missing collection wait for the
//! first one to create it instead of creating duplicates.

use reel_extract::models::CollectionChain;
use reel_remote::error::{ErrorKind as RemoteErrorKind, Result as RemoteResult};
use reel_remote::{CollectionId, ServiceHandle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OnceCell, RwLock};

use crate::error::{ErrorKind, Result};

/// Where a resolved identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cached,
    Found,
    Created,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCollection {
    pub name: String,
    pub id: CollectionId,
    pub origin: Origin,
}

/// The resolved prefix of a chain, nearest collection first, and the names
/// that were dropped after the first failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub resolved: Vec<ResolvedCollection>,
    pub dropped: Vec<String>,
}
impl Resolution {
    pub fn ids(&self) -> impl Iterator<Item = &CollectionId> {
        self.resolved.iter().map(|c| &c.id)
    }

    pub fn is_complete(&self) -> bool {
        self.dropped.is_empty()
    }
}

pub struct CollectionResolver {
    service: ServiceHandle,
    cache: RwLock<HashMap<String, CollectionId>>,
    // One lock per name; held across the remote lookup-or-create only.
    flights: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
    // `None` when listing failed; names are then looked up one by one.
    listing: OnceCell<Option<HashMap<String, CollectionId>>>,
    lookups: AtomicU64,
}
impl CollectionResolver {
    pub fn new(service: ServiceHandle) -> Self {
        Self {
            service,
            cache: RwLock::new(HashMap::new()),
            flights: StdMutex::new(HashMap::new()),
            listing: OnceCell::new(),
            lookups: AtomicU64::new(0),
        }
    }

    /// Collection list requests sent so far.
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    pub async fn cached(&self, name: &str) -> Option<CollectionId> {
        self.cache.read().await.get(name).cloned()
    }

    fn flight(&self, name: &str) -> Arc<Mutex<()>> {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        flights.entry(name.to_string()).or_default().clone()
    }

    /// Every collection on the account when the resolver first needed it.
    ///
    /// Only authentication and quota failures are returned; anything else
    /// leaves the resolver looking names up one by one.
    async fn listing(&self) -> RemoteResult<Option<&HashMap<String, CollectionId>>> {
        let listing = self
            .listing
            .get_or_try_init(|| async {
                self.lookups.fetch_add(1, Ordering::Relaxed);
                match self.service.list_collections(None).await {
                    Ok(collections) => {
                        tracing::debug!(count = collections.len(), "Listed existing collections");
                        let mut names = HashMap::with_capacity(collections.len());
                        for collection in collections {
                            names.entry(collection.name).or_insert(collection.id);
                        }
                        Ok(Some(names))
                    },
                    Err(e) if e.is_fatal() => Err(e),
                    Err(e) => {
                        tracing::warn!(error = %*e, "Unable to list collections, looking them up by name instead");
                        Ok(None)
                    },
                }
            })
            .await?;
        Ok(listing.as_ref())
    }

    async fn find(&self, name: &str) -> RemoteResult<Option<CollectionId>> {
        if let Some(listing) = self.listing().await? {
            return Ok(listing.get(name).cloned());
        }
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let existing = self.service.list_collections(Some(name)).await?;
        Ok(existing.into_iter().find(|c| c.name == name).map(|c| c.id))
    }

    /// Resolves a single name: cache, then the account's collections, then
    /// create.
    pub async fn resolve_one(&self, name: &str) -> reel_remote::error::Result<ResolvedCollection> {
        let resolved = |id, origin| ResolvedCollection {
            name: name.to_string(),
            id,
            origin,
        };
        if let Some(id) = self.cached(name).await {
            return Ok(resolved(id, Origin::Cached));
        }

        let flight = self.flight(name);
        let _guard = flight.lock().await;
        // Someone else may have finished while we were waiting.
        if let Some(id) = self.cached(name).await {
            return Ok(resolved(id, Origin::Cached));
        }

        let (id, origin) = match self.find(name).await? {
            Some(id) => {
                tracing::debug!(collection = name, %id, "Found existing collection");
                (id, Origin::Found)
            },
            None => {
                let id = self.service.create_collection(name).await?;
                tracing::info!(collection = name, %id, "Created collection");
                (id, Origin::Created)
            },
        };
        self.cache.write().await.insert(name.to_string(), id.clone());
        Ok(resolved(id, origin))
    }

    /// Resolves every name of the chain in order.
    ///
    /// The first failure ends resolution: the names after it are dropped
    /// with a warning and the upload goes ahead with the resolved prefix.
    /// Authentication and quota failures are returned as errors instead,
    /// since nothing else in the run can succeed either.
    #[tracing::instrument(level = "debug", skip_all, fields(primary = chain.primary()))]
    pub async fn resolve(&self, chain: &CollectionChain) -> Result<Resolution> {
        let mut resolution = Resolution::default();
        for (position, name) in chain.iter().enumerate() {
            match self.resolve_one(name).await {
                Ok(collection) => resolution.resolved.push(collection),
                Err(e) => {
                    let halt = match &*e {
                        RemoteErrorKind::Auth => Some(ErrorKind::Auth),
                        RemoteErrorKind::QuotaExceeded => Some(ErrorKind::QuotaExceeded),
                        _ => None,
                    };
                    if let Some(kind) = halt {
                        return Err(e.raise(kind));
                    }
                    resolution.dropped = chain[position..].to_vec();
                    tracing::warn!(
                        collection = name.as_str(),
                        dropped = ?resolution.dropped,
                        error = %*e,
                        "Unable to resolve collection, dropping the rest of the chain"
                    );
                    break;
                },
            }
        }
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_remote::{MockService, Operation};
    use std::time::Duration;

    fn chain(names: &[&str]) -> CollectionChain {
        CollectionChain::new(names.iter().map(|n| n.to_string()).collect()).unwrap()
    }

    #[tokio::test]
    async fn test_found_created_then_cached() {
        let mock = Arc::new(MockService::default().with_collections([("PL1", "Star Wars Jedi")]));
        let resolver = CollectionResolver::new(mock.clone());

        let first = resolver.resolve(&chain(&["BUG", "Star Wars Jedi"])).await.unwrap();
        assert!(first.is_complete());
        let origins: Vec<_> = first.resolved.iter().map(|c| c.origin).collect();
        assert_eq!(origins, [Origin::Created, Origin::Found]);
        assert_eq!(first.resolved[1].id, CollectionId("PL1".to_string()));

        let second = resolver.resolve(&chain(&["BUG", "Star Wars Jedi"])).await.unwrap();
        assert!(second.resolved.iter().all(|c| c.origin == Origin::Cached));
        assert_eq!(mock.calls(Operation::ListCollections).await, 1);
        assert_eq!(mock.calls(Operation::CreateCollection).await, 1);
    }

    #[tokio::test]
    async fn test_collections_are_listed_once() {
        let mock = Arc::new(MockService::default());
        let resolver = CollectionResolver::new(mock.clone());
        let resolution = resolver
            .resolve(&chain(&["BUG", "Star Wars Jedi", "SPIEL AUFNAHMEN"]))
            .await
            .unwrap();
        assert!(resolution.resolved.iter().all(|c| c.origin == Origin::Created));
        assert_eq!(mock.calls(Operation::ListCollections).await, 1);
        assert_eq!(mock.calls(Operation::CreateCollection).await, 3);
        assert_eq!(resolver.lookups(), 1);
    }

    #[tokio::test]
    async fn test_failed_listing_falls_back_to_lookups_by_name() {
        let mock = Arc::new(
            MockService::default()
                .with_collections([("PL1", "BUG")])
                .fail_next(Operation::ListCollections, RemoteErrorKind::Transient(503)),
        );
        let resolver = CollectionResolver::new(mock.clone());
        let resolution = resolver.resolve(&chain(&["BUG", "Star Wars Jedi"])).await.unwrap();
        assert_eq!(resolution.resolved[0].origin, Origin::Found);
        assert_eq!(resolution.resolved[0].id, CollectionId("PL1".to_string()));
        assert_eq!(resolution.resolved[1].origin, Origin::Created);
        // The failed listing, then one lookup per name.
        assert_eq!(mock.calls(Operation::ListCollections).await, 3);
        assert_eq!(resolver.lookups(), 3);
    }

    #[tokio::test]
    async fn test_exact_name_match() {
        let mock = Arc::new(MockService::default().with_collections([("PL1", "bug")]));
        let resolver = CollectionResolver::new(mock.clone());
        let resolution = resolver.resolve(&chain(&["BUG"])).await.unwrap();
        assert_eq!(resolution.resolved[0].origin, Origin::Created);
        assert_ne!(resolution.resolved[0].id, CollectionId("PL1".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_flight_creation() {
        let mock = Arc::new(MockService::default().with_create_delay(Duration::from_millis(50)));
        let resolver = Arc::new(CollectionResolver::new(mock.clone()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let resolver = resolver.clone();
                tokio::spawn(async move {
                    resolver
                        .resolve(&chain(&["BUG", "Star Wars Jedi", "SPIEL AUFNAHMEN"]))
                        .await
                        .unwrap()
                })
            })
            .collect();
        let results = futures::future::join_all(tasks).await;

        assert_eq!(mock.calls(Operation::CreateCollection).await, 3);
        assert_eq!(mock.collections().await.len(), 3);
        let first: Vec<_> = results[0].as_ref().unwrap().ids().cloned().collect();
        for result in &results {
            let ids: Vec<_> = result.as_ref().unwrap().ids().cloned().collect();
            assert_eq!(ids, first);
        }
    }

    #[tokio::test]
    async fn test_failure_drops_the_rest_of_the_chain() {
        let mock = Arc::new(
            MockService::default()
                .with_collections([("PL1", "BUG")])
                .fail_next(Operation::CreateCollection, RemoteErrorKind::Rejected(400)),
        );
        let resolver = CollectionResolver::new(mock.clone());
        let resolution = resolver
            .resolve(&chain(&["BUG", "Star Wars Jedi", "SPIEL AUFNAHMEN"]))
            .await
            .unwrap();
        assert_eq!(resolution.resolved.len(), 1);
        assert_eq!(resolution.dropped, ["Star Wars Jedi", "SPIEL AUFNAHMEN"]);
        assert!(resolver.cached("Star Wars Jedi").await.is_none());
    }

    #[tokio::test]
    async fn test_quota_is_an_error() {
        let mock = Arc::new(MockService::default().fail_next(Operation::ListCollections, RemoteErrorKind::QuotaExceeded));
        let resolver = CollectionResolver::new(mock);
        let err = resolver.resolve(&chain(&["BUG"])).await.unwrap_err();
        assert_eq!(*err, ErrorKind::QuotaExceeded);
    }
}
