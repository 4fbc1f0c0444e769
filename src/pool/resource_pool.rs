//! Resource Pool Module
//!
//! Bounded set of reusable handles shared by concurrent workers.
//!
//! A semaphore with one permit per idle resource gates access, so waiters
//! are served in FIFO order and a timed-out or cancelled waiter never holds
//! a resource. The idle queue sits behind a short synchronous lock that is
//! never held across an await.

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{BoxError, CoreError, Result};
use crate::pool::{ManageResource, PoolStats, PoolStatus, ShutdownReport};

// == Shared State ==
struct Slots<R> {
    idle: VecDeque<R>,
    /// Bumped on shutdown; borrows from an older generation are not readmitted.
    generation: u64,
}

struct Shared<M: ManageResource> {
    manager: M,
    pool_size: usize,
    acquire_timeout: Duration,
    permits: Arc<Semaphore>,
    slots: Mutex<Slots<M::Resource>>,
    initialized: AtomicBool,
    /// Serializes initialize and shutdown.
    lifecycle: tokio::sync::Mutex<()>,
}

impl<M: ManageResource> Shared<M> {
    fn lock_slots(&self) -> MutexGuard<'_, Slots<M::Resource>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn give_back(&self, resource: M::Resource, generation: u64, permit: OwnedSemaphorePermit) {
        let mut slots = self.lock_slots();
        if slots.generation == generation {
            slots.idle.push_back(resource);
            drop(slots);
            // releasing after the push guarantees the next waiter finds it
            drop(permit);
        } else {
            drop(slots);
            permit.forget();
            drop(resource);
            debug!("dropped resource borrowed before pool shutdown");
        }
    }
}

// == Resource Pool ==
/// Pool of `pool_size` resources built by a [`ManageResource`].
///
/// Cloning is cheap; clones share the same resources.
pub struct ResourcePool<M: ManageResource> {
    shared: Arc<Shared<M>>,
}

impl<M: ManageResource> Clone for ResourcePool<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M: ManageResource> fmt::Debug for ResourcePool<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("stats", &self.stats())
            .field("acquire_timeout", &self.shared.acquire_timeout)
            .finish()
    }
}

impl<M: ManageResource> ResourcePool<M> {
    // == Constructor ==
    /// Creates an empty, uninitialized pool. A size of zero is raised to one.
    pub fn new(manager: M, pool_size: usize, acquire_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                manager,
                pool_size: pool_size.max(1),
                acquire_timeout,
                permits: Arc::new(Semaphore::new(0)),
                slots: Mutex::new(Slots {
                    idle: VecDeque::new(),
                    generation: 0,
                }),
                initialized: AtomicBool::new(false),
                lifecycle: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn from_config(manager: M, config: &Config) -> Self {
        Self::new(manager, config.pool_size, config.pool_acquire_timeout())
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.initialized.load(Ordering::Acquire)
    }

    pub fn pool_size(&self) -> usize {
        self.shared.pool_size
    }

    pub fn acquire_timeout(&self) -> Duration {
        self.shared.acquire_timeout
    }

    // == Initialize ==
    /// Creates all `pool_size` resources. Idempotent.
    ///
    /// Concurrent callers wait for the one initialization in progress. If
    /// any constructor call fails, the resources built so far are destroyed
    /// and the pool stays uninitialized.
    pub async fn initialize(&self) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }

        let _lifecycle = self.shared.lifecycle.lock().await;
        if self.is_initialized() {
            return Ok(());
        }

        let mut created = Vec::with_capacity(self.shared.pool_size);
        for _ in 0..self.shared.pool_size {
            match self.shared.manager.create().await {
                Ok(resource) => created.push(resource),
                Err(err) => {
                    let err: BoxError = err.into();
                    error!("Resource construction failed after {} built: {}", created.len(), err);
                    for resource in created {
                        if let Err(destroy_err) = self.shared.manager.destroy(resource).await {
                            let destroy_err: BoxError = destroy_err.into();
                            warn!("Failed to destroy partially built resource: {}", destroy_err);
                        }
                    }
                    return Err(CoreError::Construction(err));
                }
            }
        }

        self.shared.lock_slots().idle.extend(created);
        self.shared.permits.add_permits(self.shared.pool_size);
        self.shared.initialized.store(true, Ordering::Release);

        info!("Resource pool initialized with {} resources", self.shared.pool_size);
        Ok(())
    }

    // == Acquire ==
    /// Borrows a resource, initializing the pool first if needed.
    ///
    /// Waits at most `acquire_timeout` and then fails with
    /// [`CoreError::Timeout`]. The returned guard gives the resource back
    /// when dropped, on every exit path.
    pub async fn acquire(&self) -> Result<PooledResource<M>> {
        self.initialize().await?;

        let wait = Arc::clone(&self.shared.permits).acquire_owned();
        let permit = match timeout(self.shared.acquire_timeout, wait).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(CoreError::PoolClosed),
            Err(_) => {
                debug!("Pool acquisition timed out after {:?}", self.shared.acquire_timeout);
                return Err(CoreError::Timeout(self.shared.acquire_timeout));
            }
        };

        let mut slots = self.shared.lock_slots();
        let popped = slots.idle.pop_front();
        match popped {
            Some(resource) => Ok(PooledResource {
                resource: Some(resource),
                permit: Some(permit),
                generation: slots.generation,
                shared: Arc::clone(&self.shared),
            }),
            None => {
                // shutdown drained the queue after this permit was granted
                drop(slots);
                permit.forget();
                Err(CoreError::PoolClosed)
            }
        }
    }

    // == Release ==
    /// Returns a borrowed resource. Equivalent to dropping the guard.
    pub fn release(&self, resource: PooledResource<M>) {
        drop(resource);
    }

    // == Shutdown ==
    /// Destroys every resource and marks the pool uninitialized.
    ///
    /// Outstanding borrows get up to `acquire_timeout` to come back; any
    /// still out after that are counted as abandoned and dropped on return.
    /// Destructor failures are logged and reported, never propagated.
    pub async fn shutdown(&self) -> ShutdownReport {
        let _lifecycle = self.shared.lifecycle.lock().await;
        let mut report = ShutdownReport::default();
        if !self.is_initialized() {
            return report;
        }
        self.shared.initialized.store(false, Ordering::Release);

        let all = u32::try_from(self.shared.pool_size).unwrap_or(u32::MAX);
        match timeout(self.shared.acquire_timeout, self.shared.permits.acquire_many(all)).await {
            Ok(Ok(permits)) => permits.forget(),
            _ => warn!("borrowed resources not returned before shutdown"),
        }

        let drained: Vec<M::Resource> = {
            let mut slots = self.shared.lock_slots();
            slots.generation += 1;
            slots.idle.drain(..).collect()
        };
        self.shared
            .permits
            .forget_permits(self.shared.permits.available_permits());
        report.abandoned = self.shared.pool_size.saturating_sub(drained.len());

        for resource in drained {
            match self.shared.manager.destroy(resource).await {
                Ok(()) => report.destroyed += 1,
                Err(err) => {
                    let err: BoxError = err.into();
                    warn!("Error destroying pooled resource: {}", err);
                    report.failures.push(err.to_string());
                }
            }
        }

        info!(
            "Resource pool shut down: {} destroyed, {} failures, {} abandoned",
            report.destroyed,
            report.failures.len(),
            report.abandoned
        );
        report
    }

    // == Stats ==
    pub fn stats(&self) -> PoolStats {
        let initialized = self.is_initialized();
        let available = self.shared.lock_slots().idle.len();
        PoolStats {
            pool_size: self.shared.pool_size,
            available,
            in_use: if initialized {
                self.shared.pool_size.saturating_sub(available)
            } else {
                0
            },
            initialized,
        }
    }
}

impl<M: ManageResource> PoolStatus for ResourcePool<M> {
    fn pool_stats(&self) -> PoolStats {
        self.stats()
    }
}

// == Pooled Resource ==
/// A borrowed resource. Dereferences to the resource and returns it to
/// the pool when dropped.
pub struct PooledResource<M: ManageResource> {
    resource: Option<M::Resource>,
    permit: Option<OwnedSemaphorePermit>,
    generation: u64,
    shared: Arc<Shared<M>>,
}

impl<M: ManageResource> PooledResource<M> {
    /// Gives the resource back now instead of at end of scope.
    pub fn release(self) {}
}

impl<M: ManageResource> Deref for PooledResource<M> {
    type Target = M::Resource;

    fn deref(&self) -> &M::Resource {
        self.resource.as_ref().expect("resource is present until drop")
    }
}

impl<M: ManageResource> DerefMut for PooledResource<M> {
    fn deref_mut(&mut self) -> &mut M::Resource {
        self.resource.as_mut().expect("resource is present until drop")
    }
}

impl<M: ManageResource> Drop for PooledResource<M> {
    fn drop(&mut self) {
        if let (Some(resource), Some(permit)) = (self.resource.take(), self.permit.take()) {
            self.shared.give_back(resource, self.generation, permit);
        }
    }
}

impl<M> fmt::Debug for PooledResource<M>
where
    M: ManageResource,
    M::Resource: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledResource")
            .field("resource", &self.resource)
            .field("generation", &self.generation)
            .finish()
    }
}
