//! Resource Manager Module
//!
//! The seam through which the storage side supplies pooled handles: a
//! constructor used at pool initialization and a destructor used at shutdown.

use std::future::Future;

use crate::error::BoxError;

// == Manage Resource ==
/// Creates and destroys the handles held by a [`crate::pool::ResourcePool`].
pub trait ManageResource: Send + Sync + 'static {
    /// The pooled handle, e.g. a database connection.
    type Resource: Send + 'static;
    /// Error reported by `create` or `destroy`.
    type Error: Into<BoxError> + Send + 'static;

    /// Builds one fresh resource.
    fn create(&self) -> impl Future<Output = Result<Self::Resource, Self::Error>> + Send;

    /// Tears a resource down. The default just drops it.
    fn destroy(
        &self,
        resource: Self::Resource,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move {
            drop(resource);
            Ok(())
        }
    }
}

// == Function Manager ==
/// Adapts a plain async constructor into a [`ManageResource`].
///
/// ```ignore
/// let pool = ResourcePool::new(from_fn(|| async { Connection::open(path).await }), 5, timeout);
/// ```
#[derive(Debug, Clone)]
pub struct FnManager<F> {
    create: F,
}

pub fn from_fn<F>(create: F) -> FnManager<F> {
    FnManager { create }
}

impl<F, Fut, R, E> ManageResource for FnManager<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send,
    R: Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    type Resource = R;
    type Error = E;

    fn create(&self) -> impl Future<Output = Result<R, E>> + Send {
        (self.create)()
    }
}
