//! # Function-backed service (`ServiceFn`)
//!
//! [`ServiceFn`] wraps a closure `F: Fn(ServiceContext) -> Fut`, producing a fresh
//! future per run. Nothing is shared between runs unless the closure captures
//! an `Arc` explicitly.
//!
//! ## Example
//! ```rust
//! use carousel::{ServiceContext, ServiceError, ServiceFn, ServiceRef};
//!
//! let s: ServiceRef = ServiceFn::arc("sleeper", |ctx: ServiceContext| async move {
//!     ctx.quit.cancelled().await;
//!     Ok::<_, ServiceError>(())
//! });
//! assert_eq!(s.name(), "sleeper");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::services::service::{Service, ServiceContext};

/// Function-backed service implementation.
pub struct ServiceFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ServiceFn<F> {
    /// Creates a new function-backed service.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the service and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Service for ServiceFn<F>
where
    F: Fn(ServiceContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: ServiceContext) -> Result<(), ServiceError> {
        (self.f)(ctx).await
    }
}
