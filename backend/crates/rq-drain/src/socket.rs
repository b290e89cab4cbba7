use std::sync::Arc;

use async_trait::async_trait;

/// A connection the coordinator closes during the first drain phase.
///
/// `close` is called at most once per registration. The drain only moves on
/// once every returned future has resolved, so implementations should resolve
/// when the connection is actually gone rather than when closing was requested.
#[async_trait]
pub trait Socket: Send + Sync + 'static {
    async fn close(&self);
}

#[async_trait]
impl<S> Socket for Arc<S>
where
    S: Socket + ?Sized,
{
    async fn close(&self) {
        (**self).close().await
    }
}
