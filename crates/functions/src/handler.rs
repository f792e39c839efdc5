use std::sync::Arc;

use async_trait::async_trait;

use recordkeep_core::AppResult;

/// Business logic behind an endpoint: typed request in, typed result out.
///
/// Handlers know nothing about transport; the factories decide how a result
/// or an `AppError` is shaped on the wire.
#[async_trait]
pub trait Handler<Req, Res>: Send + Sync {
    async fn handle(&self, request: Req) -> AppResult<Res>;
}

#[async_trait]
impl<Req, Res, H> Handler<Req, Res> for Arc<H>
where
    Req: Send + 'static,
    Res: Send + 'static,
    H: Handler<Req, Res> + ?Sized,
{
    async fn handle(&self, request: Req) -> AppResult<Res> {
        (**self).handle(request).await
    }
}
