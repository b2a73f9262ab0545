use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::RelayState;

/// The relay's router together with the state it was built from
#[derive(Clone)]
pub struct RelayApp {
    pub state: RelayState,
    pub router: Router<()>,
}

impl RelayApp {
    pub fn new(state: RelayState, max_upload_bytes: usize) -> Self {
        let router = routes(max_upload_bytes).with_state(state.clone());
        Self { state, router }
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "relay listening");
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

fn routes(max_upload_bytes: usize) -> Router<RelayState> {
    Router::new()
        .route("/", get(handlers::index))
        .route(
            "/upload",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/uploads/{filename}", get(handlers::serve_image))
        .route("/health", get(|| async { "ok" }))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}
