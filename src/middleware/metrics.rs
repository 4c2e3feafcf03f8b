use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::handlers::AppState;

pub async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let _timer = state.metrics.start_timer(&method);

    let response = next.run(request).await;

    state.metrics.record_request(&method, response.status().as_u16());
    response
}
