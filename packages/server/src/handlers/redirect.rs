use axum::extract::{Path, State};
use axum::response::Redirect;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::client::ClientInfo;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/s/{code}",
    tag = "Public",
    operation_id = "followShortUrl",
    summary = "Follow a short URL",
    description = "Redirects to the original URL. The click is recorded asynchronously with \
        referrer, user agent, client address and location.",
    params(("code" = String, Path, description = "Short code")),
    responses(
        (status = 307, description = "Redirect to the original URL"),
        (status = 404, description = "Unknown or deleted code (NOT_FOUND)", body = ErrorBody),
        (status = 410, description = "Short URL expired (EXPIRED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, client))]
pub async fn follow_short_url(
    State(state): State<AppState>,
    Path(code): Path<String>,
    ClientInfo(client): ClientInfo,
) -> Result<Redirect, AppError> {
    let target = state.shortener.resolve(&code, client).await?;
    Ok(Redirect::temporary(&target))
}
