use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(upload_routes(config))
        .merge(url_routes())
        .merge(token_routes())
}

fn upload_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::uploads::upload_file))
        .layer(handlers::uploads::upload_body_limit(config.upload.max_size));

    OpenApiRouter::new()
        .merge(upload)
        .routes(routes!(handlers::uploads::list_items))
        .routes(routes!(handlers::uploads::delete_item))
        .routes(routes!(handlers::uploads::get_stats))
}

fn url_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::urls::create_url, handlers::urls::list_urls))
        .routes(routes!(handlers::urls::delete_url, handlers::urls::update_url))
        .routes(routes!(handlers::urls::url_analytics))
}

fn token_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::tokens::create_token, handlers::tokens::list_tokens))
        .routes(routes!(handlers::tokens::revoke_token))
}
