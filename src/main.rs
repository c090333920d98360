//! Restaurant rankings service, binary entrypoint.
//! Boots the Axum HTTP server with the seeded store and shared state.

use restaurant_rankings::RankingsService;

#[shuttle_runtime::main]
async fn main() -> Result<RankingsService, shuttle_runtime::Error> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    restaurant_rankings::init_tracing();

    let service = restaurant_rankings::service().await?;

    Ok(service)
}
