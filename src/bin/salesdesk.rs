//! salesdesk: REST service for name-keyed sales
//!
//! ## Architecture
//! ```text
//! [HTTP client] -> [REST API :8080] -> [SaleReconciler / SaleQuery]
//!                                               |
//!                                               v
//!                                      [SQLite or in-memory]
//! ```
//!
//! ## Configuration
//! ```yaml
//! server:
//!   port: 8080
//! storage:
//!   type: sqlite
//!   sqlite:
//!     path: data/salesdesk.db
//! service:
//!   empty_list_is_error: true
//! seed:
//!   stores: [Acme]
//!   customers:
//!     - first_name: Jane
//!       last_name: Doe
//!   products: [Widget]
//! ```
//! Any key can be overridden with `SALESDESK__SECTION__KEY`.
//! Log filtering comes from `SALESDESK_LOG` (default `info`).

use tracing::{error, info};

use salesdesk::api::{self, AppState};
use salesdesk::config::Config;
use salesdesk::services::{SaleQuery, SaleReconciler};
use salesdesk::storage::{init_storage, seed_reference_data};
use salesdesk::utils::bootstrap::{init_tracing, parse_config_path};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let config_path = parse_config_path();
    let config = Config::load(config_path.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        storage = %config.storage.storage_type,
        port = config.server.port,
        "starting salesdesk"
    );

    let store = init_storage(&config.storage).await?;
    seed_reference_data(store.as_ref(), &config.seed).await?;

    let state = AppState::new(
        SaleReconciler::new(store.clone()),
        SaleQuery::new(store, config.service.empty_list_is_error),
    );

    api::serve(state, &config.server.bind_address()).await?;

    info!("salesdesk stopped");
    Ok(())
}
