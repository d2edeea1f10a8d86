// Opens the configured store, running any pending migrations, and reports its contents

use anyhow::Result;
use wallflow_store::{DatabaseManager, StoreConfig};

fn main() -> Result<()> {
    wallflow_store::init_logging();

    let config = StoreConfig::from_env()?;
    let db = match DatabaseManager::new(config) {
        Ok(db) => db,
        Err(e) => {
            log::error!("Failed to initialize database: {:#}", e);
            return Err(e);
        }
    };

    let saved = db.list_saved_searches()?;
    let history = db.recent_searches(db.config().history_limit)?;
    let popular = db.popular_wallhaven_tags()?;

    log::info!(
        "Store at {:?}: {} saved searches, {} history entries, {} popular tags",
        db.db_path(),
        saved.len(),
        history.len(),
        popular.len(),
    );

    for search in &saved {
        log::info!("Saved search {:?}: {}", search.name, wallflow_store::search::encode_spec(&search.search));
    }

    Ok(())
}
