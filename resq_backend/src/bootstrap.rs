use crate::config::ResqConfig;
use crate::contacts::ContactsCache;
use crate::store::Store;
use anyhow::Result;
use std::fs;

pub struct BootstrapResources {
    pub directories_created: Vec<String>,
    pub store_initialized: bool,
    pub store: Store,
    pub contacts: ContactsCache,
}

pub async fn initialize(config: &ResqConfig) -> Result<BootstrapResources> {
    let mut directories_created = Vec::new();
    create_dir_if_missing(&config.paths.data_dir, &mut directories_created)?;
    create_dir_if_missing(&config.paths.logs_dir, &mut directories_created)?;

    let store = Store::connect(&config.paths)?;
    let store_initialized = store.ensure_migrations()?;

    let contacts = ContactsCache::open(&config.paths.contacts_db_path)?;

    Ok(BootstrapResources {
        directories_created,
        store_initialized,
        store,
        contacts,
    })
}

fn create_dir_if_missing(path: &std::path::Path, created: &mut Vec<String>) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
        created.push(path.display().to_string());
    }
    Ok(())
}
