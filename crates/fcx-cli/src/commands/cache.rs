//! `fcx cache status|clear`

use anyhow::Result;
use fcx_cache::CacheStore;
use std::path::Path;

pub fn status(path: &Path) -> Result<()> {
    let store = CacheStore::new(path);
    println!("path={}", store.path().display());
    match store.inspect()? {
        Some(info) => {
            println!("exists=true");
            println!("schema_version={}", info.schema_version);
            println!("snapshot_id={}", info.snapshot_id);
            println!("saved_at_utc={}", info.saved_at_utc.to_rfc3339());
            println!("combinations={}", info.combinations);
            println!("datasets={}", info.datasets);
        }
        None => println!("exists=false"),
    }
    Ok(())
}

pub fn clear(path: &Path) -> Result<()> {
    let store = CacheStore::new(path);
    let removed = store.clear()?;
    println!("cleared={} path={}", removed, store.path().display());
    Ok(())
}
