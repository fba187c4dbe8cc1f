use anyhow::Result;
use tracing::info;

use crate::services::local_store::{self, DEVICE_ID_KEY, KeyValueStore};

/// Returns the persisted device identifier, creating one on first use.
pub fn load_or_create_device_id(store: &dyn KeyValueStore) -> Result<String> {
    if let Some(existing) = local_store::get_json::<String>(store, DEVICE_ID_KEY)
        && is_well_formed(&existing)
    {
        return Ok(existing);
    }

    let device_id = format!("{:016x}", rand::random::<u64>());
    local_store::set_json(store, DEVICE_ID_KEY, &device_id)?;
    info!("Created device identifier {}", device_id);
    Ok(device_id)
}

fn is_well_formed(device_id: &str) -> bool {
    device_id.len() == 16 && device_id.chars().all(|c| c.is_ascii_hexdigit())
}
