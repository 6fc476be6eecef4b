use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

/// Stable digest identifying one widget bootstrap configuration. Entries
/// pass through a sorted map, so insertion order of the custom context can
/// never change the key.
pub fn compute(
    org_id: &str,
    widget_id: &str,
    custom_context: &BTreeMap<String, String>,
    portal_contact_id: Option<&str>,
) -> String {
    let mut canonical = BTreeMap::new();
    canonical.insert("org".to_string(), org_id.to_string());
    canonical.insert("widget".to_string(), widget_id.to_string());
    for (key, value) in custom_context {
        canonical.insert(format!("ctx.{key}"), value.clone());
    }
    if let Some(contact) = portal_contact_id {
        canonical.insert("contact".to_string(), contact.to_string());
    }
    let payload = serde_json::to_vec(&canonical).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(payload);
    hex::encode(hasher.finalize())
}
