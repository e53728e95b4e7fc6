//! Store key layout.

use crate::tenant::Tenant;

/// Set holding the serialized representation of every connected user.
pub const PRESENCE_SET_KEY: &str = "ws::users";

/// Builder for store keys.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Name of the hash holding all fields of `tenant`.
    pub fn tenant_hash(tenant: &dyn Tenant) -> String {
        tenant.tenant_key()
    }

    /// Name of the global presence set.
    pub fn presence_set() -> &'static str {
        PRESENCE_SET_KEY
    }
}
