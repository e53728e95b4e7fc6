//! Tenant identity used to namespace cached data.

/// Owner of a cache namespace.
///
/// The facade only reads the key; the tenant itself stays owned by the caller.
///
/// # Example
///
/// ```
/// use tenant_cache::Tenant;
///
/// struct Company {
///     cnpj: String,
/// }
///
/// impl Tenant for Company {
///     fn tenant_key(&self) -> String {
///         self.cnpj.clone()
///     }
/// }
/// ```
pub trait Tenant: Send + Sync {
    /// Unique identifier of the tenant, used as the name of its hash.
    fn tenant_key(&self) -> String;
}

impl Tenant for String {
    fn tenant_key(&self) -> String {
        self.clone()
    }
}

impl Tenant for u64 {
    fn tenant_key(&self) -> String {
        self.to_string()
    }
}

impl Tenant for i64 {
    fn tenant_key(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tenant_keys() {
        assert_eq!("12345678000199".to_string().tenant_key(), "12345678000199");
        assert_eq!(0u64.tenant_key(), "0");
        assert_eq!((-3i64).tenant_key(), "-3");
    }
}
