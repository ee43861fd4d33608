/// Everything the adapter needs to reach the registry. Built once per
/// invocation and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct ConnectionContext {
    pub host: String,
    pub tenant_id: String,
    pub auth_id: String,
    pub auth_key: String,
    pub jwt_token: String,
    pub use_tls: bool,
    pub skip_gateway: bool,
}

impl ConnectionContext {
    pub fn scheme(&self) -> &'static str {
        if self.use_tls { "https" } else { "http" }
    }

    /// `path` is service relative and starts with `/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme(), self.host, path)
    }

    /// Headers set only when the matching value is configured.
    pub fn auth_headers(&self) -> Vec<(&'static str, &str)> {
        let mut headers = Vec::new();
        for (name, value) in [
            ("X-Magda-Tenant-Id", &self.tenant_id),
            ("X-Magda-API-Key-Id", &self.auth_id),
            ("X-Magda-API-Key", &self.auth_key),
            ("X-Magda-Session", &self.jwt_token),
        ] {
            if !value.is_empty() {
                headers.push((name, value.as_str()));
            }
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_uses_scheme_from_tls_flag() {
        let mut ctx = ConnectionContext {
            host: "registry.local:6101".to_string(),
            ..Default::default()
        };
        assert_eq!(
            ctx.url("/v0/records"),
            "http://registry.local:6101/v0/records"
        );
        ctx.use_tls = true;
        assert_eq!(
            ctx.url("/api/v0/registry/aspects/x"),
            "https://registry.local:6101/api/v0/registry/aspects/x"
        );
    }

    #[test]
    fn auth_headers_skip_empty_values() {
        let ctx = ConnectionContext {
            host: "h".to_string(),
            tenant_id: "0".to_string(),
            jwt_token: "tok".to_string(),
            ..Default::default()
        };
        assert_eq!(
            ctx.auth_headers(),
            vec![("X-Magda-Tenant-Id", "0"), ("X-Magda-Session", "tok")]
        );
    }

    #[test]
    fn api_key_pair_and_session_may_coexist() {
        let ctx = ConnectionContext {
            auth_id: "id".to_string(),
            auth_key: "key".to_string(),
            jwt_token: "tok".to_string(),
            ..Default::default()
        };
        let names: Vec<&str> = ctx.auth_headers().iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec!["X-Magda-API-Key-Id", "X-Magda-API-Key", "X-Magda-Session"]
        );
    }
}
