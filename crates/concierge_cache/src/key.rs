//! Normalized request signatures.

use std::fmt;

/// Cache key derived from method, endpoint and sorted query parameters.
///
/// Parameter order never matters: `?b=2&a=1` and `?a=1&b=2` produce the
/// same key.
///
/// # Examples
///
/// ```
/// use concierge_cache::CacheKey;
///
/// let a = CacheKey::new("GET", "/book_staff/1", &[("service_ids", "7"), ("datetime", "2024-05-01")]);
/// let b = CacheKey::new("get", "/book_staff/1", &[("datetime", "2024-05-01"), ("service_ids", "7")]);
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "GET /book_staff/1?datetime=2024-05-01&service_ids=7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    method: String,
    endpoint: String,
    params: Vec<(String, String)>,
}

impl CacheKey {
    /// Build a key from request parts.
    pub fn new<K, V>(method: &str, endpoint: &str, params: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();
        params.sort();

        Self {
            method: method.to_ascii_uppercase(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            params,
        }
    }

    /// HTTP method, upper-cased.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Endpoint path without trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Query parameters, sorted.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.endpoint)?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, k, v)?;
        }
        Ok(())
    }
}
