//! Federated issuer lookup
//!
//! Email issuers that federate other identity providers (a Dex instance, for
//! example) name the upstream provider inside the token. `IssuerClaim` is a
//! dotted JSON path such as `$.federated_claims.connector_id` pointing at it.

use serde_json::Value;

/// Evaluate an `IssuerClaim` path against verified token claims
///
/// Only the `$.a.b.c` form is supported. Returns `None` when the path is
/// malformed, a segment is missing, or the value is not a non-empty string.
///
/// # Example
///
/// ```
/// use fulcio_config::claims::issuer_from_claims;
/// use serde_json::json;
///
/// let claims = json!({ "federated_claims": { "connector_id": "https://github.com/login/oauth" } });
/// assert_eq!(
///     issuer_from_claims(&claims, "$.federated_claims.connector_id"),
///     Some("https://github.com/login/oauth")
/// );
/// ```
pub fn issuer_from_claims<'a>(claims: &'a Value, issuer_claim: &str) -> Option<&'a str> {
    let path = issuer_claim.strip_prefix("$.")?;

    let mut current = claims;
    for segment in path.split('.') {
        if segment.is_empty() {
            return None;
        }
        current = current.as_object()?.get(segment)?;
    }

    current.as_str().filter(|s| !s.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_nested_claim() {
        let claims = json!({
            "iss": "https://oauth2.sigstore.dev/auth",
            "federated_claims": { "connector_id": "https://accounts.google.com", "user_id": "1" }
        });
        assert_eq!(
            issuer_from_claims(&claims, "$.federated_claims.connector_id"),
            Some("https://accounts.google.com")
        );
    }

    #[test]
    fn test_top_level_claim() {
        let claims = json!({ "iss": "https://accounts.google.com" });
        assert_eq!(issuer_from_claims(&claims, "$.iss"), Some("https://accounts.google.com"));
    }

    #[test]
    fn test_missing_claim() {
        let claims = json!({ "federated_claims": {} });
        assert_eq!(issuer_from_claims(&claims, "$.federated_claims.connector_id"), None);
        assert_eq!(issuer_from_claims(&claims, "$.other.connector_id"), None);
    }

    #[test]
    fn test_non_string_claim() {
        let claims = json!({ "federated_claims": { "connector_id": 42 }, "empty": "" });
        assert_eq!(issuer_from_claims(&claims, "$.federated_claims.connector_id"), None);
        assert_eq!(issuer_from_claims(&claims, "$.empty"), None);
    }

    #[test]
    fn test_malformed_path() {
        let claims = json!({ "iss": "https://accounts.google.com" });
        assert_eq!(issuer_from_claims(&claims, "iss"), None);
        assert_eq!(issuer_from_claims(&claims, "$."), None);
        assert_eq!(issuer_from_claims(&claims, "$..iss"), None);
    }
}
