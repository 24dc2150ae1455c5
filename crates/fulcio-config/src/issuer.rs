//! Issuer configuration model
//!
//! Field names on the wire follow the configuration document format
//! (`IssuerURL`, `ClientID`, `Type`, ...), so existing deployments' JSON
//! documents load unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How the certificate subject is derived from a verified token
///
/// The type also selects which domain-binding rule applies at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssuerType {
    /// Subject is the token's email address
    Email,
    /// Subject is a GitHub Actions workflow identity
    GithubWorkflow,
    /// Subject is a Kubernetes service account
    Kubernetes,
    /// Subject is a SPIFFE ID within the configured trust domain
    Spiffe,
    /// Subject is a URI under the configured subject domain
    Uri,
    /// Subject is a username qualified by the configured subject domain
    Username,
}

impl IssuerType {
    /// Configuration-document spelling of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            IssuerType::Email => "email",
            IssuerType::GithubWorkflow => "github-workflow",
            IssuerType::Kubernetes => "kubernetes",
            IssuerType::Spiffe => "spiffe",
            IssuerType::Uri => "uri",
            IssuerType::Username => "username",
        }
    }
}

impl fmt::Display for IssuerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured trust relationship with an OIDC issuer
///
/// # Example
///
/// ```
/// use fulcio_config::{IssuerType, OidcIssuer};
///
/// let issuer = OidcIssuer::builder()
///     .issuer_url("https://accounts.example.com")
///     .client_id("sigstore")
///     .issuer_type(IssuerType::Uri)
///     .subject_domain("https://example.com".to_string())
///     .build();
///
/// assert_eq!(issuer.subject_domain.as_deref(), Some("https://example.com"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[builder(on(String, into))]
pub struct OidcIssuer {
    /// The expected issuer of an OIDC token
    ///
    /// May be omitted in the document; it is then taken from the map key.
    #[serde(rename = "IssuerURL", default, skip_serializing_if = "String::is_empty")]
    pub issuer_url: String,

    /// The expected client ID (audience) of the OIDC token
    #[serde(rename = "ClientID")]
    pub client_id: String,

    /// Determines the certificate subject and which binding rules apply
    #[serde(rename = "Type")]
    pub issuer_type: IssuerType,

    /// JSON path to the real issuer inside the token, for federated tokens
    ///
    /// Only legal for [`IssuerType::Email`].
    #[serde(rename = "IssuerClaim", default, skip_serializing_if = "Option::is_none")]
    pub issuer_claim: Option<String>,

    /// Domain the issuer may vouch for (`uri` and `username` types)
    #[serde(rename = "SubjectDomain", default, skip_serializing_if = "Option::is_none")]
    pub subject_domain: Option<String>,

    /// SPIFFE trust domain the issuer mints identities for (`spiffe` type)
    #[serde(rename = "SPIFFETrustDomain", default, skip_serializing_if = "Option::is_none")]
    pub spiffe_trust_domain: Option<String>,
}

impl OidcIssuer {
    /// Concrete configuration for an issuer URL matched by a meta-issuer template
    pub(crate) fn for_matched_url(&self, issuer_url: &str) -> Self {
        Self { issuer_url: issuer_url.to_string(), ..self.clone() }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_issuer_type_wire_names() {
        let types = [
            (IssuerType::Email, "\"email\""),
            (IssuerType::GithubWorkflow, "\"github-workflow\""),
            (IssuerType::Kubernetes, "\"kubernetes\""),
            (IssuerType::Spiffe, "\"spiffe\""),
            (IssuerType::Uri, "\"uri\""),
            (IssuerType::Username, "\"username\""),
        ];

        for (issuer_type, json) in types {
            assert_eq!(serde_json::to_string(&issuer_type).unwrap(), json);
            assert_eq!(serde_json::from_str::<IssuerType>(json).unwrap(), issuer_type);
            assert_eq!(format!("\"{}\"", issuer_type), json);
        }
    }

    #[test]
    fn test_unknown_issuer_type_rejected() {
        assert!(serde_json::from_str::<IssuerType>("\"ldap\"").is_err());
    }

    #[test]
    fn test_deserialize_document_field_names() {
        let json = r#"{
            "IssuerURL": "https://oauth2.sigstore.dev/auth",
            "ClientID": "sigstore",
            "Type": "email",
            "IssuerClaim": "$.federated_claims.connector_id"
        }"#;

        let issuer: OidcIssuer = serde_json::from_str(json).unwrap();
        assert_eq!(issuer.issuer_url, "https://oauth2.sigstore.dev/auth");
        assert_eq!(issuer.client_id, "sigstore");
        assert_eq!(issuer.issuer_type, IssuerType::Email);
        assert_eq!(issuer.issuer_claim.as_deref(), Some("$.federated_claims.connector_id"));
        assert!(issuer.subject_domain.is_none());
        assert!(issuer.spiffe_trust_domain.is_none());
    }

    #[test]
    fn test_client_id_is_required() {
        let json = r#"{ "IssuerURL": "https://accounts.google.com", "Type": "email" }"#;
        assert!(serde_json::from_str::<OidcIssuer>(json).is_err());
    }

    #[test]
    fn test_for_matched_url_keeps_template_fields() {
        let template = OidcIssuer::builder()
            .issuer_url("https://example.com/*/auth")
            .client_id("tenants")
            .issuer_type(IssuerType::Uri)
            .subject_domain("https://example.com".to_string())
            .build();

        let concrete = template.for_matched_url("https://example.com/acme/auth");
        assert_eq!(concrete.issuer_url, "https://example.com/acme/auth");
        assert_eq!(concrete.client_id, "tenants");
        assert_eq!(concrete.issuer_type, IssuerType::Uri);
        assert_eq!(concrete.subject_domain.as_deref(), Some("https://example.com"));
        assert_eq!(template.issuer_url, "https://example.com/*/auth");
    }
}
