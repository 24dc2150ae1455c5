//! Issuer configuration validation
//!
//! Runs once per load over every fixed and meta issuer. Each issuer type
//! carries structural rules (which fields must or must not be present) and,
//! for `uri` and `username` issuers, a domain-binding rule that keeps an
//! issuer from vouching for subjects outside the domain it controls.
//!
//! Any violation fails the whole load.

use spiffe::spiffe_id::TrustDomain;
use thiserror::Error;
use url::{Host, Url};

use crate::{
    config::FulcioConfig,
    issuer::{IssuerType, OidcIssuer},
    meta::MetaIssuerPattern,
};

/// All hostnames for subject and issuer must have at least a top-level and
/// second-level domain
const MINIMUM_HOSTNAME_LABELS: usize = 2;

/// A configuration rule violation
///
/// Messages name the offending issuer so configuration authors can act on them.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("issuer {issuer}: ClientID must not be empty")]
    MissingClientId { issuer: String },

    #[error("issuer {key}: IssuerURL {issuer_url} does not match its configuration key")]
    IssuerUrlMismatch { key: String, issuer_url: String },

    #[error("issuer {issuer}: only email issuers can use issuer claim mapping, not {issuer_type}")]
    IssuerClaimNotAllowed { issuer: String, issuer_type: IssuerType },

    #[error("issuer {issuer}: SPIFFETrustDomain is only allowed for spiffe issuers, not {issuer_type}")]
    SpiffeTrustDomainNotAllowed { issuer: String, issuer_type: IssuerType },

    #[error("issuer {issuer}: SubjectDomain is only allowed for uri and username issuers, not {issuer_type}")]
    SubjectDomainNotAllowed { issuer: String, issuer_type: IssuerType },

    #[error("issuer {issuer}: spiffe issuer must have SPIFFETrustDomain set")]
    MissingSpiffeTrustDomain { issuer: String },

    #[error("issuer {issuer}: spiffe trust domain {trust_domain} is invalid: {reason}")]
    InvalidSpiffeTrustDomain { issuer: String, trust_domain: String, reason: String },

    #[error("issuer {issuer}: {issuer_type} issuer must have SubjectDomain set")]
    MissingSubjectDomain { issuer: String, issuer_type: IssuerType },

    #[error("issuer {issuer}: invalid URL {value}: {reason}")]
    InvalidUrl { issuer: String, value: String, reason: String },

    #[error("issuer {issuer}: SubjectDomain for uri must contain scheme")]
    SubjectDomainMissingScheme { issuer: String },

    #[error("issuer {issuer}: SubjectDomain for username should not contain scheme")]
    SubjectDomainHasScheme { issuer: String },

    #[error("issuer {issuer}: issuer URL for {issuer_type} must contain scheme")]
    IssuerMissingScheme { issuer: String, issuer_type: IssuerType },

    #[error(
        "issuer {issuer}: subject ({subject_scheme}) and issuer ({issuer_scheme}) URI schemes do not match"
    )]
    SchemeMismatch { issuer: String, subject_scheme: String, issuer_scheme: String },

    #[error("issuer {issuer}: {source}")]
    Domain {
        issuer: String,
        #[source]
        source: DomainError,
    },

    #[error("meta issuer {template}: SPIFFE meta issuers not supported")]
    SpiffeMetaIssuer { template: String },

    #[error("meta issuer {template}: invalid template: {reason}")]
    InvalidTemplate { template: String, reason: String },
}

/// Hostname equivalence failure
#[allow(missing_docs)]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("hostname too short: {0}")]
    HostnameTooShort(String),

    #[error("hostname top-level and second-level domains do not match: {subject}, {issuer}")]
    Mismatch { subject: String, issuer: String },
}

/// Validate the whole configuration
///
/// Fixed issuers are checked first, then meta issuers; the first violation
/// is returned.
pub fn validate_config(config: &FulcioConfig) -> Result<(), ValidationError> {
    for (key, issuer) in &config.oidc_issuers {
        if !issuer.issuer_url.is_empty() && issuer.issuer_url != *key {
            return Err(ValidationError::IssuerUrlMismatch {
                key: key.clone(),
                issuer_url: issuer.issuer_url.clone(),
            });
        }
        validate_issuer(issuer)?;
    }

    for (template, issuer) in &config.meta_issuers {
        validate_meta_issuer(template, issuer)?;
    }

    Ok(())
}

/// Validate one fixed issuer against the rules for its type
pub fn validate_issuer(issuer: &OidcIssuer) -> Result<(), ValidationError> {
    let name = issuer.issuer_url.as_str();

    if issuer.client_id.is_empty() {
        return Err(ValidationError::MissingClientId { issuer: name.to_string() });
    }

    validate_optional_fields(name, issuer)?;

    match issuer.issuer_type {
        IssuerType::Spiffe => validate_spiffe_issuer(issuer),
        IssuerType::Uri => validate_uri_issuer(issuer),
        IssuerType::Username => validate_username_issuer(issuer),
        IssuerType::Email | IssuerType::GithubWorkflow | IssuerType::Kubernetes => Ok(()),
    }
}

/// Validate one meta issuer
///
/// A SPIFFE meta issuer would bind many OIDC issuers to one trust domain, so
/// it is rejected outright.
pub fn validate_meta_issuer(template: &str, issuer: &OidcIssuer) -> Result<(), ValidationError> {
    if issuer.issuer_type == IssuerType::Spiffe {
        return Err(ValidationError::SpiffeMetaIssuer { template: template.to_string() });
    }

    if issuer.client_id.is_empty() {
        return Err(ValidationError::MissingClientId { issuer: template.to_string() });
    }

    validate_optional_fields(template, issuer)?;

    MetaIssuerPattern::compile(template).map_err(|e| ValidationError::InvalidTemplate {
        template: template.to_string(),
        reason: e.to_string(),
    })?;

    Ok(())
}

// Each optional field is legal only for the issuer types that use it. Empty
// strings count as unset.
fn validate_optional_fields(name: &str, issuer: &OidcIssuer) -> Result<(), ValidationError> {
    let issuer_type = issuer.issuer_type;

    if is_set(issuer.issuer_claim.as_deref()) && issuer_type != IssuerType::Email {
        return Err(ValidationError::IssuerClaimNotAllowed {
            issuer: name.to_string(),
            issuer_type,
        });
    }

    if is_set(issuer.spiffe_trust_domain.as_deref()) && issuer_type != IssuerType::Spiffe {
        return Err(ValidationError::SpiffeTrustDomainNotAllowed {
            issuer: name.to_string(),
            issuer_type,
        });
    }

    let binds_subjects = matches!(issuer_type, IssuerType::Uri | IssuerType::Username);
    if is_set(issuer.subject_domain.as_deref()) && !binds_subjects {
        return Err(ValidationError::SubjectDomainNotAllowed {
            issuer: name.to_string(),
            issuer_type,
        });
    }

    Ok(())
}

fn is_set(field: Option<&str>) -> bool {
    field.is_some_and(|value| !value.is_empty())
}

fn validate_spiffe_issuer(issuer: &OidcIssuer) -> Result<(), ValidationError> {
    let trust_domain = issuer
        .spiffe_trust_domain
        .as_deref()
        .filter(|td| !td.is_empty())
        .ok_or_else(|| ValidationError::MissingSpiffeTrustDomain {
            issuer: issuer.issuer_url.clone(),
        })?;

    TrustDomain::new(trust_domain).map_err(|e| ValidationError::InvalidSpiffeTrustDomain {
        issuer: issuer.issuer_url.clone(),
        trust_domain: trust_domain.to_string(),
        reason: e.to_string(),
    })?;

    Ok(())
}

// The subject domain must share its top-level and second-level domain with
// the issuer, e.g. SubjectDomain https://users.example.com for IssuerURL
// https://accounts.example.com.
fn validate_uri_issuer(issuer: &OidcIssuer) -> Result<(), ValidationError> {
    let name = issuer.issuer_url.as_str();
    let subject_domain = required_subject_domain(issuer)?;

    let subject = parse_url(name, subject_domain)?
        .ok_or_else(|| ValidationError::SubjectDomainMissingScheme { issuer: name.to_string() })?;
    let issuer_url = parse_url(name, name)?.ok_or_else(|| ValidationError::IssuerMissingScheme {
        issuer: name.to_string(),
        issuer_type: IssuerType::Uri,
    })?;

    is_uri_subject_allowed(name, &subject, &issuer_url)
}

// Same binding as `uri`, but the subject domain is a bare hostname, e.g.
// SubjectDomain example.com for IssuerURL https://accounts.example.com.
fn validate_username_issuer(issuer: &OidcIssuer) -> Result<(), ValidationError> {
    let name = issuer.issuer_url.as_str();
    let subject_domain = required_subject_domain(issuer)?;

    if parse_url(name, subject_domain)?.is_some() {
        return Err(ValidationError::SubjectDomainHasScheme { issuer: name.to_string() });
    }
    let issuer_url = parse_url(name, name)?.ok_or_else(|| ValidationError::IssuerMissingScheme {
        issuer: name.to_string(),
        issuer_type: IssuerType::Username,
    })?;

    validate_allowed_domain(subject_domain, &required_hostname(name, &issuer_url)?)
        .map_err(|source| ValidationError::Domain { issuer: name.to_string(), source })
}

fn required_subject_domain(issuer: &OidcIssuer) -> Result<&str, ValidationError> {
    issuer.subject_domain.as_deref().filter(|d| !d.is_empty()).ok_or_else(|| {
        ValidationError::MissingSubjectDomain {
            issuer: issuer.issuer_url.clone(),
            issuer_type: issuer.issuer_type,
        }
    })
}

/// Parse `value` as an absolute URL
///
/// Returns `Ok(None)` when the value has no scheme (a bare hostname or path).
fn parse_url(issuer: &str, value: &str) -> Result<Option<Url>, ValidationError> {
    match Url::parse(value) {
        Ok(url) => Ok(Some(url)),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(None),
        Err(e) => Err(ValidationError::InvalidUrl {
            issuer: issuer.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn required_hostname(issuer: &str, url: &Url) -> Result<String, ValidationError> {
    match url.host() {
        Some(Host::Domain(domain)) => Ok(domain.to_string()),
        Some(Host::Ipv4(addr)) => Ok(addr.to_string()),
        Some(Host::Ipv6(addr)) => Ok(addr.to_string()),
        None => Err(ValidationError::InvalidUrl {
            issuer: issuer.to_string(),
            value: url.to_string(),
            reason: "URL has no host".to_string(),
        }),
    }
}

/// Compare subject and issuer URIs: schemes must be identical and hostnames
/// must be domain-equivalent
pub fn is_uri_subject_allowed(
    issuer_name: &str,
    subject: &Url,
    issuer: &Url,
) -> Result<(), ValidationError> {
    if subject.scheme() != issuer.scheme() {
        return Err(ValidationError::SchemeMismatch {
            issuer: issuer_name.to_string(),
            subject_scheme: subject.scheme().to_string(),
            issuer_scheme: issuer.scheme().to_string(),
        });
    }

    let subject_host = required_hostname(issuer_name, subject)?;
    let issuer_host = required_hostname(issuer_name, issuer)?;

    validate_allowed_domain(&subject_host, &issuer_host)
        .map_err(|source| ValidationError::Domain { issuer: issuer_name.to_string(), source })
}

/// Compare two hostnames for domain equivalence
///
/// Identical hostnames always pass. Otherwise both must have at least two
/// labels and share their last two labels, so `accounts.example.com` binds
/// `example.com` and `users.example.com` but not `example.org`.
///
/// Multi-part public suffixes such as `co.uk` are not special-cased: two
/// different registrants under `co.uk` are treated as equivalent.
pub fn validate_allowed_domain(
    subject_hostname: &str,
    issuer_hostname: &str,
) -> Result<(), DomainError> {
    if subject_hostname == issuer_hostname {
        return Ok(());
    }

    let subject_labels: Vec<&str> = subject_hostname.split('.').collect();
    let issuer_labels: Vec<&str> = issuer_hostname.split('.').collect();
    if subject_labels.len() < MINIMUM_HOSTNAME_LABELS {
        return Err(DomainError::HostnameTooShort(subject_hostname.to_string()));
    }
    if issuer_labels.len() < MINIMUM_HOSTNAME_LABELS {
        return Err(DomainError::HostnameTooShort(issuer_hostname.to_string()));
    }

    let subject_suffix = &subject_labels[subject_labels.len() - MINIMUM_HOSTNAME_LABELS..];
    let issuer_suffix = &issuer_labels[issuer_labels.len() - MINIMUM_HOSTNAME_LABELS..];
    if subject_suffix == issuer_suffix {
        return Ok(());
    }

    Err(DomainError::Mismatch {
        subject: subject_hostname.to_string(),
        issuer: issuer_hostname.to_string(),
    })
}
