//! Meta-issuer template matching
//!
//! A meta issuer has a templated URL such as
//! `https://oidc.eks.*.amazonaws.com/id/*`, where each `*` stands for one or
//! more characters from `[A-Za-z0-9_-]`. A wildcard therefore never spans a
//! `.` or `/`, so it can stand in for a single hostname label or path segment
//! but never for several.

use regex::Regex;

/// Template marker for a wildcard segment
const WILDCARD: &str = "*";

/// Pattern a single wildcard expands to
const WILDCARD_CLASS: &str = "[-_a-zA-Z0-9]+";

/// A compiled meta-issuer template
#[derive(Debug, Clone)]
pub struct MetaIssuerPattern {
    template: String,
    regex: Regex,
}

impl MetaIssuerPattern {
    /// Compile a templated issuer URL into an anchored matcher
    ///
    /// Every regex metacharacter in the template is escaped, including `*`;
    /// the escaped wildcard is then replaced by [`WILDCARD_CLASS`].
    ///
    /// # Errors
    ///
    /// Returns the regex error if the expanded pattern cannot be compiled
    /// (for example, if it exceeds the regex size limit).
    ///
    /// # Example
    ///
    /// ```
    /// use fulcio_config::meta::MetaIssuerPattern;
    ///
    /// let pattern = MetaIssuerPattern::compile("https://oidc.eks.*.amazonaws.com/id/*").unwrap();
    /// assert!(pattern.is_match("https://oidc.eks.us-west-2.amazonaws.com/id/B02C93B6A2D30341"));
    /// assert!(!pattern.is_match("https://oidc.eks.evil.com/x.amazonaws.com/id/B02C93B6A2D30341"));
    /// ```
    pub fn compile(template: &str) -> Result<Self, regex::Error> {
        let quoted = regex::escape(template);
        let replaced = quoted.replace(&regex::escape(WILDCARD), WILDCARD_CLASS);
        let regex = Regex::new(&format!("^{}$", replaced))?;

        Ok(Self { template: template.to_string(), regex })
    }

    /// Whether `issuer_url` matches the whole template
    pub fn is_match(&self, issuer_url: &str) -> bool {
        self.regex.is_match(issuer_url)
    }

    /// The templated issuer URL this pattern was compiled from
    pub fn template(&self) -> &str {
        &self.template
    }
}
