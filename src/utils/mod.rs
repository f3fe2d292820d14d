//! Utility modules supporting the fetch pipeline.
//!
//! - [`HttpClient`]: shared HTTP client with user agent and timeouts
//! - [`with_retry`]: execute an operation with automatic retry on transient errors
//! - [`validate_email`]: syntax check for the NCBI contact email

mod http;
mod retry;

pub use http::HttpClient;
pub use retry::{api_retry_config, with_retry, RetryConfig, TransientError};

use regex::Regex;
use std::sync::OnceLock;

/// Check that a string looks like a properly formatted email address.
///
/// NCBI asks for a contact email on every E-utilities request; this is a
/// syntax check only, not a deliverability check.
pub fn validate_email(email: &str) -> bool {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid pattern")
    });
    re.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("test@example.com"));
        assert!(validate_email("user.name+tag@domain.co.uk"));
        assert!(validate_email("x@y.zw"));

        assert!(!validate_email("invalid-email"));
        assert!(!validate_email("missing@tld"));
        assert!(!validate_email("@domain.com"));
        assert!(!validate_email("user@domain@extra.com"));
        assert!(!validate_email(""));
    }
}
