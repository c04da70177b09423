use regex::Regex;
use thiserror::Error;

/// Overall address length limit (RFC 5321 path limit minus the brackets)
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_LOCAL_PART_LENGTH: usize = 64;
pub const MAX_DOMAIN_LENGTH: usize = 253;
const MAX_LABEL_LENGTH: usize = 63;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

/// Why an address failed the grammar check
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("email is empty")]
    Empty,
    #[error("email too long (max 254 characters)")]
    TooLong,
    #[error("missing @")]
    MissingAt,
    #[error("multiple @")]
    MultipleAt,
    #[error("invalid local part")]
    InvalidLocalPart,
    #[error("invalid domain syntax")]
    InvalidDomain,
    #[error("invalid characters")]
    InvalidCharacters,
}

/// Syntax checker for email addresses. Holds the compiled pattern so it can
/// be shared across requests.
#[derive(Debug, Clone)]
pub struct FormatValidator {
    pattern: Regex,
}

impl FormatValidator {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            pattern: Regex::new(EMAIL_PATTERN)?,
        })
    }

    /// Structural checks first so the caller gets the most specific reason,
    /// then the character-class pattern.
    pub fn check(&self, email: &str) -> Result<(), FormatError> {
        if email.is_empty() {
            return Err(FormatError::Empty);
        }
        if email.chars().count() > MAX_EMAIL_LENGTH {
            return Err(FormatError::TooLong);
        }

        let (local, domain) = match email.split_once('@') {
            Some(parts) => parts,
            None => return Err(FormatError::MissingAt),
        };
        if domain.contains('@') {
            return Err(FormatError::MultipleAt);
        }

        Self::check_local_part(local)?;
        Self::check_domain(domain)?;

        if !self.pattern.is_match(email) {
            return Err(FormatError::InvalidCharacters);
        }
        Ok(())
    }

    fn check_local_part(local: &str) -> Result<(), FormatError> {
        if local.is_empty()
            || local.len() > MAX_LOCAL_PART_LENGTH
            || local.starts_with('.')
            || local.ends_with('.')
            || local.contains("..")
        {
            return Err(FormatError::InvalidLocalPart);
        }
        Ok(())
    }

    fn check_domain(domain: &str) -> Result<(), FormatError> {
        if domain.is_empty() || domain.len() > MAX_DOMAIN_LENGTH || !domain.contains('.') {
            return Err(FormatError::InvalidDomain);
        }

        for label in domain.split('.') {
            let valid = !label.is_empty()
                && label.len() <= MAX_LABEL_LENGTH
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
            if !valid {
                return Err(FormatError::InvalidDomain);
            }
        }

        // TLD must be alphabetic and at least two characters
        let tld = domain.rsplit('.').next().unwrap_or_default();
        if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(FormatError::InvalidDomain);
        }
        Ok(())
    }
}
