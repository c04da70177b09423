/// Minimal address and domain hierarchy utilities
pub struct DomainUtils;

impl DomainUtils {
    /// Extract the lowercased domain from an email address
    pub fn extract_domain(email: &str) -> Option<String> {
        let (_, domain) = email.rsplit_once('@')?;
        if domain.is_empty() {
            return None;
        }
        Some(domain.to_lowercase())
    }

    /// Extract the lowercased local part (text before the last '@')
    pub fn extract_local_part(email: &str) -> Option<String> {
        let (local, _) = email.rsplit_once('@')?;
        if local.is_empty() {
            return None;
        }
        Some(local.to_lowercase())
    }

    /// The domain itself followed by each parent that still has a dot in it.
    ///
    /// `a.b.example.com` yields `a.b.example.com`, `b.example.com`, `example.com`.
    pub fn domain_hierarchy(domain: &str) -> Vec<&str> {
        let mut levels = vec![domain];
        let mut rest = domain;
        while let Some((_, parent)) = rest.split_once('.') {
            if !parent.contains('.') {
                break;
            }
            levels.push(parent);
            rest = parent;
        }
        levels
    }

    /// Normalise a domain entry read from a list: trim, lowercase, drop a
    /// leading '@' or '.' and a trailing root dot.
    pub fn canonicalize_domain(domain: &str) -> String {
        domain
            .trim()
            .trim_start_matches('@')
            .trim_start_matches('.')
            .trim_end_matches('.')
            .to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            DomainUtils::extract_domain("user@Example.COM"),
            Some("example.com".to_string())
        );
        assert_eq!(DomainUtils::extract_domain("invalid"), None);
        assert_eq!(DomainUtils::extract_domain("user@"), None);
    }

    #[test]
    fn test_extract_local_part() {
        assert_eq!(
            DomainUtils::extract_local_part("Info@example.com"),
            Some("info".to_string())
        );
        assert_eq!(DomainUtils::extract_local_part("@example.com"), None);
    }

    #[test]
    fn test_domain_hierarchy() {
        assert_eq!(
            DomainUtils::domain_hierarchy("a.b.example.com"),
            vec!["a.b.example.com", "b.example.com", "example.com"]
        );
        assert_eq!(DomainUtils::domain_hierarchy("example.com"), vec!["example.com"]);
    }

    #[test]
    fn test_canonicalize_domain() {
        assert_eq!(
            DomainUtils::canonicalize_domain("  @Mailinator.com. "),
            "mailinator.com"
        );
        assert_eq!(DomainUtils::canonicalize_domain(".yopmail.com"), "yopmail.com");
    }
}
