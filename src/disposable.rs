use crate::config::DisposableConfig;
use crate::domain_utils::DomainUtils;
use anyhow::Context;
use std::collections::HashSet;
use std::path::Path;

/// Throwaway-inbox providers known out of the box
const BUILTIN_DISPOSABLE_DOMAINS: &[&str] = &[
    "10minutemail.com",
    "dispostable.com",
    "fakeinbox.com",
    "getairmail.com",
    "guerrillamail.com",
    "guerrillamail.info",
    "mailinator.com",
    "mailnesia.com",
    "sharklasers.com",
    "temp-mail.org",
    "tempmail.com",
    "throwawaymail.com",
    "trashmail.com",
    "yopmail.com",
];

/// Read-only set of disposable email domains.
///
/// Built once at startup and shared behind an `Arc`; nothing mutates it
/// afterwards, so lookups need no locking.
#[derive(Debug, Clone, Default)]
pub struct DisposableDomainSet {
    domains: HashSet<String>,
}

impl DisposableDomainSet {
    pub fn builtin() -> Self {
        Self::from_domains(BUILTIN_DISPOSABLE_DOMAINS.iter().copied())
    }

    pub fn from_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| DomainUtils::canonicalize_domain(d.as_ref()))
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    /// Builtin list plus whatever the configuration adds
    pub fn from_config(config: &DisposableConfig) -> anyhow::Result<Self> {
        let mut set = Self::builtin();
        let builtin_count = set.len();

        if let Some(path) = config.domains_file.as_deref() {
            let added = set.extend_from_file(path)?;
            log::info!("Loaded {added} disposable domains from {path}");
        }

        set.extend(config.extra_domains.iter().map(String::as_str));

        log::debug!(
            "Disposable domain set ready: {} builtin, {} total",
            builtin_count,
            set.len()
        );
        Ok(set)
    }

    /// Parse a plain list: one domain per line, blank lines and `#` comments
    /// ignored. Returns how many new domains were added.
    pub fn extend_from_file<P: AsRef<Path>>(&mut self, path: P) -> anyhow::Result<usize> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).with_context(|| {
            format!("Failed to read disposable domain list: {}", path.display())
        })?;

        let before = self.len();
        self.extend(content.lines().filter_map(|line| {
            let entry = line.split('#').next().unwrap_or_default().trim();
            (!entry.is_empty()).then_some(entry)
        }));
        Ok(self.len() - before)
    }

    fn extend<'a, I: IntoIterator<Item = &'a str>>(&mut self, domains: I) {
        for domain in domains {
            let domain = DomainUtils::canonicalize_domain(domain);
            if !domain.is_empty() {
                self.domains.insert(domain);
            }
        }
    }

    /// Membership test for a domain or any of its parents
    pub fn contains_domain(&self, domain: &str) -> bool {
        let domain = DomainUtils::canonicalize_domain(domain);
        DomainUtils::domain_hierarchy(&domain)
            .into_iter()
            .any(|level| self.domains.contains(level))
    }

    /// Disposability of the address's domain; addresses without a domain
    /// are never disposable.
    pub fn is_disposable_email(&self, email: &str) -> bool {
        DomainUtils::extract_domain(email)
            .map(|domain| self.contains_domain(&domain))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn sorted(&self) -> Vec<String> {
        let mut domains: Vec<String> = self.domains.iter().cloned().collect();
        domains.sort();
        domains
    }
}
