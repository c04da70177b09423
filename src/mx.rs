use crate::config::{DnsConfig, DnsMode};
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy)]
struct CachedMx {
    has_mx: bool,
    cached_at: Instant,
}

/// Mail-exchanger check for address domains, cached per domain.
///
/// In `Off` mode every lookup answers `None` so scoring ignores MX entirely.
/// `Mock` gives deterministic answers for tests and offline runs.
#[derive(Clone)]
pub struct MxChecker {
    mode: DnsMode,
    resolver: Option<Arc<TokioAsyncResolver>>,
    cache: Arc<RwLock<HashMap<String, CachedMx>>>,
    cache_ttl: Duration,
    timeout: Duration,
}

impl std::fmt::Debug for MxChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MxChecker")
            .field("mode", &self.mode)
            .field("cache_ttl", &self.cache_ttl)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl MxChecker {
    pub fn new(config: &DnsConfig) -> Self {
        let resolver = match config.mode {
            DnsMode::Dns => Some(Arc::new(Self::build_resolver())),
            DnsMode::Off | DnsMode::Mock => None,
        };

        Self {
            mode: config.mode,
            resolver,
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_ttl: Duration::from_secs(config.cache_ttl_seconds),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    pub fn disabled() -> Self {
        Self::new(&DnsConfig {
            mode: DnsMode::Off,
            ..DnsConfig::default()
        })
    }

    pub fn mock() -> Self {
        Self::new(&DnsConfig {
            mode: DnsMode::Mock,
            ..DnsConfig::default()
        })
    }

    fn build_resolver() -> TokioAsyncResolver {
        match TokioAsyncResolver::tokio_from_system_conf() {
            Ok(resolver) => resolver,
            Err(e) => {
                log::warn!("Failed to read system resolver configuration, using defaults: {e}");
                TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
            }
        }
    }

    pub fn mode(&self) -> DnsMode {
        self.mode
    }

    pub fn is_enabled(&self) -> bool {
        self.mode != DnsMode::Off
    }

    /// Whether `domain` publishes at least one MX record. `None` when MX
    /// checking is switched off. Lookup failures and timeouts count as
    /// "no MX".
    pub async fn has_mx_record(&self, domain: &str) -> Option<bool> {
        if !self.is_enabled() {
            return None;
        }

        let domain = domain.to_lowercase();

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(&domain) {
                if cached.cached_at.elapsed() < self.cache_ttl {
                    log::debug!("Using cached MX result for {domain}: {}", cached.has_mx);
                    return Some(cached.has_mx);
                }
            }
        }

        let has_mx = match self.mode {
            DnsMode::Mock => Self::mock_lookup(&domain),
            _ => self.lookup(&domain).await,
        };

        {
            let mut cache = self.cache.write().await;
            cache.insert(
                domain,
                CachedMx {
                    has_mx,
                    cached_at: Instant::now(),
                },
            );
        }

        Some(has_mx)
    }

    /// Drop expired entries
    pub async fn clean_cache(&self) -> usize {
        let mut cache = self.cache.write().await;
        let before = cache.len();
        let ttl = self.cache_ttl;
        cache.retain(|_, entry| entry.cached_at.elapsed() < ttl);
        before - cache.len()
    }

    pub async fn cached_domains(&self) -> usize {
        self.cache.read().await.len()
    }

    async fn lookup(&self, domain: &str) -> bool {
        let resolver = match self.resolver.as_ref() {
            Some(resolver) => resolver,
            None => {
                log::warn!("No DNS resolver available for {domain}");
                return false;
            }
        };

        log::debug!("Checking MX records for {domain} (timeout: {:?})", self.timeout);
        match tokio::time::timeout(self.timeout, resolver.mx_lookup(domain)).await {
            Ok(Ok(response)) => {
                let mx_count = response.iter().count();
                for mx in response.iter().take(3) {
                    log::debug!(
                        "MX record for {domain}: {} (priority {})",
                        mx.exchange(),
                        mx.preference()
                    );
                }
                mx_count > 0
            }
            Ok(Err(e)) => {
                log::debug!("MX lookup failed for {domain}: {e}");
                false
            }
            Err(_) => {
                log::debug!("MX lookup timed out for {domain} after {:?}", self.timeout);
                false
            }
        }
    }

    /// Reserved and example names have no mail exchangers; everything else
    /// does.
    fn mock_lookup(domain: &str) -> bool {
        const NO_MX_SUFFIXES: &[&str] = &[".invalid", ".test", ".example", ".localhost"];
        const NO_MX_DOMAINS: &[&str] = &["example.com", "example.org", "example.net"];

        if NO_MX_DOMAINS.contains(&domain) {
            return false;
        }
        !NO_MX_SUFFIXES.iter().any(|suffix| domain.ends_with(suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_checker_answers_none() {
        let checker = MxChecker::disabled();
        assert!(!checker.is_enabled());
        assert_eq!(checker.has_mx_record("gmail.com").await, None);
    }

    #[tokio::test]
    async fn test_mock_answers() {
        let checker = MxChecker::mock();
        assert_eq!(checker.has_mx_record("gmail.com").await, Some(true));
        assert_eq!(checker.has_mx_record("Example.COM").await, Some(false));
        assert_eq!(checker.has_mx_record("nowhere.invalid").await, Some(false));
    }

    #[tokio::test]
    async fn test_results_are_cached() {
        let checker = MxChecker::mock();
        checker.has_mx_record("gmail.com").await;
        checker.has_mx_record("GMAIL.com").await;
        assert_eq!(checker.cached_domains().await, 1);
    }

    #[tokio::test]
    async fn test_clean_cache_drops_expired_entries() {
        let checker = MxChecker::new(&DnsConfig {
            mode: DnsMode::Mock,
            timeout_seconds: 1,
            cache_ttl_seconds: 0,
        });
        checker.has_mx_record("gmail.com").await;
        assert_eq!(checker.clean_cache().await, 1);
        assert_eq!(checker.cached_domains().await, 0);
    }
}
