use crate::config::ScoringConfig;
use crate::domain_utils::DomainUtils;
use serde::{Deserialize, Serialize};

pub const MAX_SCORE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Everything the heuristic looks at for one address
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreSignals<'a> {
    pub valid_format: bool,
    pub disposable: bool,
    pub role_email: bool,
    /// `None` when MX checking is disabled
    pub mx_record: Option<bool>,
    pub domain: Option<&'a str>,
    pub strict: bool,
}

pub const SUGGEST_PROFESSIONAL_PROVIDER: &str =
    "Use a professional email provider (Gmail, Outlook, etc.)";
pub const SUGGEST_AVOID_ROLE: &str = "Avoid role-based emails like info@, admin@, support@";
pub const SUGGEST_REPUTABLE_DOMAIN: &str = "Consider using a more reputable email domain";

/// Fixed, deterministic quality heuristic
#[derive(Debug, Clone)]
pub struct QualityScorer {
    config: ScoringConfig,
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

impl QualityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        let mut config = config;
        config.role_prefixes = config
            .role_prefixes
            .iter()
            .map(|p| p.trim().to_lowercase())
            .collect();
        Self { config }
    }

    pub fn is_role_local_part(&self, local_part: &str) -> bool {
        let local = local_part.to_lowercase();
        self.config.role_prefixes.iter().any(|p| *p == local)
    }

    pub fn is_popular_domain(&self, domain: &str) -> bool {
        self.config
            .popular_domains
            .iter()
            .any(|p| p.eq_ignore_ascii_case(domain))
    }

    /// 0 for invalid addresses, otherwise the base score adjusted for
    /// disposability, role accounts and missing MX, lifted for popular
    /// providers, clamped to 0..=100. Strict mode zeroes any flagged address.
    pub fn score(&self, signals: &ScoreSignals<'_>) -> u8 {
        if !signals.valid_format {
            return 0;
        }

        let cfg = &self.config;
        let no_mx = signals.mx_record == Some(false);

        if signals.strict && (signals.disposable || signals.role_email || no_mx) {
            return 0;
        }

        let mut score = i32::from(cfg.base_score);
        if signals.disposable {
            score = i32::from(cfg.disposable_score);
        }
        if signals.role_email {
            score -= i32::from(cfg.role_penalty);
        }
        if no_mx {
            score -= i32::from(cfg.no_mx_penalty);
        }
        if signals
            .domain
            .map(|d| self.is_popular_domain(d))
            .unwrap_or(false)
        {
            score = score.max(i32::from(cfg.popular_floor));
        }

        score.clamp(0, i32::from(MAX_SCORE)) as u8
    }

    pub fn risk_level(&self, signals: &ScoreSignals<'_>) -> RiskLevel {
        if !signals.valid_format || signals.disposable || signals.mx_record == Some(false) {
            RiskLevel::High
        } else if signals.role_email {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn suggestions(&self, signals: &ScoreSignals<'_>, score: u8) -> Vec<String> {
        let mut suggestions = Vec::new();
        if signals.disposable {
            suggestions.push(SUGGEST_PROFESSIONAL_PROVIDER.to_string());
        }
        if signals.role_email {
            suggestions.push(SUGGEST_AVOID_ROLE.to_string());
        }
        if score < self.config.low_score_threshold {
            suggestions.push(SUGGEST_REPUTABLE_DOMAIN.to_string());
        }
        suggestions
    }

    /// Role detection straight from a full address
    pub fn is_role_email(&self, email: &str) -> bool {
        DomainUtils::extract_local_part(email)
            .map(|local| self.is_role_local_part(&local))
            .unwrap_or(false)
    }
}
