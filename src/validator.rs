use crate::config::Config;
use crate::disposable::DisposableDomainSet;
use crate::domain_utils::DomainUtils;
use crate::format::{FormatError, FormatValidator};
use crate::mx::MxChecker;
use crate::scoring::{QualityScorer, RiskLevel, ScoreSignals};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const INVALID_FORMAT: &str = "invalid format";

/// Outcome of validating one address. Carries no timestamps, so validating
/// the same input twice gives equal results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub email: String,
    pub is_valid_format: bool,
    pub is_disposable: bool,
    pub quality_score: u8,
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mx_record: Option<bool>,
    pub role_email: bool,
    pub risk_level: RiskLevel,
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    /// Result for an item that could not be validated at all
    pub fn rejected(email: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            is_valid_format: false,
            is_disposable: false,
            quality_score: 0,
            errors: vec![error.into()],
            reason: None,
            domain: None,
            mx_record: None,
            role_email: false,
            risk_level: RiskLevel::High,
            suggestions: Vec::new(),
        }
    }
}

/// Per-request knobs
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyOptions {
    pub strict: bool,
}

/// Runs format, disposability, MX and scoring checks for an address.
///
/// All collaborators are handed in explicitly; the validator owns no
/// mutable state of its own (the MX cache is internal to `MxChecker`).
#[derive(Debug, Clone)]
pub struct EmailValidator {
    format: FormatValidator,
    disposable: Arc<DisposableDomainSet>,
    mx: MxChecker,
    scorer: QualityScorer,
}

impl EmailValidator {
    pub fn new(
        disposable: Arc<DisposableDomainSet>,
        mx: MxChecker,
        scorer: QualityScorer,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            format: FormatValidator::new()?,
            disposable,
            mx,
            scorer,
        })
    }

    /// Assemble a validator from configuration, loading the disposable list
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let disposable = Arc::new(DisposableDomainSet::from_config(&config.disposable)?);
        let mx = MxChecker::new(&config.dns);
        let scorer = QualityScorer::new(config.scoring.clone());
        Self::new(disposable, mx, scorer)
    }

    pub fn disposable_domains(&self) -> &DisposableDomainSet {
        &self.disposable
    }

    pub fn mx_checker(&self) -> &MxChecker {
        &self.mx
    }

    pub async fn validate(&self, email: &str, options: VerifyOptions) -> ValidationResult {
        let email = email.trim().to_string();

        if let Err(e) = self.format.check(&email) {
            log::debug!("Format check failed for {email:?}: {e}");
            return self.invalid_format(email, &e);
        }

        // Format check guarantees a non-empty domain
        let domain = DomainUtils::extract_domain(&email).unwrap_or_default();
        let disposable = self.disposable.is_disposable_email(&email);
        let role_email = self.scorer.is_role_email(&email);
        let mx_record = self.mx.has_mx_record(&domain).await;

        let signals = ScoreSignals {
            valid_format: true,
            disposable,
            role_email,
            mx_record,
            domain: Some(&domain),
            strict: options.strict,
        };
        let quality_score = self.scorer.score(&signals);
        let risk_level = self.scorer.risk_level(&signals);
        let suggestions = self.scorer.suggestions(&signals, quality_score);

        log::debug!(
            "Validated {email}: disposable={disposable}, role={role_email}, mx={mx_record:?}, score={quality_score}"
        );

        ValidationResult {
            email,
            is_valid_format: true,
            is_disposable: disposable,
            quality_score,
            errors: Vec::new(),
            reason: None,
            domain: Some(domain),
            mx_record,
            role_email,
            risk_level,
            suggestions,
        }
    }

    /// Scored like any other address, so the low-score suggestion applies
    fn invalid_format(&self, email: String, error: &FormatError) -> ValidationResult {
        let signals = ScoreSignals::default();
        let quality_score = self.scorer.score(&signals);
        ValidationResult {
            reason: Some(error.to_string()),
            quality_score,
            risk_level: self.scorer.risk_level(&signals),
            suggestions: self.scorer.suggestions(&signals, quality_score),
            ..ValidationResult::rejected(email, INVALID_FORMAT)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(mx: MxChecker) -> EmailValidator {
        EmailValidator::new(
            Arc::new(DisposableDomainSet::builtin()),
            mx,
            QualityScorer::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_gmail_address() {
        let result = validator(MxChecker::disabled())
            .validate("test@gmail.com", VerifyOptions::default())
            .await;

        assert!(result.is_valid_format);
        assert!(!result.is_disposable);
        assert_eq!(result.quality_score, 95);
        assert!(result.errors.is_empty());
        assert_eq!(result.domain.as_deref(), Some("gmail.com"));
        assert_eq!(result.mx_record, None);
        assert_eq!(result.risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_disposable_address_scores_lower() {
        let v = validator(MxChecker::disabled());
        let gmail = v.validate("test@gmail.com", VerifyOptions::default()).await;
        let result = v.validate("user@mailinator.com", VerifyOptions::default()).await;

        assert!(result.is_valid_format);
        assert!(result.is_disposable);
        assert!(result.quality_score < gmail.quality_score);
        assert_eq!(result.quality_score, 30);
    }

    #[tokio::test]
    async fn test_not_an_email() {
        let result = validator(MxChecker::disabled())
            .validate("not-an-email", VerifyOptions::default())
            .await;

        assert!(!result.is_valid_format);
        assert!(!result.is_disposable);
        assert_eq!(result.quality_score, 0);
        assert_eq!(result.errors, vec![INVALID_FORMAT.to_string()]);
        assert_eq!(result.reason.as_deref(), Some("missing @"));
        assert_eq!(
            result.suggestions,
            vec![crate::scoring::SUGGEST_REPUTABLE_DOMAIN.to_string()]
        );
    }

    #[tokio::test]
    async fn test_validation_is_idempotent() {
        let v = validator(MxChecker::mock());
        let first = v.validate("info@company.com", VerifyOptions::default()).await;
        let second = v.validate("info@company.com", VerifyOptions::default()).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_input_is_trimmed() {
        let result = validator(MxChecker::disabled())
            .validate("  test@gmail.com \n", VerifyOptions::default())
            .await;
        assert_eq!(result.email, "test@gmail.com");
        assert!(result.is_valid_format);
    }

    #[tokio::test]
    async fn test_mock_mx_penalty() {
        let result = validator(MxChecker::mock())
            .validate("jane@example.com", VerifyOptions::default())
            .await;
        assert_eq!(result.mx_record, Some(false));
        assert_eq!(result.quality_score, 55);
        assert_eq!(result.risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn test_strict_mode() {
        let v = validator(MxChecker::disabled());
        let strict = VerifyOptions { strict: true };
        assert_eq!(v.validate("admin@gmail.com", strict).await.quality_score, 0);
        assert_eq!(v.validate("jane@gmail.com", strict).await.quality_score, 95);
    }

    #[test]
    fn test_serialized_shape() {
        let result = ValidationResult::rejected("x", INVALID_FORMAT);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["email"], "x");
        assert_eq!(json["is_valid_format"], false);
        assert_eq!(json["quality_score"], 0);
        assert_eq!(json["risk_level"], "high");
        assert!(json.get("mx_record").is_none());
    }
}
