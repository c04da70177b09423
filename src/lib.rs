pub mod api;
pub mod bulk;
pub mod config;
pub mod disposable;
pub mod domain_utils;
pub mod format;
pub mod mx;
pub mod scoring;
pub mod statistics;
pub mod usage;
pub mod validator;

pub use bulk::{BulkItem, BulkProcessor};
pub use config::Config;
pub use disposable::DisposableDomainSet;
pub use format::{FormatError, FormatValidator};
pub use mx::MxChecker;
pub use scoring::{QualityScorer, RiskLevel};
pub use statistics::{StatEvent, StatisticsCollector};
pub use validator::{EmailValidator, ValidationResult, VerifyOptions};
