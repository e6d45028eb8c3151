//! Risk evaluation for freshly created proposals: the rule set and the orchestrator that
//! turns rule outcomes into the stage events sent back to the account side.

mod config;
mod rules;
mod service;

pub use config::RiskPolicy;
pub use rules::{check_credit, check_documents, check_fraud, RiskRule, RuleOutcome};
pub use service::{AnalysisError, AnalysisVerdict, RiskAnalysisService};
