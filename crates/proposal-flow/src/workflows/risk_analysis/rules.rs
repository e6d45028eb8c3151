use serde::{Deserialize, Serialize};

use super::config::RiskPolicy;
use crate::events::ProposalPayload;

/// The independent checks a payload goes through, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskRule {
    Documents,
    Credit,
    Fraud,
}

impl RiskRule {
    pub const ORDER: [RiskRule; 3] = [RiskRule::Documents, RiskRule::Credit, RiskRule::Fraud];

    pub fn label(&self) -> &'static str {
        match self {
            RiskRule::Documents => "documents",
            RiskRule::Credit => "credit",
            RiskRule::Fraud => "fraud",
        }
    }

    pub fn evaluate(&self, payload: &ProposalPayload, policy: &RiskPolicy) -> RuleOutcome {
        match self {
            RiskRule::Documents => check_documents(payload, policy),
            RiskRule::Credit => check_credit(payload, policy),
            RiskRule::Fraud => check_fraud(payload),
        }
    }
}

/// Verdict of a single rule. `reason` is empty on approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub approved: bool,
    pub reason: String,
}

impl RuleOutcome {
    pub fn approved() -> Self {
        Self {
            approved: true,
            reason: String::new(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            reason: reason.into(),
        }
    }
}

pub fn check_documents(payload: &ProposalPayload, policy: &RiskPolicy) -> RuleOutcome {
    if payload.cpf.chars().count() != policy.cpf_length {
        return RuleOutcome::rejected(format!(
            "CPF must have exactly {} digits",
            policy.cpf_length
        ));
    }
    if payload.full_name.chars().count() < policy.minimum_name_length {
        return RuleOutcome::rejected(format!(
            "full name must have at least {} characters",
            policy.minimum_name_length
        ));
    }
    RuleOutcome::approved()
}

pub fn check_credit(payload: &ProposalPayload, policy: &RiskPolicy) -> RuleOutcome {
    if payload.salary > policy.minimum_salary {
        RuleOutcome::approved()
    } else {
        RuleOutcome::rejected(format!(
            "salary must be greater than {:.2}",
            policy.minimum_salary
        ))
    }
}

/// Approves when the last character of the CPF is an even digit.
pub fn check_fraud(payload: &ProposalPayload) -> RuleOutcome {
    match payload.cpf.chars().last().and_then(|last| last.to_digit(10)) {
        Some(digit) if digit % 2 == 0 => RuleOutcome::approved(),
        Some(_) => RuleOutcome::rejected("CPF failed fraud check"),
        None => RuleOutcome::rejected("CPF must end in a digit"),
    }
}
