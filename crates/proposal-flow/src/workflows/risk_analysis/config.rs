use serde::{Deserialize, Serialize};

/// Thresholds applied by the risk rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    pub cpf_length: usize,
    pub minimum_name_length: usize,
    /// Salaries must be strictly greater than this value.
    pub minimum_salary: f64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            cpf_length: 11,
            minimum_name_length: 3,
            minimum_salary: 3000.0,
        }
    }
}
