pub mod proposals;
pub mod risk_analysis;
