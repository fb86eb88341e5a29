// SPDX-License-Identifier: AGPL-3.0

//! The vulnerability report record produced by detection modules.
//!
//! One record per finding, built incrementally by a detection module as it
//! walks a path and finalized by the driver once the address and contract
//! bytecode are known (hooks only see an `ExecState`, never the `Contract`
//! it belongs to).

use serde::{Deserialize, Serialize};

/// Severity ranking, ordered low to high so `Ord` sorts a report by risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        };
        write!(f, "{}", s)
    }
}

/// A single reported finding.
///
/// `gas_used` is the (min, max) gas consumed across every path that hit this
/// finding's location, matching the upstream scanner's habit of widening a single issue's
/// gas range as more paths confirm the same bug rather than emitting one
/// issue per path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub contract_name: Option<String>,
    pub function_name: Option<String>,
    pub address: [u8; 20],
    pub swc_id: &'static str,
    pub title: String,
    pub severity: Severity,
    pub description_head: String,
    pub description_tail: String,
    pub gas_used: (u64, u64),
    pub debug: Option<String>,
    pub bytecode_hash: Option<String>,
}

impl Issue {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        address: [u8; 20],
        swc_id: &'static str,
        title: impl Into<String>,
        severity: Severity,
        description_head: impl Into<String>,
        description_tail: impl Into<String>,
        gas_used: u64,
    ) -> Self {
        Self {
            contract_name: None,
            function_name: None,
            address,
            swc_id,
            title: title.into(),
            severity,
            description_head: description_head.into(),
            description_tail: description_tail.into(),
            gas_used: (gas_used, gas_used),
            debug: None,
            bytecode_hash: None,
        }
    }

    /// Widen this issue's gas range to also cover `gas_used`, as a second
    /// path hitting the same finding reports in.
    pub fn widen_gas(&mut self, gas_used: u64) {
        self.gas_used.0 = self.gas_used.0.min(gas_used);
        self.gas_used.1 = self.gas_used.1.max(gas_used);
    }

    pub fn with_debug(mut self, debug: impl Into<String>) -> Self {
        self.debug = Some(debug.into());
        self
    }

    pub fn with_contract_name(mut self, name: impl Into<String>) -> Self {
        self.contract_name = Some(name.into());
        self
    }

    pub fn with_function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    pub fn with_bytecode_hash(mut self, hash: impl Into<String>) -> Self {
        self.bytecode_hash = Some(hash.into());
        self
    }

    pub fn description(&self) -> String {
        format!("{}\n{}", self.description_head, self.description_tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widen_gas_expands_both_bounds() {
        let mut issue = Issue::new(
            [0u8; 20],
            "SWC-101",
            "Integer Overflow",
            Severity::High,
            "head",
            "tail",
            100,
        );
        issue.widen_gas(50);
        issue.widen_gas(200);
        assert_eq!(issue.gas_used, (50, 200));
    }

    #[test]
    fn severity_orders_low_to_high() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn builder_methods_populate_optional_fields() {
        let issue = Issue::new([1u8; 20], "SWC-110", "t", Severity::Medium, "h", "t", 1)
            .with_contract_name("Vault")
            .with_function_name("withdraw()")
            .with_bytecode_hash("deadbeef")
            .with_debug("tx0: ...");
        assert_eq!(issue.contract_name.as_deref(), Some("Vault"));
        assert_eq!(issue.function_name.as_deref(), Some("withdraw()"));
        assert_eq!(issue.bytecode_hash.as_deref(), Some("deadbeef"));
        assert_eq!(issue.debug.as_deref(), Some("tx0: ..."));
    }
}
