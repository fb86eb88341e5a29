// SPDX-License-Identifier: AGPL-3.0

//! Vulnerability scan reporting.
//!
//! Wires `cbse-detectors` into a `SEVM` instance and turns whatever it
//! collected into the SWC-style issue list printed alongside (not instead
//! of) the pass/fail test report, matching the `--modules` flag: a
//! comma-separated SWC id list selects which built-in detectors run,
//! an empty list runs all of them.

use cbse_config::Config;
use cbse_detectors::{register_all, DetectionModule, Issue};
use cbse_hashes::keccak256;
use cbse_sevm::SEVM;
use colored::Colorize;

/// Register the detectors selected by `config.modules` against `sevm`.
///
/// Returns the live handles; poll `issues()` on each once every transaction
/// against this `SEVM` has run.
pub fn install_detectors<'ctx>(
    sevm: &mut SEVM<'ctx>,
    config: &Config,
) -> Vec<Box<dyn DetectionModule<'ctx> + 'ctx>> {
    let all = register_all(&mut sevm.hooks);
    if config.modules.trim().is_empty() {
        return all;
    }

    let wanted: Vec<&str> = config.modules.split(',').map(str::trim).collect();
    all.into_iter()
        .filter(|module| wanted.contains(&module.swc_id()))
        .collect()
}

/// Drain every detector's findings, stamp in the contract identity that
/// hooks can't see on their own, and print a SWC-catalog-style issue report.
///
/// Returns the finalized issues so a caller can fold `total_found` into
/// `MainResult`.
pub fn finalize_and_report<'ctx>(
    modules: &[Box<dyn DetectionModule<'ctx> + 'ctx>],
    contract_name: &str,
    bytecode: &[u8],
) -> Vec<Issue> {
    let bytecode_hash = hex::encode(keccak256(bytecode));

    let mut issues: Vec<Issue> = modules
        .iter()
        .flat_map(|module| module.issues())
        .map(|issue| {
            issue
                .with_contract_name(contract_name.to_string())
                .with_bytecode_hash(bytecode_hash.clone())
        })
        .collect();

    issues.sort_by(|a, b| b.severity.cmp(&a.severity));

    for issue in &issues {
        print_issue(issue);
    }

    issues
}

fn print_issue(issue: &Issue) {
    let severity = match issue.severity {
        cbse_detectors::Severity::High => "High".red().bold(),
        cbse_detectors::Severity::Medium => "Medium".yellow().bold(),
        cbse_detectors::Severity::Low => "Low".normal().bold(),
    };

    println!(
        "{} {} [{}] {}",
        "==>".dimmed(),
        issue.title.bold(),
        severity,
        issue.swc_id
    );
    if let Some(contract) = &issue.contract_name {
        println!("    Contract: {}", contract);
    }
    if let Some(function) = &issue.function_name {
        println!("    Function: {}", function);
    }
    println!("    {}", issue.description_head);
    println!("    {}", issue.description_tail);
    println!(
        "    Gas used: {}-{}",
        issue.gas_used.0, issue.gas_used.1
    );
    if let Some(debug) = &issue.debug {
        println!("    Path: {}", debug);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbse_detectors::Severity;

    #[test]
    fn finalize_stamps_contract_identity_and_sorts_by_severity() {
        struct Stub(Vec<Issue>);
        impl<'ctx> DetectionModule<'ctx> for Stub {
            fn register(&self, _registry: &mut cbse_sevm::HookRegistry<'ctx>) {}
            fn issues(&self) -> Vec<Issue> {
                self.0.clone()
            }
            fn swc_id(&self) -> &'static str {
                "SWC-000"
            }
        }

        let low = Issue::new([1u8; 20], "SWC-000", "low", Severity::Low, "h", "t", 1);
        let high = Issue::new([1u8; 20], "SWC-101", "high", Severity::High, "h", "t", 1);
        let modules: Vec<Box<dyn DetectionModule<'static> + 'static>> =
            vec![Box::new(Stub(vec![low, high]))];

        let issues = finalize_and_report(&modules, "Vault", b"\x60\x00\x60\x00");
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].severity, Severity::High);
        assert!(issues.iter().all(|i| i.contract_name.as_deref() == Some("Vault")));
        assert!(issues.iter().all(|i| i.bytecode_hash.is_some()));
    }
}
