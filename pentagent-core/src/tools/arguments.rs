//! Per-operation argument preparation

use serde_json::{Value, json};

use crate::state::Phase;

/// Inputs available when building an operation's arguments
#[derive(Debug, Clone, Copy)]
pub struct ArgumentContext<'a> {
    /// Target as given by the user
    pub target: &'a str,
    /// Bare host of the target
    pub domain: &'a str,
    /// Resolved IP, or the target when resolution failed
    pub address: &'a str,
    pub phase: Phase,
    pub previous_findings: &'a [String],
    /// Operations that scan the resolved address instead of the target
    pub address_operations: &'a [String],
}

impl ArgumentContext<'_> {
    /// Value `operation` scans: the address for allow-listed operations,
    /// the original target otherwise
    pub fn subject_for(&self, operation: &str) -> &str {
        if self.address_operations.iter().any(|op| op == operation) {
            self.address
        } else {
            self.target
        }
    }

    /// Host name `operation` works on: the address for allow-listed
    /// operations, the bare host otherwise
    pub fn host_for(&self, operation: &str) -> &str {
        if self.address_operations.iter().any(|op| op == operation) {
            self.address
        } else if self.domain.is_empty() {
            self.target
        } else {
            self.domain
        }
    }
}

/// Build the arguments for `operation`.
///
/// Each operation receives only the arguments it requires; unknown
/// operations get `{}`.
pub fn prepare_arguments(operation: &str, ctx: &ArgumentContext<'_>) -> Value {
    let target = ctx.target;
    let subject = ctx.subject_for(operation);
    match operation {
        "nmap" => {
            if ctx.phase == Phase::InformationGathering {
                json!({ "target": subject, "options": "-sV -sC -p-" })
            } else {
                json!({ "target": subject })
            }
        }
        "nuclei" => {
            if ctx.phase == Phase::ActiveScanning {
                json!({ "target": subject, "template": "cves" })
            } else {
                json!({ "target": subject })
            }
        }
        "whatweb" => json!({ "target": subject }),
        "gobuster" | "nikto" => json!({ "url": with_scheme(subject) }),
        "sublist3r" | "recon-ng" => json!({ "domain": ctx.host_for(operation) }),
        "hydra" => json!({ "target": subject, "service": "ssh" }),
        "metasploit" => json!({ "command": "help" }),
        "shell_command" => json!({ "command": "whoami" }),
        "google_dork" => {
            json!({ "query": format!("site:{} inurl:admin", ctx.host_for(operation)) })
        }
        "search" | "search_news" => {
            let query = if ctx.phase == Phase::Evaluation {
                format!("security assessment {} findings", target)
            } else {
                format!("{} security vulnerabilities", target)
            };
            json!({ "query": query })
        }
        "store" => {
            let content = if ctx.previous_findings.is_empty() {
                format!(
                    "Security testing results for {} in {} phase",
                    target, ctx.phase
                )
            } else {
                ctx.previous_findings.join("\n")
            };
            json!({ "category": format!("{}_{}", ctx.phase, target), "content": content })
        }
        "get_category" => json!({ "category": format!("{}_{}", ctx.phase, target) }),
        "spider" | "active_scan" => json!({ "url": with_scheme(subject) }),
        _ => json!({}),
    }
}

/// Prefix `https://` unless the target already has an http(s) scheme
pub fn with_scheme(target: &str) -> String {
    if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        format!("https://{}", target)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn address_ops() -> Vec<String> {
        vec!["nmap".into(), "nuclei".into(), "hydra".into()]
    }

    fn ctx<'a>(phase: Phase, findings: &'a [String], ops: &'a [String]) -> ArgumentContext<'a> {
        ArgumentContext {
            target: "example.com",
            domain: "example.com",
            address: "93.184.216.34",
            phase,
            previous_findings: findings,
            address_operations: ops,
        }
    }

    #[test]
    fn test_allow_listed_operations_scan_the_address() {
        let ops = address_ops();
        let c = ctx(Phase::InformationGathering, &[], &ops);
        assert_eq!(c.subject_for("nmap"), "93.184.216.34");
        assert_eq!(c.subject_for("whatweb"), "example.com");
        assert_eq!(
            prepare_arguments("whatweb", &c),
            json!({ "target": "example.com" })
        );
    }

    #[test]
    fn test_host_operations_get_bare_domain() {
        let ops = address_ops();
        let c = ArgumentContext {
            target: "https://example.com:8443/app",
            ..ctx(Phase::InformationGathering, &[], &ops)
        };
        assert_eq!(
            prepare_arguments("sublist3r", &c),
            json!({ "domain": "example.com" })
        );
        assert_eq!(
            prepare_arguments("google_dork", &c),
            json!({ "query": "site:example.com inurl:admin" })
        );
        assert_eq!(
            prepare_arguments("whatweb", &c),
            json!({ "target": "https://example.com:8443/app" })
        );

        let bare = ArgumentContext { domain: "", ..c };
        assert_eq!(bare.host_for("sublist3r"), "https://example.com:8443/app");
    }

    #[test]
    fn test_nmap_options_only_during_information_gathering() {
        let ops = address_ops();
        let c = ctx(Phase::InformationGathering, &[], &ops);
        assert_eq!(
            prepare_arguments("nmap", &c),
            json!({ "target": "93.184.216.34", "options": "-sV -sC -p-" })
        );

        let c = ctx(Phase::ActiveScanning, &[], &ops);
        assert_eq!(
            prepare_arguments("nmap", &c),
            json!({ "target": "93.184.216.34" })
        );
    }

    #[test]
    fn test_nuclei_template_only_during_active_scanning() {
        let ops = address_ops();
        let c = ctx(Phase::ActiveScanning, &[], &ops);
        assert_eq!(
            prepare_arguments("nuclei", &c),
            json!({ "target": "93.184.216.34", "template": "cves" })
        );
    }

    #[test]
    fn test_empty_allow_list_passes_target_everywhere() {
        let c = ctx(Phase::ActiveScanning, &[], &[]);
        assert_eq!(
            prepare_arguments("hydra", &c),
            json!({ "target": "example.com", "service": "ssh" })
        );
    }

    #[test]
    fn test_url_operations_get_scheme() {
        let ops = address_ops();
        let c = ctx(Phase::Spidering, &[], &ops);
        assert_eq!(
            prepare_arguments("gobuster", &c),
            json!({ "url": "https://example.com" })
        );
        assert_eq!(with_scheme("http://example.com:8080"), "http://example.com:8080");
    }

    #[test]
    fn test_hydra_gets_service() {
        let ops = address_ops();
        let c = ctx(Phase::ActiveScanning, &[], &ops);
        assert_eq!(
            prepare_arguments("hydra", &c),
            json!({ "target": "93.184.216.34", "service": "ssh" })
        );
    }

    #[test]
    fn test_search_query_depends_on_phase() {
        let ops = address_ops();
        let c = ctx(Phase::InformationGathering, &[], &ops);
        assert_eq!(
            prepare_arguments("search_news", &c)["query"],
            "example.com security vulnerabilities"
        );
        let c = ctx(Phase::Evaluation, &[], &ops);
        assert_eq!(
            prepare_arguments("search", &c)["query"],
            "security assessment example.com findings"
        );
    }

    #[test]
    fn test_store_uses_previous_findings() {
        let ops = address_ops();
        let findings = vec!["nmap: 22/tcp open".to_string(), "whatweb: nginx".to_string()];
        let c = ctx(Phase::Spidering, &findings, &ops);
        let args = prepare_arguments("store", &c);
        assert_eq!(args["category"], "spidering_example.com");
        assert_eq!(args["content"], "nmap: 22/tcp open\nwhatweb: nginx");

        let c = ctx(Phase::ActiveScanning, &[], &ops);
        assert_eq!(
            prepare_arguments("store", &c)["content"],
            "Security testing results for example.com in active_scanning phase"
        );
    }

    #[test]
    fn test_operations_receive_only_required_arguments() {
        let ops = address_ops();
        let c = ctx(Phase::Evaluation, &[], &ops);
        assert_eq!(prepare_arguments("list_categories", &c), json!({}));
        assert_eq!(
            prepare_arguments("get_category", &c),
            json!({ "category": "evaluation_example.com" })
        );
        assert_eq!(
            prepare_arguments("shell_command", &c),
            json!({ "command": "whoami" })
        );
        assert_eq!(prepare_arguments("unknown_op", &c), json!({}));
    }
}
