//! Autonomous loop runs with scripted model replies

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::sync::Arc;

use async_trait::async_trait;
use pentagent_core::Result;
use pentagent_core::agent::{
    AgentOutcome, AgentTool, AutonomousAgent, BackendTool, Investigation, StopReason, ToolBox,
    ToolKind,
};
use pentagent_core::config::{AgentLoopConfig, ToolsConfig};
use pentagent_core::state::MetricsTracker;
use pentagent_core::testing::{ScriptedProvider, scripted_backend};
use pentagent_core::tools::{BackendRegistry, ToolInvoker};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

const TRIAGE: &str = "Answer with exactly one word: INVESTIGATE";
const THINK: &str = "Current step:";

/// Execute tool that always prints the same thing
struct StaticShell;

#[async_trait]
impl AgentTool for StaticShell {
    fn name(&self) -> &str {
        "ShellTool"
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Execute
    }

    async fn execute(&self, _command: &str) -> Result<String> {
        Ok("Host is up (0.00012s latency).\n22/tcp open ssh".into())
    }
}

fn unwrap_investigation(outcome: AgentOutcome) -> Investigation {
    match outcome {
        AgentOutcome::Investigation(inv) => *inv,
        AgentOutcome::Chat { reply } => panic!("unexpected chat: {}", reply),
    }
}

#[tokio::test]
async fn identical_actions_stop_on_first_repeat() {
    let provider = Arc::new(
        ScriptedProvider::new("CONTINUE")
            .reply_when(TRIAGE, "INVESTIGATE")
            .reply_when("Break the following", "1. Scan ports\n2. Scan ports again\n3. Again\n4. Again")
            .reply_when(THINK, "Use ShellTool: nmap -Pn 10.0.0.5")
            .reply_when("penetration test report", "## Report"),
    );
    let agent = AutonomousAgent::new(
        provider.clone(),
        ToolBox::new().with_tool(Arc::new(StaticShell)),
        &AgentLoopConfig::default(),
    );

    let inv = unwrap_investigation(
        agent
            .run("scan 10.0.0.5", "job-r", CancellationToken::new())
            .await
            .unwrap(),
    );

    assert_eq!(inv.stop_reason, StopReason::Repetition);
    assert_eq!(inv.session.history.len(), 2);
    assert_eq!(inv.session.steps.len(), 4);
    assert_eq!(inv.report.as_deref(), Some("## Report"));
    assert_eq!(provider.calls_containing(THINK), 2);
    assert_eq!(provider.calls_containing("penetration test report"), 1);
}

#[tokio::test]
async fn step_ceiling_bounds_the_loop() {
    let provider = ScriptedProvider::new("CONTINUE")
        .reply_when(TRIAGE, "INVESTIGATE")
        .reply_sequence(
            THINK,
            [
                "Use ShellTool: nmap 10.0.0.5",
                "Use ShellTool: nmap -sV 10.0.0.5",
                "Use ShellTool: nmap -A 10.0.0.5",
                "Use ShellTool: nmap -p- 10.0.0.5",
            ],
        );
    let config = AgentLoopConfig {
        max_steps: 3,
        ..AgentLoopConfig::default()
    };
    let agent = AutonomousAgent::new(
        Arc::new(provider),
        ToolBox::new().with_tool(Arc::new(StaticShell)),
        &config,
    );

    let inv = unwrap_investigation(
        agent
            .run("scan 10.0.0.5", "job", CancellationToken::new())
            .await
            .unwrap(),
    );
    assert_eq!(inv.stop_reason, StopReason::StepLimit);
    assert_eq!(inv.session.history.len(), 3);
    assert!(inv.report.is_some());
}

#[tokio::test]
async fn continue_check_sees_the_whole_session() {
    let provider = Arc::new(
        ScriptedProvider::new("CONTINUE\nMore of the plan is left.")
            .reply_when(TRIAGE, "INVESTIGATE")
            .reply_when("Break the following", "1. Fingerprint\n2. Scan\n3. Enumerate")
            .reply_sequence(
                THINK,
                [
                    "Use ShellTool: whatweb 10.0.0.5",
                    "Use ShellTool: nikto -h 10.0.0.5",
                    "Use ShellTool: gobuster dir -u http://10.0.0.5",
                ],
            ),
    );
    let config = AgentLoopConfig {
        max_steps: 3,
        ..AgentLoopConfig::default()
    };
    let agent = AutonomousAgent::new(
        provider.clone(),
        ToolBox::new().with_tool(Arc::new(StaticShell)),
        &config,
    );

    let inv = unwrap_investigation(
        agent
            .run("scan 10.0.0.5", "job", CancellationToken::new())
            .await
            .unwrap(),
    );
    assert_eq!(inv.stop_reason, StopReason::StepLimit);

    let checks: Vec<String> = provider
        .prompts()
        .into_iter()
        .filter(|p| p.contains("CONTINUE or STOP"))
        .collect();
    assert_eq!(checks.len(), 3);
    let last = &checks[2];
    assert!(last.contains("ShellTool: whatweb 10.0.0.5"));
    assert!(last.contains("ShellTool: nikto -h 10.0.0.5"));
    assert!(last.contains("ShellTool: gobuster dir -u http://10.0.0.5"));
    assert!(last.contains("3. Enumerate"));
    assert!(last.contains("justification"));
}

#[tokio::test]
async fn backend_tools_go_through_the_invoker() {
    let registry = BackendRegistry::new().with_in_process(
        "websearch",
        scripted_backend("websearch", &[("search", "nikto -h <host> scans a web server")]).await,
    );
    let metrics = MetricsTracker::new();
    let invoker = Arc::new(Mutex::new(ToolInvoker::new(
        registry,
        &ToolsConfig::default(),
        metrics.clone(),
    )));

    let provider = ScriptedProvider::new("STOP")
        .reply_when(TRIAGE, "INVESTIGATE")
        .reply_when(THINK, "Use WebSearchTool: nikto usage");
    let agent = AutonomousAgent::new(
        Arc::new(provider),
        ToolBox::new().with_tool(Arc::new(BackendTool::web_search(invoker.clone()))),
        &AgentLoopConfig::default(),
    );

    let inv = unwrap_investigation(
        agent
            .run("look up nikto", "job", CancellationToken::new())
            .await
            .unwrap(),
    );
    assert_eq!(inv.stop_reason, StopReason::ModelStop);
    assert_eq!(
        inv.session.history[0].observation,
        "nikto -h <host> scans a web server"
    );
    assert_eq!(metrics.snapshot().tool_calls, 1);

    invoker.lock().await.disconnect_all().await;
}
