//! Command execution and result display

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use pentagent_core::agent::{AgentOutcome, AutonomousAgent, standard_toolbox};
use pentagent_core::config::AgentConfig;
use pentagent_core::orchestrator::SecurityOrchestrator;
use pentagent_core::prompts::Prompts;
use pentagent_core::providers::{LlmProvider, create_provider};
use pentagent_core::state::{Metrics, MetricsTracker, UserInput, WorkflowState};
use pentagent_core::tools::{BackendRegistry, ToolInvoker};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::args::{Args, Command};

/// Everything a command needs, built once from config and flags
pub struct Runtime {
    pub config: AgentConfig,
    pub prompts: Prompts,
    pub metrics: MetricsTracker,
    pub job_id: String,
    pub verbose: u8,
}

impl Runtime {
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => AgentConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => AgentConfig::load_default(),
        };
        config.expand_env_vars();
        if let Some(spec) = args.command.model() {
            config.provider.apply_model_spec(spec)?;
        }

        let prompts = match &args.prompts {
            Some(path) => Prompts::from_file(path)
                .with_context(|| format!("Failed to load prompts from {}", path.display()))?,
            None => Prompts::default(),
        };

        Ok(Self {
            config,
            prompts,
            metrics: MetricsTracker::new(),
            job_id: generate_job_id(),
            verbose: args.verbose,
        })
    }

    fn provider(&self) -> Result<Arc<dyn LlmProvider>> {
        Ok(create_provider(&self.config.provider, self.metrics.clone())?)
    }

    fn invoker(&self) -> ToolInvoker {
        ToolInvoker::new(
            BackendRegistry::from_config(&self.config.backends),
            &self.config.tools,
            self.metrics.clone(),
        )
    }
}

/// `<utc timestamp>-<8 hex chars>`
pub fn generate_job_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}",
        Utc::now().format("%Y%m%d%H%M%S"),
        id.get(..8).unwrap_or(&id)
    )
}

/// Cancel `token` on Ctrl-C
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping");
            token.cancel();
        }
    });
}

pub async fn run(args: Args) -> Result<()> {
    let runtime = Runtime::from_args(&args)?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match args.command {
        Command::Scan {
            target, message, ..
        } => {
            let message = message.unwrap_or_else(|| {
                format!("Conduct a comprehensive security assessment of {}", target)
            });
            run_workflow(&runtime, UserInput::new(message).with_target(target), cancel).await
        }
        Command::Chat { message, .. } => {
            run_workflow(&runtime, UserInput::new(message), cancel).await
        }
        Command::Agent { task, .. } => run_agent(&runtime, &task, cancel).await,
        Command::Tools { backend } => list_tools(&runtime, backend.as_deref()).await,
    }
}

async fn run_workflow(
    runtime: &Runtime,
    user_input: UserInput,
    cancel: CancellationToken,
) -> Result<()> {
    println!("Job ID: {}", runtime.job_id);
    if runtime.verbose > 0 {
        println!("Message: {}", user_input.message);
        if let Some(target) = &user_input.target {
            println!("Target: {}", target);
        }
        println!(
            "Model: {:?}/{}",
            runtime.config.provider.name, runtime.config.provider.model
        );
    }

    let orchestrator =
        SecurityOrchestrator::new(runtime.provider()?, runtime.invoker(), &runtime.config)
            .with_prompts(runtime.prompts.clone());
    let state = orchestrator
        .run(user_input, &runtime.job_id, cancel)
        .await?;

    display_workflow(&state, runtime.verbose > 0);
    display_metrics(&runtime.metrics.snapshot());
    Ok(())
}

async fn run_agent(runtime: &Runtime, task: &str, cancel: CancellationToken) -> Result<()> {
    println!("Session: {}", runtime.job_id);
    println!("Task: {}", task);

    let invoker = Arc::new(Mutex::new(runtime.invoker()));
    let tools = standard_toolbox(&runtime.config.agent, invoker.clone());
    info!(tools = ?tools, "Agent tools ready");

    let agent = AutonomousAgent::new(runtime.provider()?, tools, &runtime.config.agent)
        .with_prompts(runtime.prompts.clone());
    let outcome = agent.run(task, &runtime.job_id, cancel).await;
    invoker.lock().await.disconnect_all().await;

    match outcome? {
        AgentOutcome::Chat { reply } => println!("\n{}", reply),
        AgentOutcome::Investigation(inv) => {
            for (i, entry) in inv.session.history.iter().enumerate() {
                println!("\n[{}] Thought: {}", i + 1, entry.thought.trim());
                println!("    Action: {}", entry.action);
                if runtime.verbose > 0 {
                    println!("    Observation: {}", entry.observation.trim());
                }
            }
            if !inv.session.findings.is_empty() {
                println!("\nFindings:");
                for finding in &inv.session.findings {
                    println!("  - {}", finding);
                }
            }
            println!(
                "\nStopped: {} after {:.1}s (started {})",
                inv.stop_reason,
                inv.duration,
                inv.started_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            if let Some(report) = &inv.report {
                println!("\n=== Report ===\n{}", report);
            }
        }
    }

    display_metrics(&runtime.metrics.snapshot());
    Ok(())
}

async fn list_tools(runtime: &Runtime, only: Option<&str>) -> Result<()> {
    let mut invoker = runtime.invoker();
    if let Some(name) = only
        && invoker.registry().get(name).is_none()
    {
        bail!(
            "Unknown backend {}. Configured: {}",
            name,
            invoker.registry().names().join(", ")
        );
    }

    invoker.connect_all().await;
    let names: Vec<String> = invoker
        .registry()
        .names()
        .into_iter()
        .filter(|n| only.is_none_or(|o| o == *n))
        .map(str::to_string)
        .collect();

    for name in names {
        println!("{}:", name);
        match invoker.list_operations(&name).await {
            Ok(ops) => {
                for op in ops {
                    println!("  {:<16} {}", op.name, op.description);
                }
            }
            Err(e) => println!("  unavailable: {}", e),
        }
    }
    invoker.disconnect_all().await;
    Ok(())
}

fn display_workflow(state: &WorkflowState, verbose: bool) {
    if state.cancelled {
        println!("\nRun cancelled; partial results follow.");
    }

    if let Some(decision) = &state.intent_decision {
        println!("\nIntent: {:?} (confidence {:.1})", decision.intent, decision.confidence);
        if verbose {
            println!("Reasoning: {}", decision.reasoning.trim());
        }
    }

    if let Some(reply) = &state.chat_response {
        println!("\n{}", reply);
    }

    if let Some(plan) = &state.security_plan {
        let phases: Vec<&str> = plan.phases.iter().map(|p| p.as_str()).collect();
        println!("\nPlan: {} [{}]", plan.target, phases.join(", "));
        println!("Priority: {:?}, scope: {}", plan.priority, plan.scope);
    }

    if !state.phase_results.is_empty() {
        println!(
            "\n{:<24} {:<8} {:>9}  {:>8}  Tools",
            "Phase", "Status", "Duration", "Findings"
        );
        for result in &state.phase_results {
            let tools = if result.tools_used.is_empty() {
                "none".to_string()
            } else {
                result.tools_used.join(", ")
            };
            println!(
                "{:<24} {:<8} {:>8.2}s  {:>8}  {}",
                result.phase.title(),
                if result.success { "ok" } else { "failed" },
                result.duration,
                result.findings.len(),
                tools
            );
        }

        if verbose {
            for result in &state.phase_results {
                if result.findings.is_empty() {
                    continue;
                }
                println!("\n{}:", result.phase.title());
                for finding in &result.findings {
                    println!("  - {}", finding);
                }
            }
        }
    }

    if let Some(report) = &state.final_report {
        println!("\n=== Security Assessment Report ===\n{}", report);
    }
}

fn display_metrics(metrics: &Metrics) {
    println!(
        "\nModel calls: {} (~{} in / ~{} out tokens), tool calls: {} ({} failed)",
        metrics.model_calls,
        metrics.tokens.input,
        metrics.tokens.output,
        metrics.tool_calls,
        metrics.tool_failures
    );
}
