//! Phase-sequenced assessment workflow.
//!
//! `detect_intent` routes a request either to a single chat reply or through
//! plan → four phases → report. Model-call failures abort the run; tool
//! failures are recorded in the phase results and the run continues.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::{AgentConfig, IntentConfig};
use crate::decision::{DecisionStep, classify_intent, extract_target};
use crate::prompts::Prompts;
use crate::providers::LlmProvider;
use crate::state::session::truncate;
use crate::state::{
    Intent, IntentDecision, Phase, PhaseResult, SecurityPlan, ToolResult, UserInput, WorkflowState,
};
use crate::strategies::strategy_for;
use crate::tools::{PhaseContext, ToolInvoker, resolve_to_address};
use crate::{Error, Result};

/// Characters of tool output kept per finding
pub const FINDING_CHARS: usize = 200;

/// Branch taken after intent detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Chat,
    Plan,
}

/// Drives one [`WorkflowState`] from user input to chat reply or report
pub struct SecurityOrchestrator {
    decision: DecisionStep,
    prompts: Prompts,
    invoker: Arc<Mutex<ToolInvoker>>,
    intent: IntentConfig,
}

impl SecurityOrchestrator {
    pub fn new(provider: Arc<dyn LlmProvider>, invoker: ToolInvoker, config: &AgentConfig) -> Self {
        Self {
            decision: DecisionStep::new(provider),
            prompts: Prompts::default(),
            invoker: Arc::new(Mutex::new(invoker)),
            intent: config.intent.clone(),
        }
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Shared handle to the tool invoker
    pub fn invoker(&self) -> &Arc<Mutex<ToolInvoker>> {
        &self.invoker
    }

    /// Run the whole workflow for one request.
    ///
    /// Cancelling `cancel` stops the run at the next suspension point; the
    /// partial state comes back with `cancelled` set. Connections are closed
    /// on every exit path.
    pub async fn run(
        &self,
        user_input: UserInput,
        job_id: &str,
        cancel: CancellationToken,
    ) -> Result<WorkflowState> {
        let span = info_span!("workflow", job_id = %job_id);
        async move {
            let mut state = WorkflowState::new(user_input).with_job_id(job_id);
            info!(message = %state.user_input.message, "Workflow started");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.drive(&mut state) => Some(result),
            };

            self.invoker.lock().await.disconnect_all().await;

            match outcome {
                None => {
                    warn!(
                        phases_completed = state.phase_results.len(),
                        "Workflow cancelled"
                    );
                    state.cancelled = true;
                    Ok(state)
                }
                Some(Err(e)) => {
                    warn!("Workflow aborted: {}", e);
                    Err(e)
                }
                Some(Ok(())) => {
                    info!("Workflow finished");
                    Ok(state)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, state: &mut WorkflowState) -> Result<()> {
        self.detect_intent(state).await?;
        match Self::route_by_intent(state) {
            Route::Chat => self.chat_response(state).await,
            Route::Plan => {
                self.plan_security_test(state).await?;
                self.execute_phase(state).await?;
                self.generate_report(state).await
            }
        }
    }

    /// Classify the request and, for assessments, pick the target
    pub async fn detect_intent(&self, state: &mut WorkflowState) -> Result<()> {
        let message = state.user_input.message.clone();
        let prompt = self.prompts.intent.render(&[("message", &message)]);
        let reply = self.decision.ask(&self.prompts.system.prompt, &prompt).await?;

        let intent = classify_intent(&reply);
        let target = match intent {
            Intent::Chat => None,
            Intent::SecurityTesting => Some(extract_target(
                &reply,
                &message,
                state.user_input.target.as_deref(),
                &self.intent.default_target,
            )),
        };

        info!(?intent, target = ?target, "Intent detected");
        state.intent_decision = Some(IntentDecision {
            intent,
            confidence: self.intent.confidence,
            reasoning: reply,
            target,
        });
        Ok(())
    }

    /// Branch for the detected intent. A state without a decision gets a
    /// chat reply rather than a scan.
    pub fn route_by_intent(state: &WorkflowState) -> Route {
        match state.intent_decision.as_ref().map(|d| d.intent) {
            Some(Intent::SecurityTesting) => Route::Plan,
            Some(Intent::Chat) | None => Route::Chat,
        }
    }

    /// Answer a conversational request
    pub async fn chat_response(&self, state: &mut WorkflowState) -> Result<()> {
        let prompt = self
            .prompts
            .chat
            .render(&[("message", &state.user_input.message)]);
        let reply = self.decision.ask(&self.prompts.system.prompt, &prompt).await?;
        state.chat_response = Some(reply);
        Ok(())
    }

    /// Ask the model for planning notes and fix the plan to all four phases
    pub async fn plan_security_test(&self, state: &mut WorkflowState) -> Result<()> {
        let target = state
            .intent_decision
            .as_ref()
            .and_then(|d| d.target.clone())
            .unwrap_or_else(|| self.intent.default_target.clone());

        let prompt = self.prompts.plan.render(&[
            ("target", &target),
            ("message", &state.user_input.message),
        ]);
        let notes = self.decision.ask(&self.prompts.system.prompt, &prompt).await?;
        debug!(notes = %notes, "Planning notes");

        let plan = SecurityPlan::comprehensive(&target);
        info!(
            target = %plan.target,
            phases = plan.phases.len(),
            "Security plan created"
        );
        state.security_plan = Some(plan);
        Ok(())
    }

    /// Run every planned phase in order, appending one result per phase
    pub async fn execute_phase(&self, state: &mut WorkflowState) -> Result<()> {
        let plan = state
            .security_plan
            .clone()
            .ok_or_else(|| Error::Agent("No security plan to execute".into()))?;

        let resolved = resolve_to_address(&plan.target).await;
        if resolved.resolved {
            info!(target = %plan.target, address = %resolved.address, "Target resolved");
        } else {
            warn!(target = %plan.target, "Could not resolve target, using it as given");
        }

        let mut invoker = self.invoker.lock().await;
        invoker.connect_all().await;

        for phase in &plan.phases {
            let phase = *phase;
            let strategy = strategy_for(phase);

            let previous_findings = state.all_findings();
            debug!(
                guidance = %strategy.phase_prompt(&plan.target, &previous_findings),
                "Phase guidance"
            );
            let context = PhaseContext {
                previous_findings,
                domain: resolved.domain.clone(),
                address: resolved.address.clone(),
            };

            info!(phase = %phase, "Executing phase");
            let start = Instant::now();
            let results = invoker
                .execute_phase_operations(phase, &plan.target, &context)
                .await;
            let result = summarize_phase(phase, results, start.elapsed().as_secs_f64());

            info!(
                phase = %phase,
                duration = result.duration,
                tools_used = result.tools_used.len(),
                findings = result.findings.len(),
                "Phase completed"
            );
            debug!(
                review = %strategy.completion_prompt(&plan.target, &result.findings),
                "Phase review"
            );
            if let Some(error) = &result.error {
                state.errors.push(format!("{}: {}", phase, error));
            }
            state.phase_results.push(result);
            state.current_phase = Some(phase);
        }
        Ok(())
    }

    /// Write the final report, followed by the errors the phases hit
    pub async fn generate_report(&self, state: &mut WorkflowState) -> Result<()> {
        let target = state
            .security_plan
            .as_ref()
            .map(|p| p.target.clone())
            .unwrap_or_else(|| self.intent.default_target.clone());

        let findings = findings_by_phase(&state.phase_results);
        let prompt = self
            .prompts
            .report
            .render(&[("target", &target), ("findings", &findings)]);
        let mut report = self.decision.ask(&self.prompts.system.prompt, &prompt).await?;

        let errors = state.phase_errors();
        if !errors.is_empty() {
            report.push_str("\n\n## Errors encountered\n");
            for (phase, error) in errors {
                for line in error.lines() {
                    report.push_str(&format!("- {}: {}\n", phase.title(), line));
                }
            }
        }

        state.final_report = Some(report);
        Ok(())
    }
}

/// Fold a phase's tool results into its [`PhaseResult`].
///
/// Successful calls with output become `"<tool>: <output>"` findings;
/// failures are joined into the phase error.
pub fn summarize_phase(phase: Phase, results: Vec<ToolResult>, duration: f64) -> PhaseResult {
    let mut findings = Vec::new();
    let mut tools_used = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        if result.success {
            let output = result.output.trim();
            if !output.is_empty() {
                findings.push(format!(
                    "{}: {}",
                    result.tool_name,
                    truncate(output, FINDING_CHARS)
                ));
            }
            tools_used.push(result.tool_name);
        } else {
            errors.push(format!(
                "{}: {}",
                result.tool_name,
                result.error.as_deref().unwrap_or("unknown error")
            ));
        }
    }

    PhaseResult {
        phase,
        success: !findings.is_empty(),
        findings,
        tools_used,
        duration,
        error: (!errors.is_empty()).then(|| errors.join("\n")),
    }
}

fn findings_by_phase(results: &[PhaseResult]) -> String {
    let mut out = String::new();
    for result in results {
        let strategy = strategy_for(result.phase);
        out.push_str(&format!("### {}\n", result.phase.title()));
        out.push_str(&format!("Goals: {}\n", strategy.goals().join("; ")));
        out.push_str(&format!(
            "Success criteria: {}\n",
            strategy.success_criteria().join("; ")
        ));
        if result.findings.is_empty() {
            out.push_str("- no findings\n");
        }
        for finding in &result.findings {
            out.push_str(&format!("- {}\n", finding));
        }
        out.push('\n');
    }
    out
}

impl std::fmt::Debug for SecurityOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityOrchestrator")
            .field("decision", &self.decision)
            .field("intent", &self.intent)
            .finish()
    }
}
