//! Approval gate: decides each approval request once and reports the outcome
//! to the server without blocking the stream.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use ask_protocol::{ApprovalDecision, ApprovalReporter, ApprovalRequest, DecisionPrompt};

use crate::tool_policy::{approval_preview, is_safe};

/// How one approval request was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateOutcome {
    pub decision: ApprovalDecision,
    /// A human was asked.
    pub prompted: bool,
    /// Settled without asking: auto-approve mode, a safe tool, or a repeat.
    pub automatic: bool,
}

impl GateOutcome {
    pub fn approved(&self) -> bool {
        self.decision.approved()
    }
}

pub struct ApprovalGate {
    auto_approve: bool,
    decided: HashMap<String, ApprovalDecision>,
    prompt: Box<dyn DecisionPrompt>,
    reporter: Arc<dyn ApprovalReporter>,
}

impl ApprovalGate {
    pub fn new(
        auto_approve: bool,
        prompt: Box<dyn DecisionPrompt>,
        reporter: Arc<dyn ApprovalReporter>,
    ) -> Self {
        Self {
            auto_approve,
            decided: HashMap::new(),
            prompt,
            reporter,
        }
    }

    /// Whether every request is currently approved without asking.
    pub fn is_auto_approving(&self) -> bool {
        self.auto_approve
    }

    /// Settles `request` and reports the decision.
    ///
    /// Blocks on the prompt when a human has to answer. A prompt that fails
    /// to read an answer denies. An "always" answer switches the gate to
    /// auto-approve for the rest of the run.
    pub fn resolve(&mut self, request: &ApprovalRequest) -> GateOutcome {
        let outcome = self.decide(request);
        self.decided
            .entry(request.call_id.clone())
            .or_insert(outcome.decision);
        self.reporter.report(&request.call_id, outcome.approved());
        outcome
    }

    fn decide(&mut self, request: &ApprovalRequest) -> GateOutcome {
        if let Some(previous) = self.decided.get(&request.call_id) {
            debug!(call_id = %request.call_id, "approval already decided; re-reporting");
            return GateOutcome {
                decision: *previous,
                prompted: false,
                automatic: true,
            };
        }

        if self.auto_approve || is_safe(&request.tool_name) {
            return GateOutcome {
                decision: ApprovalDecision::ApproveOnce,
                prompted: false,
                automatic: true,
            };
        }

        let preview = approval_preview(&request.tool_name, &request.args);
        let decision = match self.prompt.decide(request, preview.as_deref()) {
            Ok(decision) => decision,
            Err(err) => {
                warn!(call_id = %request.call_id, error = %err, "approval prompt failed; denying");
                ApprovalDecision::Deny
            }
        };
        if decision == ApprovalDecision::Always {
            self.auto_approve = true;
        }
        GateOutcome {
            decision,
            prompted: true,
            automatic: false,
        }
    }
}
