//! Report shapes returned to callers: action spaces and flow results.
//!
//! These are serde DTOs; their JSON form is the cross-binding contract,
//! so field names here are load-bearing.

use serde::{Deserialize, Serialize};

/// Flattened view of one verdict for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictSummary {
    pub verdict_type: String,
    pub payload: serde_json::Value,
    pub producing_rule: String,
    pub stratum: u32,
}

/// Snapshot of an entity an action would touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub entity_id: String,
    pub current_state: String,
    pub possible_transitions: Vec<String>,
}

/// A flow the persona can execute right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub flow_id: String,
    pub persona_id: String,
    pub entry_operation_id: String,
    /// The verdicts that satisfied the entry operation's precondition.
    pub enabling_verdicts: Vec<VerdictSummary>,
    pub affected_entities: Vec<EntitySummary>,
    pub description: String,
}

/// Why a flow is blocked. Exactly one reason per blocked action, the
/// first gate that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BlockedReason {
    PersonaNotAuthorized,
    PreconditionNotMet {
        missing_verdicts: Vec<String>,
    },
    EntityNotInSourceState {
        entity_id: String,
        current_state: String,
        required_state: String,
    },
}

/// A flow that exists but is not currently executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedAction {
    pub flow_id: String,
    pub reason: BlockedReason,
}

/// Everything a persona can and cannot do at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpace {
    pub persona_id: String,
    pub current_verdicts: Vec<VerdictSummary>,
    pub actions: Vec<Action>,
    pub blocked_actions: Vec<BlockedAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Failure,
}

/// Record of one step taken during a flow simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub operation_id: String,
    pub status: StepStatus,
    /// On failure, which gate blocked the step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A hypothetical entity transition the flow would apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStateChange {
    pub entity_id: String,
    pub from: String,
    pub to: String,
}

/// Outcome of one simulated flow execution. Entirely hypothetical:
/// nothing the caller owns is mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowResult {
    pub flow_id: String,
    pub persona: String,
    pub outcome: String,
    pub steps: Vec<StepResult>,
    pub would_transition: Vec<EntityStateChange>,
}
