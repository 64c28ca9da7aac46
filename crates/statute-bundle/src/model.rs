//! The in-memory bundle model.
//!
//! Built once by the loader, immutable thereafter. All lookups go through
//! indices resolved at load time; evaluation never walks raw JSON.

use std::collections::BTreeMap;

use statute_types::{TypeSpec, Value};

/// Source position of a construct, used only for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoc {
    pub file: String,
    pub line: u64,
}

/// A declared external input.
#[derive(Debug, Clone)]
pub struct FactDecl {
    pub id: String,
    pub source_system: String,
    pub source_field: String,
    pub spec: TypeSpec,
    pub default: Option<Value>,
    pub loc: SourceLoc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: String,
    pub to: String,
}

/// A finite state machine over named states.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: String,
    pub states: Vec<String>,
    pub initial: String,
    pub transitions: Vec<Transition>,
    pub loc: SourceLoc,
}

impl Entity {
    /// Target states reachable from the given state.
    pub fn transitions_from(&self, state: &str) -> Vec<String> {
        self.transitions
            .iter()
            .filter(|t| t.from == state)
            .map(|t| t.to.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn parse(s: &str) -> Option<CompareOp> {
        match s {
            "=" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::Ne),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// A condition expression tree. Closed grammar; logical nodes evaluate to
/// Bool, references and literals to their declared value type.
#[derive(Debug, Clone)]
pub enum Predicate {
    FactRef(String),
    VerdictPresent(String),
    /// The payload of a previously produced verdict.
    VerdictValue(String),
    Literal {
        value: Value,
        spec: TypeSpec,
    },
    Compare {
        left: Box<Predicate>,
        op: CompareOp,
        right: Box<Predicate>,
    },
    And {
        left: Box<Predicate>,
        right: Box<Predicate>,
    },
    Or {
        left: Box<Predicate>,
        right: Box<Predicate>,
    },
    Not {
        operand: Box<Predicate>,
    },
}

impl Predicate {
    /// Verdict types this expression refers to, deduplicated in first-use
    /// order.
    pub fn verdict_refs(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_verdict_refs(&mut out);
        out
    }

    fn collect_verdict_refs(&self, out: &mut Vec<String>) {
        match self {
            Predicate::VerdictPresent(id) | Predicate::VerdictValue(id) => {
                if !out.contains(id) {
                    out.push(id.clone());
                }
            }
            Predicate::Compare { left, right, .. }
            | Predicate::And { left, right }
            | Predicate::Or { left, right } => {
                left.collect_verdict_refs(out);
                right.collect_verdict_refs(out);
            }
            Predicate::Not { operand } => operand.collect_verdict_refs(out),
            Predicate::FactRef(_) | Predicate::Literal { .. } => {}
        }
    }

    /// Fact ids this expression refers to, deduplicated in first-use order.
    pub fn fact_refs(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_fact_refs(&mut out);
        out
    }

    fn collect_fact_refs(&self, out: &mut Vec<String>) {
        match self {
            Predicate::FactRef(id) => {
                if !out.contains(id) {
                    out.push(id.clone());
                }
            }
            Predicate::Compare { left, right, .. }
            | Predicate::And { left, right }
            | Predicate::Or { left, right } => {
                left.collect_fact_refs(out);
                right.collect_fact_refs(out);
            }
            Predicate::Not { operand } => operand.collect_fact_refs(out),
            Predicate::VerdictPresent(_) | Predicate::VerdictValue(_) | Predicate::Literal { .. } => {}
        }
    }
}

/// A verdict-producing rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub stratum: u32,
    pub condition: Predicate,
    pub verdict_type: String,
    pub payload_type: TypeSpec,
    pub payload: Value,
    pub loc: SourceLoc,
}

/// One entity transition an operation applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effect {
    pub entity_id: String,
    pub from: String,
    pub to: String,
}

/// A persona-gated state transition.
#[derive(Debug, Clone)]
pub struct Operation {
    pub id: String,
    pub allowed_personas: Vec<String>,
    pub precondition: Predicate,
    pub effects: Vec<Effect>,
    pub error_contract: Vec<String>,
    pub loc: SourceLoc,
}

/// Where control goes after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepTarget {
    /// Ends the flow with this outcome label.
    Terminal(String),
    /// Index into the owning flow's step arena.
    Next(usize),
}

/// A pre-resolved operation step.
#[derive(Debug, Clone)]
pub struct Step {
    pub id: String,
    pub operation: String,
    pub persona: String,
    pub on_success: StepTarget,
    pub on_failure: StepTarget,
}

/// A flow with its step graph resolved to arena indices.
#[derive(Debug, Clone)]
pub struct Flow {
    pub id: String,
    pub snapshot: String,
    pub entry: usize,
    pub steps: Vec<Step>,
    pub loc: SourceLoc,
}

/// Rules of one dependency layer, as indices into `Bundle::rules` in
/// declaration order.
#[derive(Debug, Clone)]
pub struct Stratum {
    pub number: u32,
    pub rules: Vec<usize>,
}

/// An immutable, validated, indexed bundle.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub id: String,
    pub tenor: String,
    pub tenor_version: String,
    pub facts: BTreeMap<String, FactDecl>,
    pub entities: BTreeMap<String, Entity>,
    pub rules: Vec<Rule>,
    /// Ascending stratum order, precomputed at load.
    pub strata: Vec<Stratum>,
    pub operations: BTreeMap<String, Operation>,
    /// Declaration order; action spaces iterate flows in this order.
    pub flows: Vec<Flow>,
    pub personas: Vec<String>,
    pub(crate) flow_index: BTreeMap<String, usize>,
}

impl Bundle {
    pub fn flow(&self, flow_id: &str) -> Option<&Flow> {
        self.flow_index.get(flow_id).map(|&i| &self.flows[i])
    }

    /// Stratum of the given rule id, if declared.
    pub fn rule_stratum(&self, rule_id: &str) -> Option<u32> {
        self.rules.iter().find(|r| r.id == rule_id).map(|r| r.stratum)
    }

    /// Strata of all rules producing the given verdict type.
    pub fn producer_strata(&self, verdict_type: &str) -> Vec<u32> {
        self.rules
            .iter()
            .filter(|r| r.verdict_type == verdict_type)
            .map(|r| r.stratum)
            .collect()
    }
}
