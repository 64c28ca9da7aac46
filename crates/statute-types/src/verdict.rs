//! Verdicts and their provenance.

use crate::value::Value;

/// Why a verdict holds: the producing rule, its stratum, and the exact
/// facts and prior verdicts its condition consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub rule: String,
    pub stratum: u32,
    /// Fact ids consulted by the condition, sorted, deduplicated.
    pub facts_used: Vec<String>,
    /// Verdict types consulted, deduplicated in first-use order.
    pub verdicts_used: Vec<String>,
}

/// One derived verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictInstance {
    pub verdict_type: String,
    pub payload: Value,
    pub provenance: Provenance,
}

/// The verdicts derived by one evaluating call, in derivation order
/// (ascending stratum, declaration order within a stratum).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerdictSet {
    verdicts: Vec<VerdictInstance>,
}

impl VerdictSet {
    pub fn new() -> VerdictSet {
        VerdictSet::default()
    }

    pub fn push(&mut self, verdict: VerdictInstance) {
        self.verdicts.push(verdict);
    }

    pub fn has_verdict(&self, verdict_type: &str) -> bool {
        self.verdicts.iter().any(|v| v.verdict_type == verdict_type)
    }

    /// First instance of the given type, if any rule produced it.
    pub fn get_verdict(&self, verdict_type: &str) -> Option<&VerdictInstance> {
        self.verdicts.iter().find(|v| v.verdict_type == verdict_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VerdictInstance> {
        self.verdicts.iter()
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    /// Canonical JSON rendering of the whole set.
    pub fn to_json(&self) -> serde_json::Value {
        let verdicts: Vec<serde_json::Value> = self
            .verdicts
            .iter()
            .map(|v| {
                serde_json::json!({
                    "type": v.verdict_type,
                    "payload": v.payload.to_json(),
                    "provenance": {
                        "rule": v.provenance.rule,
                        "stratum": v.provenance.stratum,
                        "facts_used": v.provenance.facts_used,
                        "verdicts_used": v.provenance.verdicts_used,
                    },
                })
            })
            .collect();
        serde_json::json!({ "verdicts": verdicts })
    }
}

impl<'a> IntoIterator for &'a VerdictSet {
    type Item = &'a VerdictInstance;
    type IntoIter = std::slice::Iter<'a, VerdictInstance>;

    fn into_iter(self) -> Self::IntoIter {
        self.verdicts.iter()
    }
}
