//! Tracks fact and verdict accesses during condition evaluation.

use statute_types::Provenance;

/// Accumulates the references one condition evaluation actually touched.
#[derive(Debug, Clone, Default)]
pub struct ProvenanceCollector {
    facts_used: Vec<String>,
    verdicts_used: Vec<String>,
}

impl ProvenanceCollector {
    pub fn new() -> ProvenanceCollector {
        ProvenanceCollector::default()
    }

    pub fn record_fact(&mut self, fact_id: &str) {
        if !self.facts_used.iter().any(|f| f == fact_id) {
            self.facts_used.push(fact_id.to_string());
        }
    }

    pub fn record_verdict(&mut self, verdict_type: &str) {
        if !self.verdicts_used.iter().any(|v| v == verdict_type) {
            self.verdicts_used.push(verdict_type.to_string());
        }
    }

    pub fn verdicts_used(&self) -> &[String] {
        &self.verdicts_used
    }

    /// Finalize. Fact ids are sorted; verdict types keep access order.
    pub fn into_provenance(mut self, rule: String, stratum: u32) -> Provenance {
        self.facts_used.sort();
        Provenance {
            rule,
            stratum,
            facts_used: self.facts_used,
            verdicts_used: self.verdicts_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduplicates_and_sorts_facts() {
        let mut c = ProvenanceCollector::new();
        c.record_fact("threshold");
        c.record_fact("balance");
        c.record_fact("threshold");
        let p = c.into_provenance("r".to_string(), 0);
        assert_eq!(p.facts_used, vec!["balance", "threshold"]);
    }

    #[test]
    fn verdicts_keep_access_order() {
        let mut c = ProvenanceCollector::new();
        c.record_verdict("b");
        c.record_verdict("a");
        c.record_verdict("b");
        let p = c.into_provenance("r".to_string(), 1);
        assert_eq!(p.verdicts_used, vec!["b", "a"]);
    }
}
