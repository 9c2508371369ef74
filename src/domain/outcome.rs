/// Result of evaluating a single rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleVerdict {
    Passed,
    Violated,
    /// Evaluation failed; how this counts depends on the error policy.
    Errored,
}

/// Aggregated result of validating one document.
///
/// Built by folding per-rule verdicts. Two partial outcomes combine with
/// [`ValidationOutcome::merge`], which ANDs the flags and concatenates the
/// violated rule names, so any grouping or order of rules gives the same
/// flag and the same set of names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub violated_rules: Vec<String>,
    /// Rules that produced a verdict, including errored ones
    pub evaluated: usize,
    /// Rules whose evaluation failed
    pub errored: usize,
}

impl ValidationOutcome {
    /// Identity element for [`merge`](Self::merge).
    pub fn new() -> Self {
        ValidationOutcome {
            passed: true,
            violated_rules: Vec::new(),
            evaluated: 0,
            errored: 0,
        }
    }

    /// Outcome of a single rule.
    ///
    /// `errored_as_violation` selects whether an errored rule fails the
    /// document or is left out of both tallies.
    pub fn from_verdict(rule_name: &str, verdict: RuleVerdict, errored_as_violation: bool) -> Self {
        let mut outcome = ValidationOutcome::new();
        outcome.record(rule_name, verdict, errored_as_violation);
        outcome
    }

    /// Fold one rule verdict into this outcome.
    pub fn record(&mut self, rule_name: &str, verdict: RuleVerdict, errored_as_violation: bool) {
        self.evaluated += 1;
        match verdict {
            RuleVerdict::Passed => {}
            RuleVerdict::Violated => self.violate(rule_name),
            RuleVerdict::Errored => {
                self.errored += 1;
                if errored_as_violation {
                    self.violate(rule_name);
                }
            }
        }
    }

    /// Combine two partial outcomes.
    pub fn merge(mut self, other: ValidationOutcome) -> Self {
        self.passed = self.passed && other.passed;
        self.violated_rules.extend(other.violated_rules);
        self.evaluated += other.evaluated;
        self.errored += other.errored;
        self
    }

    /// Violated rule names in sorted order, for order-independent comparison.
    pub fn sorted_violations(&self) -> Vec<String> {
        let mut names = self.violated_rules.clone();
        names.sort();
        names
    }

    fn violate(&mut self, rule_name: &str) {
        self.passed = false;
        self.violated_rules.push(rule_name.to_string());
    }
}

impl Default for ValidationOutcome {
    fn default() -> Self {
        ValidationOutcome::new()
    }
}
