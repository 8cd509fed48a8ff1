//! Declared inputs and outputs of extraction stages, and an order that satisfies them.

use crate::error::ConfigError;
use crate::theme::ThemeKey;
use rustc_hash::FxHashSet;

/// What a stage reads, writes, and asks to be run after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    pub name: String,
    pub inputs: Vec<ThemeKey>,
    pub outputs: Vec<ThemeKey>,
    pub follow_ups: Vec<StageSpec>,
}

impl StageSpec {
    /// This stage followed by its follow-ups, depth first.
    pub fn flatten(&self) -> Vec<&StageSpec> {
        let mut out = vec![self];
        for follow_up in &self.follow_ups {
            out.extend(follow_up.flatten());
        }
        out
    }
}

/// Orders stages (follow-ups included) so that every input is either available
/// beforehand or produced by an earlier stage. Ties keep declaration order.
pub fn resolve_order<'a>(
    stages: &'a [StageSpec],
    available: impl Fn(&ThemeKey) -> bool,
) -> Result<Vec<&'a StageSpec>, ConfigError> {
    let mut pending: Vec<&StageSpec> = stages.iter().flat_map(StageSpec::flatten).collect();
    let mut produced: FxHashSet<&ThemeKey> = FxHashSet::default();
    let mut order = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let ready = pending.iter().position(|stage| {
            stage
                .inputs
                .iter()
                .all(|input| produced.contains(input) || available(input))
        });

        let Some(index) = ready else {
            let mut missing = Vec::new();
            for stage in &pending {
                for input in &stage.inputs {
                    if !produced.contains(input) && !available(input) {
                        missing.push(format!("{} (needed by {})", input, stage.name));
                    }
                }
            }
            return Err(ConfigError::UnsatisfiedInputs(missing.join(", ")));
        };

        let stage = pending.remove(index);
        produced.extend(stage.outputs.iter());
        order.push(stage);
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> ThemeKey {
        ThemeKey::new(name)
    }

    fn stage(name: &str, inputs: &[&str], outputs: &[&str]) -> StageSpec {
        StageSpec {
            name: name.to_string(),
            inputs: inputs.iter().map(|n| key(n)).collect(),
            outputs: outputs.iter().map(|n| key(n)).collect(),
            follow_ups: Vec::new(),
        }
    }

    fn names(order: &[&StageSpec]) -> Vec<String> {
        order.iter().map(|s| s.name.clone()).collect()
    }

    #[test]
    fn flatten_includes_follow_ups() {
        let mut parent = stage("extract", &["a"], &["b"]);
        parent.follow_ups.push(stage("translate", &["b"], &["c"]));
        let flat: Vec<_> = parent.flatten().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(flat, vec!["extract", "translate"]);
    }

    #[test]
    fn orders_by_produced_inputs() {
        let stages = vec![
            stage("second", &["mid"], &["out"]),
            stage("first", &["raw"], &["mid"]),
        ];
        let order = resolve_order(&stages, |k| k.name() == "raw").unwrap();
        assert_eq!(names(&order), vec!["first", "second"]);
    }

    #[test]
    fn follow_up_runs_after_parent() {
        let mut parent = stage("extract", &["patterns"], &["needsTranslation"]);
        parent
            .follow_ups
            .push(stage("translate", &["needsTranslation", "dict"], &["final"]));
        let stages = vec![parent];
        let order = resolve_order(&stages, |k| ["patterns", "dict"].contains(&k.name())).unwrap();
        assert_eq!(names(&order), vec!["extract", "translate"]);
    }

    #[test]
    fn keeps_declaration_order_for_independent_stages() {
        let stages = vec![stage("b", &[], &["x"]), stage("a", &[], &["y"])];
        let order = resolve_order(&stages, |_| false).unwrap();
        assert_eq!(names(&order), vec!["b", "a"]);
    }

    #[test]
    fn reports_missing_inputs() {
        let stages = vec![stage("extract", &["patterns", "nouns"], &["ids"])];
        let err = resolve_order(&stages, |k| k.name() == "patterns").unwrap_err();
        match err {
            ConfigError::UnsatisfiedInputs(msg) => {
                assert!(msg.contains("nouns"));
                assert!(msg.contains("extract"));
                assert!(!msg.contains("patterns"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn cycles_are_unsatisfiable() {
        let stages = vec![stage("a", &["y"], &["x"]), stage("b", &["x"], &["y"])];
        assert!(resolve_order(&stages, |_| false).is_err());
    }
}
