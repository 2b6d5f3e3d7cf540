//! In-memory action database
//!
//! Holds the stroke templates loaded from configuration. Bindings carry an
//! optional window class; lookups consider the global bindings plus those of
//! the current class, and a class-specific match beats a global one.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::{Action, ActionStore, Ranking};
use crate::gesture::{ButtonId, Comparator, Comparison, Stroke};

/// A stroke template bound to an action
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Display name
    pub name: String,
    /// Window class the binding is limited to
    pub app: Option<String>,
    /// Template
    pub stroke: Stroke,
    /// What to do on a match
    pub action: Action,
}

/// Template store backed by a `Vec`
#[derive(Debug, Clone)]
pub struct ActionDb {
    bindings: Vec<Binding>,
    comparator: Comparator,
}

#[derive(Clone, Copy)]
struct Candidate<'a> {
    binding: &'a Binding,
    score: f64,
}

impl<'a> Candidate<'a> {
    fn beats(&self, other: &Option<Candidate<'a>>) -> bool {
        match other {
            None => true,
            Some(other) => match (self.binding.app.is_some(), other.binding.app.is_some()) {
                (true, false) => true,
                (false, true) => false,
                _ => self.score > other.score,
            },
        }
    }
}

impl ActionDb {
    /// Empty database for the given default gesture button
    pub fn new(default_button: ButtonId) -> Self {
        Self {
            bindings: Vec::new(),
            comparator: Comparator::new(default_button),
        }
    }

    /// Add a binding. The template's trigger is normalised.
    pub fn add(&mut self, mut binding: Binding) {
        binding.stroke = binding.stroke.normalized(self.comparator.default_button());
        self.bindings.push(binding);
    }

    /// All bindings
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// No bindings
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn applicable<'a>(&'a self, class: Option<&'a str>) -> impl Iterator<Item = &'a Binding> + 'a {
        self.bindings
            .iter()
            .filter(move |b| b.app.is_none() || b.app.as_deref() == class)
    }

    fn score(&self, stroke: &Stroke, binding: &Binding) -> Comparison {
        let result = self.comparator.compare(stroke, &binding.stroke);
        trace!("{}: {:?} {:.3}", binding.name, result.outcome, result.score);
        result
    }
}

impl ActionStore for ActionDb {
    fn handle(&self, stroke: &Stroke, window_class: Option<&str>) -> (Option<Action>, Ranking) {
        let stroke = stroke.normalized(self.comparator.default_button());
        let mut ranking = Ranking::default();
        let mut best: Option<Candidate<'_>> = None;

        for binding in self.applicable(window_class) {
            let result = self.score(&stroke, binding);
            ranking.push(&binding.name, result.outcome, result.score);
            if !result.is_match() {
                continue;
            }
            let candidate = Candidate {
                binding,
                score: result.score,
            };
            if candidate.beats(&best) {
                best = Some(candidate);
            }
        }
        ranking.finish();

        let action = match best {
            Some(c) => {
                ranking.best = Some(c.binding.name.clone());
                ranking.best_score = c.score;
                Some(c.binding.action.clone())
            }
            None if stroke.is_trivial() && stroke.completion() == 0 => Some(Action::click()),
            None => None,
        };
        debug!("Ranking: {}", ranking);
        (action, ranking)
    }

    fn handle_advanced(
        &self,
        stroke: &Stroke,
        window_class: Option<&str>,
        b1: ButtonId,
        b2: ButtonId,
    ) -> (BTreeMap<ButtonId, Action>, BTreeMap<ButtonId, Ranking>) {
        let stroke = stroke.normalized(self.comparator.default_button());
        let mut rankings: BTreeMap<ButtonId, Ranking> = BTreeMap::new();
        let mut best: BTreeMap<ButtonId, Candidate<'_>> = BTreeMap::new();

        for binding in self.applicable(window_class) {
            let completion = binding.stroke.completion();
            if completion == 0 && !stroke.is_timeout() {
                continue;
            }
            let key = if completion == b1 { b2 } else { completion };
            let result = self.score(&stroke.with_completion(completion), binding);
            rankings
                .entry(key)
                .or_default()
                .push(&binding.name, result.outcome, result.score);
            if !result.is_match() {
                continue;
            }
            let candidate = Candidate {
                binding,
                score: result.score,
            };
            if candidate.beats(&best.get(&key).copied()) {
                best.insert(key, candidate);
            }
        }

        let mut actions = BTreeMap::new();
        for (key, ranking) in rankings.iter_mut() {
            ranking.finish();
            if let Some(c) = best.get(key) {
                ranking.best = Some(c.binding.name.clone());
                ranking.best_score = c.score;
                actions.insert(*key, c.binding.action.clone());
            }
            debug!("Ranking for button {}: {}", key, ranking);
        }
        (actions, rankings)
    }
}
