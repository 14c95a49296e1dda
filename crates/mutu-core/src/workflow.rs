//! Status transition engine shared by every workflow entity.
//!
//! Each entity's status enum implements [`Status`] with a static table of
//! allowed successors. Services call [`ensure_transition`] before mutating
//! anything, then [`require`] for entity-specific preconditions.

use std::fmt;

use crate::{Error, Result};

pub trait Status: Copy + Eq + fmt::Debug + fmt::Display + 'static {
    /// Entity name used in error messages and logs.
    const ENTITY: &'static str;

    /// Statuses reachable from `self` in one step.
    fn allowed_next(self) -> &'static [Self];

    /// Whether requesting the current status is accepted as a no-op.
    fn accepts_noop() -> bool {
        false
    }

    fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next().contains(&next)
    }

    fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }
}

/// Outcome of a legal transition check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Change,
    Noop,
}

pub fn ensure_transition<S: Status>(from: S, to: S) -> Result<Transition> {
    if from == to && S::accepts_noop() {
        return Ok(Transition::Noop);
    }
    if from.can_transition_to(to) {
        return Ok(Transition::Change);
    }
    let reason = if from.is_terminal() {
        format!("'{from}' is a terminal status")
    } else {
        let allowed: Vec<String> = from.allowed_next().iter().map(ToString::to_string).collect();
        format!("allowed next statuses are: {}", allowed.join(", "))
    };
    Err(invalid(from, to, reason))
}

/// Fails with `InvalidTransition` carrying `reason` unless `holds`.
pub fn require<S: Status>(from: S, to: S, holds: bool, reason: impl Into<String>) -> Result<()> {
    if holds {
        Ok(())
    } else {
        Err(invalid(from, to, reason))
    }
}

pub fn invalid<S: Status>(from: S, to: S, reason: impl Into<String>) -> Error {
    Error::InvalidTransition {
        entity: S::ENTITY,
        from: from.to_string(),
        to: to.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    string_enum! {
        enum Light {
            Red => "red",
            Green => "green",
            Off => "off",
        }
    }

    impl Status for Light {
        const ENTITY: &'static str = "Light";

        fn allowed_next(self) -> &'static [Self] {
            match self {
                Self::Red => &[Self::Green, Self::Off],
                Self::Green => &[Self::Red, Self::Off],
                Self::Off => &[],
            }
        }
    }

    #[test]
    fn listed_successor_is_a_change() {
        assert_eq!(
            ensure_transition(Light::Red, Light::Green).unwrap(),
            Transition::Change
        );
    }

    #[test]
    fn self_transition_rejected_without_noop() {
        let err = ensure_transition(Light::Red, Light::Red).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }

    #[test]
    fn terminal_status_names_itself() {
        let err = ensure_transition(Light::Off, Light::Red).unwrap_err();
        assert!(err.to_string().contains("terminal"));
    }

    #[test]
    fn require_reports_reason() {
        let err = require(Light::Red, Light::Green, false, "bulb missing").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Light cannot move from 'red' to 'green': bulb missing"
        );
    }
}
