//! State machine trait for ordered lifecycle positions.
//!
//! Consultation stages implement this so every stage move, forward or
//! backward, goes through one validated path.

use super::ValidationError;

/// Trait for values that represent positions in a state machine.
///
/// Implementors declare which targets are reachable; callers get a
/// validated `transition_to` and `is_terminal` for free.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if a move from self to target is allowed.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all allowed targets from the current position.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs the move with validation.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if the current position has no outgoing moves.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Ticket {
        Open,
        Answered,
        Closed,
    }

    impl StateMachine for Ticket {
        fn can_transition_to(&self, target: &Self) -> bool {
            self.valid_transitions().contains(target)
        }

        fn valid_transitions(&self) -> Vec<Self> {
            match self {
                Ticket::Open => vec![Ticket::Answered, Ticket::Closed],
                Ticket::Answered => vec![Ticket::Open, Ticket::Closed],
                Ticket::Closed => vec![],
            }
        }
    }

    #[test]
    fn allowed_move_returns_target() {
        assert_eq!(Ticket::Open.transition_to(Ticket::Answered), Ok(Ticket::Answered));
    }

    #[test]
    fn disallowed_move_is_a_validation_error() {
        let err = Ticket::Closed.transition_to(Ticket::Open).unwrap_err();
        assert!(err.to_string().contains("Cannot transition from Closed to Open"));
    }

    #[test]
    fn terminal_means_no_outgoing_moves() {
        assert!(Ticket::Closed.is_terminal());
        assert!(!Ticket::Answered.is_terminal());
    }
}
