//! Validated status transitions.
//!
//! Status enums (subscription, transaction) implement [`StateMachine`] to
//! declare which transitions are legal. `transition_to` is the only way
//! aggregates change status, so an illegal edge surfaces as a
//! [`ValidationError`] instead of silently corrupting state.

use super::ValidationError;

pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Whether the edge `self -> target` exists in the machine.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// All states reachable in one step from `self`.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Validated transition. Fails with `InvalidFormat` on an illegal edge.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if !self.can_transition_to(&target) {
            return Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ));
        }
        Ok(target)
    }

    /// A state with no outgoing edges.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
