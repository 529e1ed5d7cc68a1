//! Errors surfaced by the decision core.

/// Every way a turn can fail inside the agent.
///
/// None of these are retried: the session either ends with a distinguishable
/// signal or the error marks a broken internal contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    /// A required field is missing or has the wrong shape.
    #[error("malformed observation: {0}")]
    MalformedObservation(String),

    /// A direction outside north, south, east, west, up and down.
    #[error("unknown direction `{0}`")]
    UnknownDirection(String),

    /// Every reachable door has been tried and no way out was ever seen.
    #[error("explored {rooms} rooms without finding a way out of the castle")]
    ExhaustedWithNoExit { rooms: usize },

    /// Attempted to drop something the agent does not carry.
    #[error("cannot drop {kind} \"{name}\": it is not carried")]
    InventoryInconsistency { kind: &'static str, name: String },
}

impl AgentError {
    /// Whether the game sent something the agent could not understand.
    pub const fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            AgentError::MalformedObservation(_) | AgentError::UnknownDirection(_)
        )
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        AgentError::MalformedObservation(message.into())
    }
}
