//! Domain events emitted by the ledger, in operation order.

use serde::{Deserialize, Serialize};

use crate::types::{Amount, Days, Identity, PositionId, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A position was opened, by a fresh stake or by a re-stake.
    Staked {
        caller: Identity,
        id: PositionId,
        amount: Amount,
        period: Days,
        start_time: Timestamp,
    },
    /// A position was closed by a withdrawal. Fields describe the closed
    /// position, not any remainder opened in its place.
    Withdrawn {
        caller: Identity,
        id: PositionId,
        staked_amount: Amount,
        withdraw_amount: Amount,
        period: Days,
        start_time: Timestamp,
        end_time: Timestamp,
    },
    AdminWithdrawn {
        admin: Identity,
        amount: Amount,
    },
}

impl LedgerEvent {
    pub fn caller(&self) -> &Identity {
        match self {
            Self::Staked { caller, .. } | Self::Withdrawn { caller, .. } => caller,
            Self::AdminWithdrawn { admin, .. } => admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staked_serializes_with_event_tag() {
        let ev = LedgerEvent::Staked {
            caller: Identity::from("alice"),
            id: 1,
            amount: 1_000,
            period: 30,
            start_time: 0,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "staked");
        assert_eq!(json["caller"], "alice");
        assert_eq!(json["period"], 30);
    }

    #[test]
    fn caller_accessor() {
        let ev = LedgerEvent::AdminWithdrawn {
            admin: Identity::from("root"),
            amount: 5,
        };
        assert_eq!(ev.caller().as_str(), "root");
    }
}
