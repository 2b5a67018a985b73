use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tables a client may watch on the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Profiles,
    Skills,
    UserSkills,
    Projects,
    ProjectMembers,
    ProjectSkills,
    AnonymousPitches,
    PitchInterest,
    Messages,
    Badges,
    UserBadges,
}

/// Row-level operation class reported on the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// Event class of a subscription: `"*"` or a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventFilter {
    #[default]
    #[serde(rename = "*")]
    All,
    Insert,
    Update,
    Delete,
}

impl EventFilter {
    pub fn matches(self, op: ChangeOp) -> bool {
        match self {
            Self::All => true,
            Self::Insert => op == ChangeOp::Insert,
            Self::Update => op == ChangeOp::Update,
            Self::Delete => op == ChangeOp::Delete,
        }
    }
}

/// One watched (table, event class) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub table: Table,
    #[serde(default)]
    pub event: EventFilter,
}

impl Subscription {
    pub fn matches(&self, change: Change) -> bool {
        self.table == change.table && self.event.matches(change.op)
    }
}

/// A committed row-level change on a watched table.
///
/// Carries no row payload: consumers are expected to refetch whatever
/// queries they depend on when a watched table changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Change {
    pub table: Table,
    pub op: ChangeOp,
}

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid },

    /// A row changed on a subscribed table
    Change(Change),
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Replace this connection's watched set with a declarative list of
    /// (table, event class) pairs.
    Subscribe { subscriptions: Vec<Subscription> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_wire_format_accepts_wildcard_and_defaults() {
        let cmd: GatewayCommand = serde_json::from_str(
            r#"{"type":"Subscribe","data":{"subscriptions":[
                {"table":"messages","event":"*"},
                {"table":"user_skills","event":"insert"},
                {"table":"projects"}
            ]}}"#,
        )
        .unwrap();

        let GatewayCommand::Subscribe { subscriptions } = cmd else {
            panic!("expected Subscribe");
        };
        assert_eq!(subscriptions.len(), 3);
        assert_eq!(subscriptions[0].table, Table::Messages);
        assert_eq!(subscriptions[0].event, EventFilter::All);
        assert_eq!(subscriptions[1].event, EventFilter::Insert);
        // Omitted event class defaults to "*"
        assert_eq!(subscriptions[2].event, EventFilter::All);
    }

    #[test]
    fn change_event_wire_format() {
        let event = GatewayEvent::Change(Change {
            table: Table::AnonymousPitches,
            op: ChangeOp::Update,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"type":"Change","data":{"table":"anonymous_pitches","op":"update"}}"#
        );
    }

    #[test]
    fn event_filter_matching() {
        assert!(EventFilter::All.matches(ChangeOp::Delete));
        assert!(EventFilter::Insert.matches(ChangeOp::Insert));
        assert!(!EventFilter::Insert.matches(ChangeOp::Update));

        let sub = Subscription {
            table: Table::Messages,
            event: EventFilter::Insert,
        };
        assert!(sub.matches(Change {
            table: Table::Messages,
            op: ChangeOp::Insert,
        }));
        assert!(!sub.matches(Change {
            table: Table::Profiles,
            op: ChangeOp::Insert,
        }));
    }
}
