use serde::{Deserialize, Serialize};

use crate::db::{Message, NewMessage, Profile};

/// A frame sent by a client: `{"event": "...", "data": ...}`.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    #[serde(alias = "join-profile")]
    Join(JoinRequest),
    #[serde(alias = "send-message")]
    Send(NewMessage),
}

/// A frame sent to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    HistoryLoaded(Vec<Message>),
    MessageReceived(Message),
    SendFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "JoinPayload")]
pub struct JoinRequest {
    pub profile: Profile,
    pub user_name: Option<String>,
}

/// Older clients join with a bare profile string.
#[derive(Deserialize)]
#[serde(untagged)]
enum JoinPayload {
    Bare(Profile),
    Full {
        profile: Profile,
        #[serde(default, rename = "userName")]
        user_name: Option<String>,
    },
}

impl From<JoinPayload> for JoinRequest {
    fn from(payload: JoinPayload) -> Self {
        match payload {
            JoinPayload::Bare(profile) => JoinRequest { profile, user_name: None },
            JoinPayload::Full { profile, user_name } => JoinRequest {
                profile,
                user_name: normalize_user_name(user_name),
            },
        }
    }
}

/// Blank names count as no name.
pub(crate) fn normalize_user_name(user_name: Option<String>) -> Option<String> {
    user_name.filter(|name| !name.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: serde_json::Value) -> ClientEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn join_accepts_bare_profile() {
        let ClientEvent::Join(req) = parse(json!({ "event": "join", "data": "profile1" })) else {
            panic!("expected join");
        };
        assert_eq!(req, JoinRequest { profile: Profile::Profile1, user_name: None });
    }

    #[test]
    fn join_accepts_object() {
        let ClientEvent::Join(req) = parse(json!({
            "event": "join",
            "data": { "profile": "profile2", "userName": "alice" }
        })) else {
            panic!("expected join");
        };
        assert_eq!(req, JoinRequest { profile: Profile::Profile2, user_name: Some("alice".to_owned()) });
    }

    #[test]
    fn join_drops_blank_user_name() {
        let ClientEvent::Join(req) = parse(json!({
            "event": "join",
            "data": { "profile": "profile2", "userName": "  " }
        })) else {
            panic!("expected join");
        };
        assert_eq!(req.user_name, None);

        let ClientEvent::Join(req) = parse(json!({
            "event": "join",
            "data": { "profile": "profile2", "userName": null }
        })) else {
            panic!("expected join");
        };
        assert_eq!(req.user_name, None);
    }

    #[test]
    fn join_rejects_unknown_profile() {
        let frame = json!({ "event": "join", "data": "profile9" });
        assert!(serde_json::from_value::<ClientEvent>(frame).is_err());
    }

    #[test]
    fn send_accepts_legacy_field_names() {
        let ClientEvent::Send(msg) = parse(json!({
            "event": "send",
            "data": { "profile": "profile1", "message": "hi", "time": "3:04 PM" }
        })) else {
            panic!("expected send");
        };
        assert_eq!(msg.text, "hi");
        assert_eq!(msg.display_time, "3:04 PM");
        assert_eq!(msg.user_name, None);
    }

    #[test]
    fn legacy_event_names_are_accepted() {
        let ClientEvent::Join(req) = parse(json!({
            "event": "join-profile",
            "data": { "profile": "profile2", "userName": "alice" }
        })) else {
            panic!("expected join");
        };
        assert_eq!(req.user_name.as_deref(), Some("alice"));

        let ClientEvent::Send(msg) = parse(json!({
            "event": "send-message",
            "data": { "profile": "profile2", "message": "hey", "time": "3:05 PM", "userName": "alice" }
        })) else {
            panic!("expected send");
        };
        assert_eq!(msg.text, "hey");
        assert_eq!(msg.display_time, "3:05 PM");
    }

    #[test]
    fn server_events_use_wire_names() {
        let msg = Message {
            id: 7,
            profile: Profile::Profile2,
            text: "hi".to_owned(),
            display_time: "3:04 PM".to_owned(),
            user_name: None,
            timestamp: 1_000,
        };

        assert_eq!(
            serde_json::to_value(ServerEvent::MessageReceived(msg.clone())).unwrap(),
            json!({
                "event": "message-received",
                "data": {
                    "id": 7,
                    "profile": "profile2",
                    "text": "hi",
                    "displayTime": "3:04 PM",
                    "userName": null,
                    "timestamp": 1000
                }
            })
        );
        assert_eq!(
            serde_json::to_value(ServerEvent::HistoryLoaded(vec![msg])).unwrap()["event"],
            "history-loaded"
        );
        assert_eq!(
            serde_json::to_value(ServerEvent::SendFailed { reason: "nope".to_owned() }).unwrap(),
            json!({ "event": "send-failed", "data": { "reason": "nope" } })
        );
    }
}
