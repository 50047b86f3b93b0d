//! Out-of-band notifications from the worker.
//!
//! Everything the worker sends that is not a binary report arrives as a
//! control message. Only two are acknowledged by the controller; anything
//! else decodes to [`ControlMessage::Unknown`] and is ignored.
//!
//! Decoding reads `cmd` first and only then looks at `params`, so an
//! unrecognised name decodes to `Unknown` whatever its params carry, and
//! params sent alongside `worldReady` are ignored.

use crate::ids::EntityId;
use serde::{Deserialize, Serialize};

/// A control notification from worker to controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "params", try_from = "Envelope")]
pub enum ControlMessage {
    /// A body added with `addObject` now exists in the physics world.
    #[serde(rename = "objectReady")]
    ObjectReady(EntityId),
    /// The physics world finished initializing.
    #[serde(rename = "worldReady")]
    WorldReady,
    /// Any notification this controller does not handle.
    #[serde(rename = "unknown")]
    Unknown,
}

/// Undecoded `{ cmd, params }` pair.
#[derive(Deserialize)]
struct Envelope {
    cmd: String,
    #[serde(default)]
    params: serde_json::Value,
}

impl TryFrom<Envelope> for ControlMessage {
    type Error = serde_json::Error;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        match envelope.cmd.as_str() {
            "objectReady" => serde_json::from_value(envelope.params).map(Self::ObjectReady),
            "worldReady" => Ok(Self::WorldReady),
            _ => Ok(Self::Unknown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_ready_wire_form() {
        let message: ControlMessage =
            serde_json::from_str(r#"{"cmd":"objectReady","params":12}"#).unwrap();
        assert_eq!(message, ControlMessage::ObjectReady(EntityId::from_raw(12)));

        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(json, r#"{"cmd":"objectReady","params":12}"#);
    }

    #[test]
    fn test_object_ready_requires_id() {
        assert!(serde_json::from_str::<ControlMessage>(r#"{"cmd":"objectReady"}"#).is_err());
        assert!(
            serde_json::from_str::<ControlMessage>(r#"{"cmd":"objectReady","params":{"id":1}}"#)
                .is_err()
        );
    }

    #[test]
    fn test_world_ready_without_params() {
        let message: ControlMessage = serde_json::from_str(r#"{"cmd":"worldReady"}"#).unwrap();
        assert_eq!(message, ControlMessage::WorldReady);
    }

    #[test]
    fn test_world_ready_ignores_params() {
        let message: ControlMessage =
            serde_json::from_str(r#"{"cmd":"worldReady","params":{}}"#).unwrap();
        assert_eq!(message, ControlMessage::WorldReady);

        let message: ControlMessage =
            serde_json::from_str(r#"{"params":null,"cmd":"worldReady"}"#).unwrap();
        assert_eq!(message, ControlMessage::WorldReady);
    }

    #[test]
    fn test_unrecognised_command() {
        let message: ControlMessage = serde_json::from_str(r#"{"cmd":"vehicleReady"}"#).unwrap();
        assert_eq!(message, ControlMessage::Unknown);
    }

    #[test]
    fn test_unrecognised_command_with_params() {
        for json in [
            r#"{"cmd":"vehicle","params":{"id":3}}"#,
            r#"{"cmd":"constraints","params":[1,2,3]}"#,
            r#"{"params":"anything","cmd":"log"}"#,
        ] {
            let message: ControlMessage = serde_json::from_str(json).unwrap();
            assert_eq!(message, ControlMessage::Unknown, "{json}");
        }
    }

    #[test]
    fn test_missing_cmd_is_an_error() {
        assert!(serde_json::from_str::<ControlMessage>(r#"{"params":1}"#).is_err());
    }
}
