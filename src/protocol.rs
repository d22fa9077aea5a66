//! Stream Deck plugin protocol messages
//!
//! Only the subset of the SDK events the plugin reacts to is modelled.
//! Everything else deserializes to [`InboundEvent::Unknown`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::PluginError;
use crate::state::ApplicationState;

/// What a sustained press does
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum LongPressAction {
    #[default]
    None,
    /// Close the Steam window (Steam keeps running in the tray)
    Minimize,
    /// Shut Steam down
    Terminate,
}

impl From<String> for LongPressAction {
    fn from(value: String) -> Self {
        // The property inspector writes "close"/"exit"
        match value.as_str() {
            "close" | "minimize" => Self::Minimize,
            "exit" | "terminate" => Self::Terminate,
            _ => Self::None,
        }
    }
}

impl<'de> Deserialize<'de> for LongPressAction {
    /// Anything that is not a recognised string (null, numbers, typos) is `None`
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(value) => Self::from(value),
            _ => Self::None,
        })
    }
}

impl From<LongPressAction> for String {
    fn from(action: LongPressAction) -> Self {
        match action {
            LongPressAction::None => "none",
            LongPressAction::Minimize => "close",
            LongPressAction::Terminate => "exit",
        }
        .to_string()
    }
}

/// Per-button settings edited in the property inspector
///
/// Keys the plugin does not know about are kept in `extra` so they survive
/// the round trip back to the inspector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextSettings {
    #[serde(
        default,
        rename = "alwaysBigPicture",
        alias = "alwaysEnterPresentationOnLaunch",
        deserialize_with = "lenient_bool"
    )]
    pub always_enter_presentation_on_launch: bool,

    #[serde(default, rename = "longPressAction")]
    pub long_press_action: LongPressAction,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload shared by the events that carry settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SettingsPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub settings: ContextSettings,
}

/// Read a flag the way the property inspector may have stored it
///
/// Accepts booleans, `"true"`/`"false"` strings and numbers. Null and any
/// other value read as `false`.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(flag) => flag,
        Value::String(text) => text.trim().eq_ignore_ascii_case("true") || text.trim() == "1",
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    })
}

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Events received from the Stream Deck application
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event")]
pub enum InboundEvent {
    #[serde(rename = "keyDown")]
    KeyDown {
        context: String,
        #[serde(default, deserialize_with = "null_as_default")]
        payload: SettingsPayload,
    },
    #[serde(rename = "keyUp")]
    KeyUp {
        context: String,
        #[serde(default, deserialize_with = "null_as_default")]
        payload: SettingsPayload,
    },
    #[serde(rename = "willAppear")]
    ContextAppeared {
        context: String,
        #[serde(default, deserialize_with = "null_as_default")]
        payload: SettingsPayload,
    },
    #[serde(rename = "willDisappear")]
    ContextDisappeared { context: String },
    #[serde(rename = "didReceiveSettings")]
    SettingsChanged {
        context: String,
        #[serde(default, deserialize_with = "null_as_default")]
        payload: SettingsPayload,
    },
    #[serde(rename = "propertyInspectorDidAppear")]
    PropertyInspectorAppeared { context: String },
    #[serde(rename = "propertyInspectorDidDisappear")]
    PropertyInspectorDisappeared { context: String },
    #[serde(rename = "sendToPlugin")]
    SendToPlugin {
        context: String,
        #[serde(default)]
        payload: Value,
    },
    #[serde(other)]
    Unknown,
}

impl InboundEvent {
    /// Parse one text frame from the socket
    pub fn parse(text: &str) -> Result<Self, PluginError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::KeyDown { .. } => "keyDown",
            Self::KeyUp { .. } => "keyUp",
            Self::ContextAppeared { .. } => "willAppear",
            Self::ContextDisappeared { .. } => "willDisappear",
            Self::SettingsChanged { .. } => "didReceiveSettings",
            Self::PropertyInspectorAppeared { .. } => "propertyInspectorDidAppear",
            Self::PropertyInspectorDisappeared { .. } => "propertyInspectorDidDisappear",
            Self::SendToPlugin { .. } => "sendToPlugin",
            Self::Unknown => "unknown",
        }
    }

    pub fn context(&self) -> Option<&str> {
        match self {
            Self::KeyDown { context, .. }
            | Self::KeyUp { context, .. }
            | Self::ContextAppeared { context, .. }
            | Self::ContextDisappeared { context }
            | Self::SettingsChanged { context, .. }
            | Self::PropertyInspectorAppeared { context }
            | Self::PropertyInspectorDisappeared { context }
            | Self::SendToPlugin { context, .. } => Some(context),
            Self::Unknown => None,
        }
    }
}

/// Body of a `setState` message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatePayload {
    pub state: u8,
}

/// Messages sent to the Stream Deck application
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum OutboundMessage {
    SetState {
        context: String,
        payload: StatePayload,
    },
    SendToPropertyInspector {
        context: String,
        payload: Value,
    },
}

impl OutboundMessage {
    pub fn set_state(context: impl Into<String>, state: ApplicationState) -> Self {
        Self::SetState {
            context: context.into(),
            payload: StatePayload {
                state: state.wire_value(),
            },
        }
    }

    /// Echo a context's settings back to its property inspector
    pub fn settings_to_inspector(
        context: impl Into<String>,
        settings: &ContextSettings,
    ) -> Result<Self, PluginError> {
        Ok(Self::SendToPropertyInspector {
            context: context.into(),
            payload: serde_json::to_value(settings)?,
        })
    }

    pub fn context(&self) -> &str {
        match self {
            Self::SetState { context, .. } | Self::SendToPropertyInspector { context, .. } => {
                context
            }
        }
    }

    pub fn to_json(&self) -> Result<String, PluginError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// First frame sent after the socket opens
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub event: String,
    pub uuid: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_key_down_with_settings() {
        let text = r#"{
            "action": "com.jase.steambp.toggle",
            "event": "keyDown",
            "context": "ctx-1",
            "device": "dev",
            "payload": {
                "settings": {"alwaysBigPicture": true, "longPressAction": "exit"},
                "coordinates": {"column": 1, "row": 0},
                "isInMultiAction": false
            }
        }"#;

        let event = InboundEvent::parse(text).unwrap();
        match event {
            InboundEvent::KeyDown { context, payload } => {
                assert_eq!(context, "ctx-1");
                assert!(payload.settings.always_enter_presentation_on_launch);
                assert_eq!(payload.settings.long_press_action, LongPressAction::Terminate);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_settings_defaults_and_aliases() {
        let settings: ContextSettings = serde_json::from_value(json!({})).unwrap();
        assert!(!settings.always_enter_presentation_on_launch);
        assert_eq!(settings.long_press_action, LongPressAction::None);

        let settings: ContextSettings = serde_json::from_value(json!({
            "alwaysEnterPresentationOnLaunch": true,
            "longPressAction": "minimize"
        }))
        .unwrap();
        assert!(settings.always_enter_presentation_on_launch);
        assert_eq!(settings.long_press_action, LongPressAction::Minimize);
    }

    #[test]
    fn test_unrecognised_long_press_action_is_none() {
        let settings: ContextSettings =
            serde_json::from_value(json!({"longPressAction": "explode"})).unwrap();
        assert_eq!(settings.long_press_action, LongPressAction::None);
    }

    #[test]
    fn test_unknown_settings_keys_survive_echo() {
        let settings: ContextSettings = serde_json::from_value(json!({
            "alwaysBigPicture": false,
            "longPressAction": "close",
            "theme": "dark"
        }))
        .unwrap();

        let msg = OutboundMessage::settings_to_inspector("ctx", &settings).unwrap();
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["event"], "sendToPropertyInspector");
        assert_eq!(value["payload"]["theme"], "dark");
        assert_eq!(value["payload"]["longPressAction"], "close");
        assert_eq!(value["payload"]["alwaysBigPicture"], false);
    }

    #[test]
    fn test_set_state_wire_format() {
        let msg = OutboundMessage::set_state("abc", ApplicationState::PresentationMode);
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"event": "setState", "context": "abc", "payload": {"state": 2}})
        );
    }

    #[test]
    fn test_unknown_event_is_tolerated() {
        let event = InboundEvent::parse(r#"{"event": "deviceDidConnect", "device": "x"}"#).unwrap();
        assert_eq!(event, InboundEvent::Unknown);
        assert_eq!(event.context(), None);
    }

    #[test]
    fn test_will_disappear_ignores_payload() {
        let event = InboundEvent::parse(
            r#"{"event": "willDisappear", "context": "c", "payload": {"settings": {}}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            InboundEvent::ContextDisappeared {
                context: "c".to_string()
            }
        );
    }

    #[test]
    fn test_string_flag_does_not_drop_key_down() {
        let event = InboundEvent::parse(
            r#"{"event": "keyDown", "context": "c", "payload": {"settings": {"alwaysBigPicture": "true"}}}"#,
        )
        .unwrap();
        match event {
            InboundEvent::KeyDown { payload, .. } => {
                assert!(payload.settings.always_enter_presentation_on_launch)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_lenient_flag_values() {
        for (raw, expected) in [
            (json!(true), true),
            (json!("TRUE"), true),
            (json!("false"), false),
            (json!(1), true),
            (json!(0), false),
            (json!(null), false),
            (json!({"nested": true}), false),
        ] {
            let settings: ContextSettings =
                serde_json::from_value(json!({ "alwaysBigPicture": raw.clone() })).unwrap();
            assert_eq!(
                settings.always_enter_presentation_on_launch, expected,
                "alwaysBigPicture = {}",
                raw
            );
        }
    }

    #[test]
    fn test_null_long_press_action_is_none() {
        let event = InboundEvent::parse(
            r#"{"event": "keyUp", "context": "c", "payload": {"settings": {"longPressAction": null}}}"#,
        )
        .unwrap();
        match event {
            InboundEvent::KeyUp { payload, .. } => {
                assert_eq!(payload.settings.long_press_action, LongPressAction::None)
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let settings: ContextSettings =
            serde_json::from_value(json!({"longPressAction": 3})).unwrap();
        assert_eq!(settings.long_press_action, LongPressAction::None);
    }

    #[test]
    fn test_null_settings_and_payload_use_defaults() {
        let event = InboundEvent::parse(
            r#"{"event": "willAppear", "context": "c", "payload": {"settings": null}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            InboundEvent::ContextAppeared {
                context: "c".to_string(),
                payload: SettingsPayload::default(),
            }
        );

        let event =
            InboundEvent::parse(r#"{"event": "didReceiveSettings", "context": "c", "payload": null}"#)
                .unwrap();
        assert_eq!(
            event,
            InboundEvent::SettingsChanged {
                context: "c".to_string(),
                payload: SettingsPayload::default(),
            }
        );
    }

    #[test]
    fn test_malformed_frame_is_an_error() {
        assert!(InboundEvent::parse("{not json").is_err());
        assert!(InboundEvent::parse(r#"{"event": "keyDown"}"#).is_err());
    }
}
