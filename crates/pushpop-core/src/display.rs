//! Typed view of a popup's `settings` document: placement, animation and the
//! teaser ("over state") shown while the popup is closed. Same leniency rules
//! as [`crate::triggers`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::triggers::field;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerDevice {
    pub desktop: String,
    pub mobile: String,
}

impl PerDevice {
    fn both(v: &str) -> Self {
        Self {
            desktop: v.to_string(),
            mobile: v.to_string(),
        }
    }

    fn merged(value: Option<&Value>, default: Self) -> Self {
        let Some(obj) = value.and_then(Value::as_object) else {
            return default;
        };
        Self {
            desktop: field(obj, "desktop").unwrap_or(default.desktop),
            mobile: field(obj, "mobile").unwrap_or(default.mobile),
        }
    }
}

/// When the teaser is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeaserDisplayMode {
    #[default]
    Always,
    ClosedNotFilled,
    AfterDelay,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeaserTriggers {
    pub position_desktop: String,
    pub position_mobile: String,
    pub display_mode: TeaserDisplayMode,
    pub delay: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverState {
    pub enabled: bool,
    pub text: String,
    pub show_close: bool,
    pub style: Value,
    pub triggers: TeaserTriggers,
}

impl Default for OverState {
    fn default() -> Self {
        Self {
            enabled: false,
            text: "Open Offer".to_string(),
            show_close: true,
            style: json!({}),
            triggers: TeaserTriggers {
                position_desktop: "bottom-left".to_string(),
                position_mobile: "bottom-left".to_string(),
                display_mode: TeaserDisplayMode::Always,
                delay: 0.0,
            },
        }
    }
}

impl OverState {
    fn merged(value: Option<&Value>) -> Self {
        let default = Self::default();
        let Some(obj) = value.and_then(Value::as_object) else {
            return default;
        };
        let triggers = match obj.get("triggers").and_then(Value::as_object) {
            Some(t) => TeaserTriggers {
                position_desktop: field(t, "positionDesktop")
                    .unwrap_or(default.triggers.position_desktop),
                position_mobile: field(t, "positionMobile")
                    .unwrap_or(default.triggers.position_mobile),
                display_mode: field(t, "displayMode").unwrap_or_default(),
                delay: field(t, "delay").unwrap_or(0.0),
            },
            None => default.triggers,
        };
        Self {
            enabled: field(obj, "enabled").unwrap_or(default.enabled),
            text: field(obj, "text").unwrap_or(default.text),
            show_close: field(obj, "showClose").unwrap_or(default.show_close),
            style: obj
                .get("style")
                .filter(|v| v.is_object())
                .cloned()
                .unwrap_or(default.style),
            triggers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupSettings {
    pub position: PerDevice,
    pub animation: PerDevice,
    pub over_state: OverState,
    /// Layout and colour keys (width, padding, backgroundColor, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PopupSettings {
    pub fn from_value(value: &Value) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);
        let extra = obj
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "position" | "animation" | "overState"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self {
            position: PerDevice::merged(obj.get("position"), PerDevice::both("center")),
            animation: PerDevice::merged(obj.get("animation"), PerDevice::both("fade")),
            over_state: OverState::merged(obj.get("overState")),
            extra,
        }
    }

    pub fn normalize(value: &Value) -> Value {
        serde_json::to_value(Self::from_value(value)).unwrap_or_else(|_| value.clone())
    }

    /// Layout stored for a popup created without settings.
    pub fn creation_default() -> Value {
        json!({
            "width": "500px",
            "height": "auto",
            "backgroundColor": "#ffffff",
            "borderRadius": "8px",
            "padding": "2rem",
            "overlayColor": "rgba(0, 0, 0, 0.5)",
        })
    }
}

/// Legacy colour block stored for a popup created without styles.
pub fn default_styles() -> Value {
    json!({
        "backgroundColor": "#ffffff",
        "textColor": "#000000",
        "buttonColor": "#007bff",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_position_keeps_other_device_default() {
        let s = PopupSettings::from_value(&json!({ "position": { "mobile": "bottom" } }));
        assert_eq!(s.position.desktop, "center");
        assert_eq!(s.position.mobile, "bottom");
        assert_eq!(s.animation, PerDevice::both("fade"));
    }

    #[test]
    fn teaser_display_mode_parses_and_falls_back() {
        let s = PopupSettings::from_value(&json!({
            "overState": { "enabled": true, "triggers": { "displayMode": "after_delay", "delay": 4 } }
        }));
        assert!(s.over_state.enabled);
        assert_eq!(s.over_state.text, "Open Offer");
        assert_eq!(s.over_state.triggers.display_mode, TeaserDisplayMode::AfterDelay);
        assert_eq!(s.over_state.triggers.delay, 4.0);

        let s = PopupSettings::from_value(&json!({
            "overState": { "triggers": { "displayMode": "sometimes" } }
        }));
        assert_eq!(s.over_state.triggers.display_mode, TeaserDisplayMode::Always);
    }

    #[test]
    fn layout_keys_survive_normalize() {
        let v = PopupSettings::normalize(&PopupSettings::creation_default());
        assert_eq!(v["width"], "500px");
        assert_eq!(v["position"]["desktop"], "center");
        assert_eq!(v["overState"]["showClose"], true);
    }
}
