//! Typed view of a popup's `triggers` document.
//!
//! The server stores triggers exactly as the dashboard sends them and never
//! evaluates them against visitors; the embedded script does that. This module
//! gives the document a shape so the embed endpoint can hand out a complete,
//! default-filled config.
//!
//! Parsing is lenient: a missing key takes its default, a known key with the
//! wrong type is ignored, a malformed rule inside a rule list is dropped, and
//! unknown keys are carried through untouched.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

/// How a page rule compares the visitor's value with the configured one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchType {
    Contains,
    Exact,
    StartsWith,
    EndsWith,
    NotContains,
}

impl MatchType {
    pub fn matches(&self, candidate: &str, value: &str) -> bool {
        match self {
            MatchType::Contains => candidate.contains(value),
            MatchType::Exact => candidate == value,
            MatchType::StartsWith => candidate.starts_with(value),
            MatchType::EndsWith => candidate.ends_with(value),
            MatchType::NotContains => !candidate.contains(value),
        }
    }
}

/// URL / page-title / visited-page condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRule {
    pub match_type: MatchType,
    pub value: String,
}

impl PageRule {
    pub fn matches(&self, candidate: &str) -> bool {
        self.match_type.matches(candidate, &self.value)
    }
}

/// Comparison against a global JS variable on the host page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsVariableRule {
    pub name: String,
    pub match_type: MatchType,
    pub value: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitorType {
    #[default]
    All,
    SessionUnique,
    PersistentUnique,
    Repeater,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Triggers {
    pub page_url: Vec<PageRule>,
    pub page_title: Vec<PageRule>,
    pub js_variable: Vec<JsVariableRule>,
    pub visited_page: Vec<PageRule>,
    pub time_delay: Option<f64>,
    pub scroll_percentage: Option<f64>,
    pub click_element: Option<String>,
    pub inactivity_time: Option<f64>,
    pub visitor_type: VisitorType,
    pub visitor_count: u32,
    pub click_trigger: Option<String>,
    pub auto_close_delay: Option<f64>,
    pub exit_intent: bool,
    /// Keys this server does not know about, passed through verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const KNOWN_KEYS: &[&str] = &[
    "pageUrl",
    "pageTitle",
    "jsVariable",
    "visitedPage",
    "timeDelay",
    "scrollPercentage",
    "clickElement",
    "inactivityTime",
    "visitorType",
    "visitorCount",
    "clickTrigger",
    "autoCloseDelay",
    "exitIntent",
];

impl Default for Triggers {
    fn default() -> Self {
        Self {
            page_url: Vec::new(),
            page_title: Vec::new(),
            js_variable: Vec::new(),
            visited_page: Vec::new(),
            time_delay: None,
            scroll_percentage: None,
            click_element: None,
            inactivity_time: None,
            visitor_type: VisitorType::All,
            visitor_count: 0,
            click_trigger: None,
            auto_close_delay: None,
            exit_intent: false,
            extra: Map::new(),
        }
    }
}

/// One active display condition. Produced by [`Triggers::rules`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TriggerRule {
    PageUrl(PageRule),
    PageTitle(PageRule),
    VisitedPage(PageRule),
    JsVariable(JsVariableRule),
    TimeDelay { seconds: f64 },
    ScrollPercentage { percent: f64 },
    Inactivity { seconds: f64 },
    ClickElement { selector: String },
    ClickTrigger { selector: String },
    ExitIntent,
    Audience { visitor_type: VisitorType, visit_count: u32 },
    AutoClose { seconds: f64 },
}

impl Triggers {
    /// Parse a stored triggers document. Never fails; see the module docs.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let extra = obj
            .iter()
            .filter(|(k, _)| !KNOWN_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            page_url: rules(obj, "pageUrl"),
            page_title: rules(obj, "pageTitle"),
            js_variable: rules(obj, "jsVariable"),
            visited_page: rules(obj, "visitedPage"),
            time_delay: field::<Option<f64>>(obj, "timeDelay").flatten(),
            scroll_percentage: field::<Option<f64>>(obj, "scrollPercentage").flatten(),
            click_element: non_empty(field::<Option<String>>(obj, "clickElement").flatten()),
            inactivity_time: field::<Option<f64>>(obj, "inactivityTime").flatten(),
            visitor_type: field(obj, "visitorType").unwrap_or_default(),
            visitor_count: field(obj, "visitorCount").unwrap_or(0),
            click_trigger: non_empty(field::<Option<String>>(obj, "clickTrigger").flatten()),
            auto_close_delay: field::<Option<f64>>(obj, "autoCloseDelay").flatten(),
            exit_intent: field(obj, "exitIntent").unwrap_or(false),
            extra,
        }
    }

    /// Stored document merged over the defaults.
    pub fn normalize(value: &Value) -> Value {
        serde_json::to_value(Self::from_value(value)).unwrap_or_else(|_| value.clone())
    }

    /// Document stored for a popup created without triggers.
    pub fn creation_default() -> Value {
        serde_json::json!({ "timeDelay": null, "exitIntent": false })
    }

    /// Active conditions, in a stable order.
    pub fn rules(&self) -> Vec<TriggerRule> {
        let mut out = Vec::new();
        out.extend(self.page_url.iter().cloned().map(TriggerRule::PageUrl));
        out.extend(self.page_title.iter().cloned().map(TriggerRule::PageTitle));
        out.extend(self.visited_page.iter().cloned().map(TriggerRule::VisitedPage));
        out.extend(self.js_variable.iter().cloned().map(TriggerRule::JsVariable));
        if let Some(seconds) = self.time_delay {
            out.push(TriggerRule::TimeDelay { seconds });
        }
        if let Some(percent) = self.scroll_percentage {
            out.push(TriggerRule::ScrollPercentage { percent });
        }
        if let Some(seconds) = self.inactivity_time {
            out.push(TriggerRule::Inactivity { seconds });
        }
        if let Some(selector) = &self.click_element {
            out.push(TriggerRule::ClickElement {
                selector: selector.clone(),
            });
        }
        if let Some(selector) = &self.click_trigger {
            out.push(TriggerRule::ClickTrigger {
                selector: selector.clone(),
            });
        }
        if self.exit_intent {
            out.push(TriggerRule::ExitIntent);
        }
        if self.visitor_type != VisitorType::All || self.visitor_count > 0 {
            out.push(TriggerRule::Audience {
                visitor_type: self.visitor_type,
                visit_count: self.visitor_count,
            });
        }
        if let Some(seconds) = self.auto_close_delay {
            out.push(TriggerRule::AutoClose { seconds });
        }
        out
    }
}

pub(crate) fn field<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Option<T> {
    obj.get(key)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

fn rules<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Vec<T> {
    match obj.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn match_types() {
        assert!(MatchType::Contains.matches("/blog/post-1", "blog"));
        assert!(MatchType::Exact.matches("/pricing", "/pricing"));
        assert!(!MatchType::Exact.matches("/pricing/", "/pricing"));
        assert!(MatchType::StartsWith.matches("/shop/cart", "/shop"));
        assert!(MatchType::EndsWith.matches("/shop/cart", "cart"));
        assert!(MatchType::NotContains.matches("/about", "checkout"));
        assert!(!MatchType::NotContains.matches("/checkout/pay", "checkout"));
    }

    #[test]
    fn missing_document_yields_defaults() {
        let t = Triggers::from_value(&Value::Null);
        assert_eq!(t, Triggers::default());
        assert!(t.rules().is_empty());
    }

    #[test]
    fn ill_typed_known_fields_have_no_effect() {
        let t = Triggers::from_value(&json!({
            "timeDelay": "soon",
            "scrollPercentage": 50,
            "visitorType": "martian",
            "exitIntent": true,
        }));
        assert_eq!(t.time_delay, None);
        assert_eq!(t.scroll_percentage, Some(50.0));
        assert_eq!(t.visitor_type, VisitorType::All);
        assert!(t.exit_intent);
    }

    #[test]
    fn malformed_rules_are_dropped_individually() {
        let t = Triggers::from_value(&json!({
            "pageUrl": [
                { "matchType": "contains", "value": "/blog" },
                { "matchType": "regex", "value": ".*" },
                { "value": "/missing-type" }
            ]
        }));
        assert_eq!(t.page_url.len(), 1);
        assert!(t.page_url[0].matches("/blog/hello"));
    }

    #[test]
    fn unknown_keys_pass_through_normalize() {
        let normalized = Triggers::normalize(&json!({
            "timeDelay": 5,
            "customThing": { "a": 1 }
        }));
        assert_eq!(normalized["timeDelay"], json!(5.0));
        assert_eq!(normalized["customThing"], json!({ "a": 1 }));
        assert_eq!(normalized["visitorType"], json!("all"));
        assert_eq!(normalized["pageUrl"], json!([]));
    }

    #[test]
    fn rules_lists_only_active_conditions() {
        let t = Triggers::from_value(&json!({
            "timeDelay": 3,
            "scrollPercentage": null,
            "clickElement": "  ",
            "visitorType": "repeater",
            "visitorCount": 2,
            "jsVariable": [{ "name": "plan", "matchType": "exact", "value": "pro" }]
        }));
        let rules = t.rules();
        assert_eq!(rules.len(), 3);
        assert!(rules.contains(&TriggerRule::TimeDelay { seconds: 3.0 }));
        assert!(rules.contains(&TriggerRule::Audience {
            visitor_type: VisitorType::Repeater,
            visit_count: 2
        }));
    }
}
