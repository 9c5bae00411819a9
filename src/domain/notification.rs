use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "Notification";
pub const DEFAULT_BODY: &str = "No message content";
pub const DEFAULT_TAG: &str = "notification";
pub const FALLBACK_TITLE: &str = "New notification";
pub const FALLBACK_BODY: &str = "You have a new notification";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Push message body as sent by the CRM backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<NotificationData>,
}

impl NotificationPayload {
    /// Substitute for payloads that cannot be parsed.
    #[must_use]
    pub fn fallback() -> Self {
        Self { title: FALLBACK_TITLE.to_string(), body: FALLBACK_BODY.to_string(), ..Self::default() }
    }

    /// Parses raw push bytes. Malformed input never fails the event; it yields [`Self::fallback`].
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Self>(bytes) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, len = bytes.len(), "Malformed push payload, using fallback");
                Self::fallback()
            }
        }
    }

    /// Resolves the title and display options, filling every default.
    #[must_use]
    pub fn into_display(self, default_icon: &str) -> (String, NotificationOptions) {
        let title = if self.title.is_empty() { DEFAULT_TITLE.to_string() } else { self.title };
        let body = if self.body.is_empty() { DEFAULT_BODY.to_string() } else { self.body };
        let icon = self.icon.filter(|i| !i.is_empty()).unwrap_or_else(|| default_icon.to_string());
        let badge = self.badge.filter(|b| !b.is_empty()).unwrap_or_else(|| default_icon.to_string());
        let data = self.data.unwrap_or_default();
        let tag = data.kind.clone().filter(|k| !k.is_empty()).unwrap_or_else(|| DEFAULT_TAG.to_string());

        (title, NotificationOptions { body, icon, badge, tag, data })
    }
}

/// Options handed to the platform when showing a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Notifications sharing a tag replace each other instead of stacking.
    pub tag: String,
    pub data: NotificationData,
}

/// A notification currently shown by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownNotification {
    pub title: String,
    pub options: NotificationOptions,
}

impl ShownNotification {
    /// Where a click on this notification should navigate.
    #[must_use]
    pub fn target_url(&self) -> &str {
        self.options.data.url.as_deref().filter(|u| !u.is_empty()).unwrap_or("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ICON: &str = "/1logo_no_bg.png";

    #[test]
    fn test_title_and_body_are_kept() {
        let (title, options) = NotificationPayload::parse(br#"{"title":"T","body":"B"}"#).into_display(ICON);
        assert_eq!(title, "T");
        assert_eq!(options.body, "B");
        assert_eq!(options.icon, ICON);
        assert_eq!(options.tag, DEFAULT_TAG);
    }

    #[test]
    fn test_garbage_falls_back() {
        let payload = NotificationPayload::parse(b"\xff\x00not json");
        assert_eq!(payload, NotificationPayload::fallback());

        let (title, options) = payload.into_display(ICON);
        assert_eq!(title, FALLBACK_TITLE);
        assert_eq!(options.body, FALLBACK_BODY);
    }

    #[test]
    fn test_wrong_shape_falls_back() {
        assert_eq!(NotificationPayload::parse(br#""just a string""#), NotificationPayload::fallback());
        assert_eq!(NotificationPayload::parse(br#"{"title":42}"#), NotificationPayload::fallback());
    }

    #[test]
    fn test_data_type_becomes_tag() {
        let payload = NotificationPayload::parse(br#"{"data":{"type":"lead_assigned","url":"/leads/5"}}"#);
        let (title, options) = payload.into_display(ICON);
        assert_eq!(title, DEFAULT_TITLE);
        assert_eq!(options.body, DEFAULT_BODY);
        assert_eq!(options.tag, "lead_assigned");
        assert_eq!(options.data.url.as_deref(), Some("/leads/5"));
    }

    #[test]
    fn test_payload_icon_and_badge_override_default() {
        let payload = NotificationPayload::parse(
            br#"{"title":"Unit sold","body":"A-12","icon":"/unit.png","badge":"/badge.png"}"#,
        );
        let (_, options) = payload.into_display(ICON);
        assert_eq!(options.icon, "/unit.png");
        assert_eq!(options.badge, "/badge.png");
    }

    #[test]
    fn test_target_url_defaults_to_root() {
        let (title, options) = NotificationPayload::parse(br#"{"title":"T"}"#).into_display(ICON);
        let shown = ShownNotification { title, options };
        assert_eq!(shown.target_url(), "/");
    }
}
