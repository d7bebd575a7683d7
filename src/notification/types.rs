use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Target value meaning "every registered subscription"
pub const TARGET_ALL: &str = "all";

/// A notification to deliver to one or more subscriptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    /// Same-tag notifications replace each other on the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Page opened when the notification is clicked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub require_interaction: bool,
    /// Seconds the push service may hold the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// `"all"` (or absent) for broadcast, otherwise a subscription key
    #[serde(default, alias = "targetId", skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Which subscriptions a dispatch addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelector {
    All,
    Key(String),
}

impl TargetSelector {
    pub fn from_option(target: Option<&str>) -> Self {
        match target.map(str::trim) {
            None | Some("") => TargetSelector::All,
            Some(t) if t.eq_ignore_ascii_case(TARGET_ALL) => TargetSelector::All,
            Some(t) => TargetSelector::Key(t.to_string()),
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            TargetSelector::All => "all",
            TargetSelector::Key(_) => "single",
        }
    }
}

impl NotificationRequest {
    pub fn builder(title: impl Into<String>, body: impl Into<String>) -> NotificationRequestBuilder {
        NotificationRequestBuilder::new(title, body)
    }

    /// Title and body are required.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is required".to_string());
        }
        if self.body.trim().is_empty() {
            return Err("body is required".to_string());
        }
        Ok(())
    }

    pub fn target_selector(&self) -> TargetSelector {
        TargetSelector::from_option(self.target.as_deref())
    }
}

/// Builder for notification requests
#[derive(Debug, Clone)]
pub struct NotificationRequestBuilder {
    request: NotificationRequest,
}

impl NotificationRequestBuilder {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            request: NotificationRequest {
                title: title.into(),
                body: body.into(),
                icon: None,
                badge: None,
                tag: None,
                url: None,
                data: None,
                require_interaction: false,
                ttl: None,
                target: None,
            },
        }
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.request.icon = Some(icon.into());
        self
    }

    pub fn badge(mut self, badge: impl Into<String>) -> Self {
        self.request.badge = Some(badge.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.request.tag = Some(tag.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.request.url = Some(url.into());
        self
    }

    /// Add one entry to the data payload
    pub fn data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.request
            .data
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn require_interaction(mut self, required: bool) -> Self {
        self.request.require_interaction = required;
        self
    }

    pub fn ttl(mut self, ttl: u32) -> Self {
        self.request.ttl = Some(ttl);
        self
    }

    pub fn target(mut self, target: Option<String>) -> Self {
        self.request.target = target;
        self
    }

    pub fn build(self) -> NotificationRequest {
        self.request
    }
}

/// Outcome of delivering to one subscription
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    /// Subscription key, truncated for display
    pub target: String,
    pub success: bool,
    /// Transport status code; absent when the request never got a response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The push service reported the subscription as gone
    pub permanent: bool,
}

/// Aggregate counts for one dispatch.
///
/// `successful + failed == total` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Records purged from the registry after a permanent failure
    pub removed: usize,
}

impl DispatchSummary {
    pub fn from_results(results: &[DispatchResult], removed: usize) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            removed,
        }
    }
}

/// Everything a caller learns from one dispatch
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    pub notification_id: Uuid,
    pub summary: DispatchSummary,
    /// Per-target results in registry order
    pub results: Vec<DispatchResult>,
    /// Expired records pruned before sending (not counted as targets)
    pub expired: usize,
    /// A specific target was requested but is not registered; nothing was sent
    pub target_not_found: bool,
}
