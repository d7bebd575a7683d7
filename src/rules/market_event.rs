use std::fmt;

use serde::{Deserialize, Serialize};

use crate::notification::NotificationRequest;

use super::{check_required, RuleOutcome};

/// Event severity, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketEvent {
    /// e.g. "listing", "halt", "volatility"
    pub event_type: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default, alias = "targetId")]
    pub target: Option<String>,
}

impl MarketEvent {
    pub fn validate(&self) -> Result<(), String> {
        check_required("eventType", &self.event_type)?;
        check_required("title", &self.title)?;
        check_required("description", &self.description)
    }
}

/// Low-severity events are dropped; critical ones are marked and sticky.
pub fn evaluate_market_event(event: &MarketEvent) -> RuleOutcome {
    if event.severity == Severity::Low {
        return RuleOutcome::suppressed("severity low is below notification level");
    }

    let critical = event.severity == Severity::Critical;
    let title = if critical {
        format!("🚨 {}", event.title.trim())
    } else {
        event.title.trim().to_string()
    };
    let event_type = event.event_type.trim();

    let request = NotificationRequest::builder(title, event.description.trim())
        .tag(format!("market-event-{}", event_type))
        .data("type", "market_event")
        .data("eventType", event_type)
        .data("severity", event.severity.to_string())
        .require_interaction(critical)
        .target(event.target.clone())
        .build();

    RuleOutcome::Notify(request)
}

pub fn market_event(event: &MarketEvent) -> Option<NotificationRequest> {
    evaluate_market_event(event).into_notification()
}
