//! Conditional notification rules.
//!
//! Each rule is a pure function of its input: it either builds a
//! `NotificationRequest` or suppresses the notification with a reason.
//! Rules never touch the registry or the dispatcher.

mod market_event;
mod price_alert;
mod trading_signal;

use crate::notification::NotificationRequest;

pub use market_event::{evaluate_market_event, market_event, MarketEvent, Severity};
pub use price_alert::{evaluate_price_alert, price_alert, AlertDirection, PriceAlert};
pub use trading_signal::{
    evaluate_trading_signal, trading_signal, SignalAction, TradingSignal,
    DEFAULT_CONFIDENCE_THRESHOLD,
};

/// Result of evaluating one rule
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    Notify(NotificationRequest),
    Suppressed { reason: String },
}

impl RuleOutcome {
    pub fn suppressed(reason: impl Into<String>) -> Self {
        RuleOutcome::Suppressed {
            reason: reason.into(),
        }
    }

    pub fn is_notify(&self) -> bool {
        matches!(self, RuleOutcome::Notify(_))
    }

    pub fn into_notification(self) -> Option<NotificationRequest> {
        match self {
            RuleOutcome::Notify(request) => Some(request),
            RuleOutcome::Suppressed { .. } => None,
        }
    }
}

/// Prices must be positive finite numbers
pub(crate) fn check_price(name: &str, value: f64) -> Result<(), String> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(format!("{} must be a positive number", name))
    }
}

pub(crate) fn check_required(name: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} is required", name))
    } else {
        Ok(())
    }
}
