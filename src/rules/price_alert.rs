use std::fmt;

use serde::{Deserialize, Serialize};

use crate::notification::NotificationRequest;

use super::{check_price, check_required, RuleOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertDirection {
    Above,
    Below,
}

impl fmt::Display for AlertDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertDirection::Above => write!(f, "above"),
            AlertDirection::Below => write!(f, "below"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAlert {
    pub symbol: String,
    pub current_price: f64,
    pub target_price: f64,
    #[serde(alias = "direction")]
    pub alert_type: AlertDirection,
    #[serde(default, alias = "targetId")]
    pub target: Option<String>,
}

impl PriceAlert {
    pub fn validate(&self) -> Result<(), String> {
        check_required("symbol", &self.symbol)?;
        check_price("currentPrice", self.current_price)?;
        check_price("targetPrice", self.target_price)
    }

    /// Both bounds are inclusive
    pub fn is_triggered(&self) -> bool {
        match self.alert_type {
            AlertDirection::Above => self.current_price >= self.target_price,
            AlertDirection::Below => self.current_price <= self.target_price,
        }
    }
}

pub fn evaluate_price_alert(alert: &PriceAlert) -> RuleOutcome {
    if !alert.is_triggered() {
        return RuleOutcome::suppressed(format!(
            "price {} has not crossed {} {}",
            alert.current_price, alert.alert_type, alert.target_price
        ));
    }

    let symbol = alert.symbol.trim();
    let request = NotificationRequest::builder(
        format!("🔔 Price alert: {}", symbol),
        format!(
            "{} is now {}, {} your target of {}",
            symbol, alert.current_price, alert.alert_type, alert.target_price
        ),
    )
    .tag(format!("price-alert-{}", symbol))
    .data("type", "price_alert")
    .data("symbol", symbol)
    .data("currentPrice", alert.current_price)
    .data("targetPrice", alert.target_price)
    .data("alertType", alert.alert_type.to_string())
    .target(alert.target.clone())
    .build();

    RuleOutcome::Notify(request)
}

pub fn price_alert(alert: &PriceAlert) -> Option<NotificationRequest> {
    evaluate_price_alert(alert).into_notification()
}
