use std::fmt;

use serde::{Deserialize, Serialize};

use crate::notification::NotificationRequest;

use super::{check_price, check_required, RuleOutcome};

/// Minimum confidence (0-100) for a signal to notify
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 75.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    #[serde(alias = "buy", alias = "Buy")]
    Buy,
    #[serde(alias = "sell", alias = "Sell")]
    Sell,
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalAction::Buy => write!(f, "BUY"),
            SignalAction::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingSignal {
    pub symbol: String,
    pub action: SignalAction,
    pub price: f64,
    /// 0-100
    pub confidence: f64,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,
    #[serde(default, alias = "targetId")]
    pub target: Option<String>,
}

impl TradingSignal {
    pub fn validate(&self) -> Result<(), String> {
        check_required("symbol", &self.symbol)?;
        check_price("price", self.price)?;
        if !(0.0..=100.0).contains(&self.confidence) {
            return Err("confidence must be between 0 and 100".to_string());
        }
        if let Some(stop_loss) = self.stop_loss {
            check_price("stopLoss", stop_loss)?;
        }
        if let Some(take_profit) = self.take_profit {
            check_price("takeProfit", take_profit)?;
        }
        Ok(())
    }
}

/// Notify when `confidence >= threshold`.
pub fn evaluate_trading_signal(signal: &TradingSignal, threshold: f64) -> RuleOutcome {
    // NaN never passes
    if !(signal.confidence >= threshold) {
        return RuleOutcome::suppressed(format!(
            "confidence {} is below threshold {}",
            signal.confidence, threshold
        ));
    }

    let symbol = signal.symbol.trim();
    let marker = match signal.action {
        SignalAction::Buy => "📈",
        SignalAction::Sell => "📉",
    };

    let mut body = format!("{} {} @ {}", signal.action, symbol, signal.price);
    if let Some(stop_loss) = signal.stop_loss {
        body.push_str(&format!(" | SL {}", stop_loss));
    }
    if let Some(take_profit) = signal.take_profit {
        body.push_str(&format!(" | TP {}", take_profit));
    }
    body.push_str(&format!(" | Confidence {}%", signal.confidence));

    let mut builder = NotificationRequest::builder(format!("{} {} signal: {}", marker, signal.action, symbol), body)
        .tag(format!("trading-signal-{}", symbol))
        .data("type", "trading_signal")
        .data("symbol", symbol)
        .data("action", signal.action.to_string())
        .data("price", signal.price)
        .data("confidence", signal.confidence)
        .target(signal.target.clone());
    if let Some(stop_loss) = signal.stop_loss {
        builder = builder.data("stopLoss", stop_loss);
    }
    if let Some(take_profit) = signal.take_profit {
        builder = builder.data("takeProfit", take_profit);
    }

    RuleOutcome::Notify(builder.build())
}

pub fn trading_signal(signal: &TradingSignal, threshold: f64) -> Option<NotificationRequest> {
    evaluate_trading_signal(signal, threshold).into_notification()
}
