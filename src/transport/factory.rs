//! Transport factory

use std::sync::Arc;

use crate::config::Settings;

use super::saas::SaasTransport;
use super::webpush::WebPushTransport;
use super::{PushTransport, TransportError};

/// Create the push transport selected by `transport.kind`.
///
/// - `"webpush"` (default): `WebPushTransport`, requires VAPID keys
/// - `"saas"`: `SaasTransport`, requires app id and API key
///
/// Missing credentials are a startup error; there is no fallback transport.
pub fn create_transport(settings: &Settings) -> Result<Arc<dyn PushTransport>, TransportError> {
    match settings.transport.kind.as_str() {
        "webpush" => {
            let transport = WebPushTransport::new(&settings.webpush)?;
            tracing::info!(
                transport = "webpush",
                subject = %settings.webpush.subject,
                "Creating Web Push transport"
            );
            Ok(Arc::new(transport))
        }
        "saas" => {
            let transport = SaasTransport::new(&settings.saas)?;
            tracing::info!(
                transport = "saas",
                api_url = %settings.saas.api_url,
                "Creating push SaaS transport"
            );
            Ok(Arc::new(transport))
        }
        other => Err(TransportError::Config(format!(
            "unknown transport kind '{}', expected 'webpush' or 'saas'",
            other
        ))),
    }
}
