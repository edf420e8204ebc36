use super::{DeliveryError, HttpDelivery, Transport, TransportConfig};
use std::sync::{Arc, OnceLock};
use tracing::warn;

static SHARED: OnceLock<Arc<Transport<HttpDelivery>>> = OnceLock::new();

/// Returns the process-wide transport, creating it from `config` on first
/// use. Later calls get the same instance regardless of their config.
pub fn shared_transport(
    config: TransportConfig,
) -> Result<Arc<Transport<HttpDelivery>>, DeliveryError> {
    if let Some(existing) = SHARED.get() {
        if existing.config().endpoint != config.endpoint {
            warn!(
                existing = %existing.config().endpoint,
                requested = %config.endpoint,
                "Shared transport already exists, ignoring new endpoint"
            );
        }
        return Ok(Arc::clone(existing));
    }

    let delivery = HttpDelivery::new(&config)?;
    let transport = Transport::new(config, delivery);
    Ok(Arc::clone(SHARED.get_or_init(|| transport)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_config_wins() {
        let first = shared_transport(TransportConfig::browser("http://localhost:9/first")).unwrap();
        let second = shared_transport(TransportConfig::browser("http://localhost:9/second")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.config().endpoint, "http://localhost:9/first");
    }
}
