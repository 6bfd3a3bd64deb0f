// libs/booking-cell/src/services/payment.rs
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use shared_config::AppConfig;

use crate::error::BookingError;

type HmacSha256 = Hmac<Sha256>;

/// Razorpay-style checkout verification. The gateway signs
/// `"{order_id}|{payment_id}"` with the shared key secret and sends the
/// hex-encoded digest back with the checkout callback; nothing is marked
/// paid until that signature verifies.
pub struct PaymentGatewayService {
    key_secret: String,
}

impl PaymentGatewayService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            key_secret: config.razorpay_key_secret.clone(),
        }
    }

    pub fn verify_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), BookingError> {
        if self.key_secret.is_empty() {
            return Err(BookingError::Validation(
                "Payment gateway secret is not configured".to_string(),
            ));
        }

        let expected = hex::decode(signature)
            .map_err(|_| BookingError::InvalidPaymentSignature)?;

        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .map_err(|_| BookingError::InvalidPaymentSignature)?;
        mac.update(format!("{}|{}", order_id, payment_id).as_bytes());

        if mac.verify_slice(&expected).is_err() {
            debug!("Payment signature mismatch for order {}", order_id);
            return Err(BookingError::InvalidPaymentSignature);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn config_with_secret(secret: &str) -> AppConfig {
        AppConfig {
            store_url: String::new(),
            store_anon_key: String::new(),
            store_jwt_secret: String::new(),
            razorpay_key_id: "rzp_test_key".to_string(),
            razorpay_key_secret: secret.to_string(),
            support_contact: "support@velora.in".to_string(),
            settings_cache_ttl_seconds: 300,
        }
    }

    fn sign(secret: &str, order_id: &str, payment_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_a_correctly_signed_payment() {
        let service = PaymentGatewayService::new(&config_with_secret("gateway-secret"));
        let signature = sign("gateway-secret", "order_123", "pay_456");

        assert!(service
            .verify_signature("order_123", "pay_456", &signature)
            .is_ok());
    }

    #[test]
    fn rejects_a_signature_made_with_the_wrong_secret() {
        let service = PaymentGatewayService::new(&config_with_secret("gateway-secret"));
        let signature = sign("other-secret", "order_123", "pay_456");

        assert_matches!(
            service.verify_signature("order_123", "pay_456", &signature),
            Err(BookingError::InvalidPaymentSignature)
        );
    }

    #[test]
    fn rejects_a_signature_for_a_different_order() {
        let service = PaymentGatewayService::new(&config_with_secret("gateway-secret"));
        let signature = sign("gateway-secret", "order_123", "pay_456");

        assert_matches!(
            service.verify_signature("order_999", "pay_456", &signature),
            Err(BookingError::InvalidPaymentSignature)
        );
    }

    #[test]
    fn rejects_non_hex_signatures() {
        let service = PaymentGatewayService::new(&config_with_secret("gateway-secret"));

        assert_matches!(
            service.verify_signature("order_123", "pay_456", "not-hex!"),
            Err(BookingError::InvalidPaymentSignature)
        );
    }
}
