//! Payment configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::application::handlers::vip::VipSettings;

/// Payment configuration (Stripe hosted checkout and webhooks)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe API key
    pub stripe_api_key: String,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,

    /// Where the gateway sends the buyer after paying
    #[serde(default = "default_success_url")]
    pub checkout_success_url: String,

    /// Where the gateway sends the buyer after abandoning checkout
    #[serde(default = "default_cancel_url")]
    pub checkout_cancel_url: String,

    /// VIP length when neither plan nor checkout metadata carries one
    #[serde(default = "default_vip_duration_days")]
    pub default_vip_duration_days: i64,

    /// Currency for plans priced inline
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Drop webhook events from Stripe test mode
    #[serde(default)]
    pub require_livemode: bool,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_live_")
    }

    /// Settings consumed by the VIP checkout and webhook handlers
    pub fn to_vip_settings(&self) -> VipSettings {
        VipSettings {
            success_url: self.checkout_success_url.clone(),
            cancel_url: self.checkout_cancel_url.clone(),
            currency: self.currency.to_lowercase(),
            default_duration_days: self.default_vip_duration_days,
            require_livemode: self.require_livemode,
        }
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"));
        }
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired(
                "PAYMENT__STRIPE_WEBHOOK_SECRET",
            ));
        }

        // Verify key prefixes for safety
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        if !is_absolute_url(&self.checkout_success_url) {
            return Err(ValidationError::InvalidRedirectUrl("checkout_success_url"));
        }
        if !is_absolute_url(&self.checkout_cancel_url) {
            return Err(ValidationError::InvalidRedirectUrl("checkout_cancel_url"));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCurrency);
        }
        if self.default_vip_duration_days <= 0 {
            return Err(ValidationError::InvalidVipDuration);
        }

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: String::new(),
            stripe_webhook_secret: String::new(),
            checkout_success_url: default_success_url(),
            checkout_cancel_url: default_cancel_url(),
            default_vip_duration_days: default_vip_duration_days(),
            currency: default_currency(),
            require_livemode: false,
        }
    }
}

fn is_absolute_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

fn default_success_url() -> String {
    "http://localhost:3000/vip/success".to_string()
}

fn default_cancel_url() -> String {
    "http://localhost:3000/vip/cancel".to_string()
}

fn default_vip_duration_days() -> i64 {
    30
}

fn default_currency() -> String {
    "vnd".to_string()
}
