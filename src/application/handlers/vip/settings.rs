//! Checkout and reconciliation settings.

/// Values the VIP handlers need from the `payment` configuration section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VipSettings {
    pub success_url: String,
    pub cancel_url: String,
    /// Used for inline prices when a plan carries no currency.
    pub currency: String,
    /// VIP length when neither the plan nor the checkout metadata says.
    pub default_duration_days: i64,
    /// Ignore test-mode webhook events.
    pub require_livemode: bool,
}

impl Default for VipSettings {
    fn default() -> Self {
        Self {
            success_url: "http://localhost:3000/vip/success".to_string(),
            cancel_url: "http://localhost:3000/vip/cancel".to_string(),
            currency: "vnd".to_string(),
            default_duration_days: 30,
            require_livemode: false,
        }
    }
}
