//! Contract workflow configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::contract::OtpPolicy;

/// Signing and purchase-request timing
#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    /// Minutes an issued OTP stays valid
    #[serde(default = "default_otp_ttl_minutes")]
    pub otp_ttl_minutes: i64,

    /// Wrong guesses allowed per OTP
    #[serde(default = "default_otp_max_attempts")]
    pub otp_max_attempts: u32,

    /// Days a pending purchase request waits for the seller
    #[serde(default = "default_purchase_request_ttl_days")]
    pub purchase_request_ttl_days: i64,

    /// Period of the background expiry sweep
    #[serde(default = "default_expiry_sweep_interval")]
    pub expiry_sweep_interval_secs: u64,
}

impl ContractConfig {
    pub fn otp_policy(&self) -> OtpPolicy {
        OtpPolicy {
            ttl_minutes: self.otp_ttl_minutes,
            max_attempts: self.otp_max_attempts,
        }
    }

    pub fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_sweep_interval_secs)
    }

    /// Validate contract configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.otp_ttl_minutes <= 0 {
            return Err(ValidationError::InvalidContractSetting("otp_ttl_minutes"));
        }
        if self.otp_max_attempts == 0 {
            return Err(ValidationError::InvalidContractSetting("otp_max_attempts"));
        }
        if self.purchase_request_ttl_days <= 0 {
            return Err(ValidationError::InvalidContractSetting(
                "purchase_request_ttl_days",
            ));
        }
        if self.expiry_sweep_interval_secs == 0 {
            return Err(ValidationError::InvalidContractSetting(
                "expiry_sweep_interval_secs",
            ));
        }
        Ok(())
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            otp_ttl_minutes: default_otp_ttl_minutes(),
            otp_max_attempts: default_otp_max_attempts(),
            purchase_request_ttl_days: default_purchase_request_ttl_days(),
            expiry_sweep_interval_secs: default_expiry_sweep_interval(),
        }
    }
}

fn default_otp_ttl_minutes() -> i64 {
    10
}

fn default_otp_max_attempts() -> u32 {
    5
}

fn default_purchase_request_ttl_days() -> i64 {
    3
}

fn default_expiry_sweep_interval() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_config_defaults() {
        let config = ContractConfig::default();
        assert_eq!(config.otp_policy(), OtpPolicy::default());
        assert_eq!(config.purchase_request_ttl_days, 3);
        assert_eq!(config.expiry_sweep_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_validation_rejects_zero_attempts() {
        let config = ContractConfig {
            otp_max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidContractSetting("otp_max_attempts"))
        );
    }

    #[test]
    fn test_validation_rejects_non_positive_ttls() {
        let config = ContractConfig {
            purchase_request_ttl_days: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ContractConfig {
            otp_ttl_minutes: -1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(ContractConfig::default().validate().is_ok());
    }
}
