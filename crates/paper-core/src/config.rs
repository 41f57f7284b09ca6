//! 매매 비용 및 계좌 설정.
//!
//! 가상 계좌의 초기 자본금과 수수료/세금/슬리피지, 보유 한도를 정의합니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 가상 계좌 설정.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// 초기 자본금 (원)
    #[serde(default = "default_initial_capital")]
    pub initial_capital: Decimal,

    /// 매수/매도 수수료율 (0.00015 = 0.015%)
    #[serde(default = "default_commission_rate")]
    pub commission_rate: Decimal,

    /// 최소 수수료 (원)
    #[serde(default)]
    pub min_commission: Decimal,

    /// 매도 시 거래세율 (0.0023 = 0.23%)
    #[serde(default = "default_tax_rate")]
    pub tax_rate: Decimal,

    /// 슬리피지율 - 매수는 체결가를 올리고 매도는 내립니다 (기본값: 0)
    #[serde(default)]
    pub slippage_rate: Decimal,

    /// 최대 동시 보유 종목 수
    #[serde(default = "default_max_positions")]
    pub max_positions: usize,

    /// 종목 하나가 차지할 수 있는 포트폴리오 가치 대비 최대 비율 (20 = 20%)
    #[serde(default = "default_max_position_pct")]
    pub max_position_pct: Decimal,
}

fn default_initial_capital() -> Decimal {
    Decimal::from(10_000_000)
}

fn default_commission_rate() -> Decimal {
    Decimal::new(15, 5) // 0.00015
}

fn default_tax_rate() -> Decimal {
    Decimal::new(23, 4) // 0.0023
}

fn default_max_positions() -> usize {
    10
}

fn default_max_position_pct() -> Decimal {
    Decimal::from(20)
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            initial_capital: default_initial_capital(),
            commission_rate: default_commission_rate(),
            min_commission: Decimal::ZERO,
            tax_rate: default_tax_rate(),
            slippage_rate: Decimal::ZERO,
            max_positions: default_max_positions(),
            max_position_pct: default_max_position_pct(),
        }
    }
}

impl TradingConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 환경 변수는 `PAPER` 접두사로 파일 값을 재정의합니다
    /// (예: `PAPER__COMMISSION_RATE=0.0002`).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("PAPER")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings = builder.build()?;
        settings.try_deserialize()
    }

    /// 설정 값을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(ConfigValidationError::InvalidValue(
                "initial_capital must be greater than 0".into(),
            ));
        }

        if self.commission_rate < Decimal::ZERO || self.commission_rate >= Decimal::ONE {
            return Err(ConfigValidationError::InvalidValue(
                "commission_rate must be in [0, 1)".into(),
            ));
        }

        if self.tax_rate < Decimal::ZERO || self.tax_rate >= Decimal::ONE {
            return Err(ConfigValidationError::InvalidValue(
                "tax_rate must be in [0, 1)".into(),
            ));
        }

        if self.slippage_rate < Decimal::ZERO || self.slippage_rate >= Decimal::ONE {
            return Err(ConfigValidationError::InvalidValue(
                "slippage_rate must be in [0, 1)".into(),
            ));
        }

        if self.max_positions == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "max_positions must be at least 1".into(),
            ));
        }

        if self.max_position_pct <= Decimal::ZERO || self.max_position_pct > Decimal::from(100) {
            return Err(ConfigValidationError::InvalidValue(
                "max_position_pct must be between 0 and 100".into(),
            ));
        }

        Ok(())
    }
}

/// 설정 검증 오류.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = TradingConfig::default();

        assert_eq!(config.initial_capital, dec!(10000000));
        assert_eq!(config.commission_rate, dec!(0.00015));
        assert_eq!(config.tax_rate, dec!(0.0023));
        assert_eq!(config.slippage_rate, Decimal::ZERO);
        assert_eq!(config.max_positions, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut invalid = TradingConfig::default();
        invalid.initial_capital = Decimal::ZERO;
        assert!(invalid.validate().is_err());

        let mut invalid = TradingConfig::default();
        invalid.commission_rate = dec!(1.5);
        assert!(invalid.validate().is_err());

        let mut invalid = TradingConfig::default();
        invalid.max_positions = 0;
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = TradingConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: TradingConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config.commission_rate, deserialized.commission_rate);
        assert_eq!(config.initial_capital, deserialized.initial_capital);
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        // 일부 필드만 지정하면 나머지는 기본값으로 채워짐
        let config: TradingConfig =
            serde_json::from_str(r#"{ "initial_capital": "50000000" }"#).unwrap();

        assert_eq!(config.initial_capital, dec!(50000000));
        assert_eq!(config.commission_rate, dec!(0.00015));
        assert_eq!(config.max_positions, 10);
    }
}
