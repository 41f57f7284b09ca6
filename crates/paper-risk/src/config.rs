//! 리스크 관리 설정.
//!
//! 리스크 한도, 기본 손절/익절 비율, 추적 손절을 위한
//! 설정 구조체를 정의합니다.

use paper_core::ConfigValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 계좌 단위 리스크 관리 설정.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// 계좌 잔고 대비 주문 1건의 최대 포지션 크기 비율 (기본값: 10%)
    #[serde(default = "default_max_position_pct")]
    pub max_position_pct: f64,

    /// 계좌 잔고 대비 최대 총 노출 비율 (기본값: 50%)
    /// 모든 보유 종목 평가액의 합이 이를 초과하지 않아야 합니다
    #[serde(default = "default_max_total_exposure_pct")]
    pub max_total_exposure_pct: f64,

    /// 초기 자본 대비 최대 일일 손실 비율 (기본값: 3%)
    /// 이 한도에 도달하면 거래가 중지됩니다
    #[serde(default = "default_max_daily_loss_pct")]
    pub max_daily_loss_pct: f64,

    /// 진입가 대비 기본 손절 비율 (기본값: 2%)
    #[serde(default = "default_stop_loss_pct")]
    pub default_stop_loss_pct: f64,

    /// 진입가 대비 기본 익절 비율 (기본값: 5%)
    #[serde(default = "default_take_profit_pct")]
    pub default_take_profit_pct: f64,

    /// 추적 손절 활성화 여부 (기본값: false)
    #[serde(default)]
    pub enable_trailing_stop: bool,

    /// 추적 손절 거리 비율 (기본값: 1.5%)
    #[serde(default = "default_trailing_stop_pct")]
    pub trailing_stop_pct: f64,

    /// 종목별 리스크 설정 (전역 설정을 재정의함)
    #[serde(default)]
    pub code_configs: HashMap<String, CodeRiskConfig>,
}

/// 종목별 리스크 설정.
/// 여기의 값들은 특정 종목에 대해 전역 RiskConfig를 재정의합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeRiskConfig {
    /// 이 종목의 최대 포지션 크기 (전역 설정 재정의)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_position_pct: Option<f64>,

    /// 이 종목의 손절 비율 (전역 설정 재정의)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss_pct: Option<f64>,

    /// 이 종목의 익절 비율 (전역 설정 재정의)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit_pct: Option<f64>,

    /// 이 종목의 거래 활성화 여부 (기본값: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
}

// 기본값 함수들
fn default_max_position_pct() -> f64 {
    10.0
}

fn default_max_total_exposure_pct() -> f64 {
    50.0
}

fn default_max_daily_loss_pct() -> f64 {
    3.0
}

fn default_stop_loss_pct() -> f64 {
    2.0
}

fn default_take_profit_pct() -> f64 {
    5.0
}

fn default_trailing_stop_pct() -> f64 {
    1.5
}

fn default_true() -> bool {
    true
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_pct: default_max_position_pct(),
            max_total_exposure_pct: default_max_total_exposure_pct(),
            max_daily_loss_pct: default_max_daily_loss_pct(),
            default_stop_loss_pct: default_stop_loss_pct(),
            default_take_profit_pct: default_take_profit_pct(),
            enable_trailing_stop: false,
            trailing_stop_pct: default_trailing_stop_pct(),
            code_configs: HashMap::new(),
        }
    }
}

impl RiskConfig {
    /// 기본값으로 새 RiskConfig를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 보수적인 리스크 설정을 생성합니다 (낮은 한도).
    pub fn conservative() -> Self {
        Self {
            max_position_pct: 5.0,
            max_total_exposure_pct: 30.0,
            max_daily_loss_pct: 1.5,
            default_stop_loss_pct: 1.5,
            default_take_profit_pct: 3.0,
            enable_trailing_stop: true,
            trailing_stop_pct: 1.0,
            code_configs: HashMap::new(),
        }
    }

    /// 공격적인 리스크 설정을 생성합니다 (높은 한도).
    pub fn aggressive() -> Self {
        Self {
            max_position_pct: 20.0,
            max_total_exposure_pct: 80.0,
            max_daily_loss_pct: 5.0,
            default_stop_loss_pct: 3.0,
            default_take_profit_pct: 8.0,
            enable_trailing_stop: false,
            trailing_stop_pct: 2.0,
            code_configs: HashMap::new(),
        }
    }

    /// 종목에 대한 유효 손절 비율을 가져옵니다.
    /// 종목별 값이 설정되어 있으면 해당 값을, 아니면 전역 기본값을 반환합니다.
    pub fn get_stop_loss_pct(&self, code: &str) -> f64 {
        self.code_configs
            .get(code)
            .and_then(|c| c.stop_loss_pct)
            .unwrap_or(self.default_stop_loss_pct)
    }

    /// 종목에 대한 유효 익절 비율을 가져옵니다.
    pub fn get_take_profit_pct(&self, code: &str) -> f64 {
        self.code_configs
            .get(code)
            .and_then(|c| c.take_profit_pct)
            .unwrap_or(self.default_take_profit_pct)
    }

    /// 종목에 대한 유효 최대 포지션 비율을 가져옵니다.
    pub fn get_max_position_pct(&self, code: &str) -> f64 {
        self.code_configs
            .get(code)
            .and_then(|c| c.max_position_pct)
            .unwrap_or(self.max_position_pct)
    }

    /// 종목에 대해 거래가 활성화되어 있는지 확인합니다.
    pub fn is_code_enabled(&self, code: &str) -> bool {
        self.code_configs
            .get(code)
            .map(|c| c.enabled)
            .unwrap_or(true)
    }

    /// 종목별 설정을 추가하거나 업데이트합니다.
    pub fn set_code_config(&mut self, code: impl Into<String>, config: CodeRiskConfig) {
        self.code_configs.insert(code.into(), config);
    }

    /// 설정 값을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_position_pct <= 0.0 || self.max_position_pct > 100.0 {
            return Err(ConfigValidationError::InvalidValue(
                "max_position_pct must be between 0 and 100".into(),
            ));
        }

        if self.max_total_exposure_pct <= 0.0 || self.max_total_exposure_pct > 100.0 {
            return Err(ConfigValidationError::InvalidValue(
                "max_total_exposure_pct must be between 0 and 100".into(),
            ));
        }

        if self.max_daily_loss_pct <= 0.0 || self.max_daily_loss_pct > 100.0 {
            return Err(ConfigValidationError::InvalidValue(
                "max_daily_loss_pct must be between 0 and 100".into(),
            ));
        }

        if self.default_stop_loss_pct <= 0.0 || self.default_stop_loss_pct > 50.0 {
            return Err(ConfigValidationError::InvalidValue(
                "default_stop_loss_pct must be between 0 and 50".into(),
            ));
        }

        if self.default_take_profit_pct <= 0.0 {
            return Err(ConfigValidationError::InvalidValue(
                "default_take_profit_pct must be greater than 0".into(),
            ));
        }

        if self.trailing_stop_pct <= 0.0 || self.trailing_stop_pct >= 100.0 {
            return Err(ConfigValidationError::InvalidValue(
                "trailing_stop_pct must be between 0 and 100".into(),
            ));
        }

        Ok(())
    }
}
