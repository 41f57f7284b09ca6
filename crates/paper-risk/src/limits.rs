//! 일일 손실 한도 추적 (서킷 브레이커).
//!
//! 제공 기능:
//! - 하루 동안의 모든 실현 손익 이벤트 기록
//! - 손실 한도 도달 시 거래 중지
//! - UTC 자정에 자동 일일 초기화

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// 단일 손익 기록.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PnLRecord {
    /// 손익 이벤트의 타임스탬프
    pub timestamp: DateTime<Utc>,
    /// 이 손익과 관련된 종목 코드
    pub code: String,
    /// 실현 손익 금액 (양수 = 이익, 음수 = 손실)
    pub amount: Decimal,
    /// 이 손익과 관련된 주문 ID
    pub order_id: Option<String>,
    /// 설명 또는 메모
    pub description: Option<String>,
}

impl PnLRecord {
    /// 새 손익 기록을 생성합니다.
    pub fn new(code: impl Into<String>, amount: Decimal) -> Self {
        Self {
            timestamp: Utc::now(),
            code: code.into(),
            amount,
            order_id: None,
            description: None,
        }
    }

    /// 기록에 주문 ID를 추가합니다.
    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    /// 기록에 설명을 추가합니다.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 손실인지 확인합니다.
    pub fn is_loss(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// 이익인지 확인합니다.
    pub fn is_profit(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

/// 일일 손실 한도 상태.
#[derive(Debug, Clone)]
pub struct DailyLimitStatus {
    /// 거래 허용 여부
    pub can_trade: bool,
    /// 현재 일일 손익
    pub daily_pnl: Decimal,
    /// 허용된 최대 일일 손실
    pub max_daily_loss: Decimal,
    /// 한도 도달 전 남은 손실 허용량
    pub remaining_allowance: Decimal,
    /// 일일 한도 사용 비율
    pub limit_usage_pct: f64,
    /// 오늘의 손익 이벤트 횟수
    pub trade_count: usize,
    /// 한도에 근접할 때 경고 메시지
    pub warning: Option<String>,
}

impl DailyLimitStatus {
    /// 한도에 근접했는지 확인합니다 (>70% 사용).
    pub fn is_approaching_limit(&self) -> bool {
        self.limit_usage_pct >= 70.0
    }

    /// 한도를 초과했는지 확인합니다.
    pub fn is_limit_exceeded(&self) -> bool {
        !self.can_trade
    }
}

/// 일일 손실 한도 모니터링 및 적용을 위한 추적기.
///
/// 이 추적기의 기능:
/// - 하루 동안의 모든 손익 이벤트 기록
/// - 누적 손실이 `초기 자본 × 한도 비율`에 도달하면 거래 중지
/// - UTC 자정에 자동 초기화 (중지 상태도 함께 해제)
/// - 상세 분석을 위한 종목별 손익 추적
#[derive(Debug, Clone)]
pub struct DailyLossTracker {
    /// 초기 자본 대비 최대 일일 손실 비율
    max_daily_loss_pct: f64,
    /// 비율 계산을 위한 시작 잔액
    starting_balance: Decimal,
    /// 현재 날짜 (초기화 감지용)
    current_date: chrono::NaiveDate,
    /// 오늘의 모든 손익 기록
    records: Vec<PnLRecord>,
    /// 종목별 손익 요약
    code_pnl: HashMap<String, Decimal>,
    /// 캐시된 일일 총 손익
    daily_total: Decimal,
    /// 한도 초과로 인한 거래 일시 중지 여부
    trading_paused: bool,
}

impl DailyLossTracker {
    /// 새 일일 손실 추적기를 생성합니다.
    ///
    /// # Arguments
    /// * `max_daily_loss_pct` - 비율 기준 최대 일일 손실 (예: 3%는 3.0)
    /// * `starting_balance` - 비율 계산을 위한 초기 자본
    pub fn new(max_daily_loss_pct: f64, starting_balance: Decimal) -> Self {
        Self {
            max_daily_loss_pct,
            starting_balance,
            current_date: Utc::now().date_naive(),
            records: Vec::new(),
            code_pnl: HashMap::new(),
            daily_total: Decimal::ZERO,
            trading_paused: false,
        }
    }

    /// 새로운 날을 위한 초기화가 필요한지 확인하고 필요시 수행합니다.
    fn check_and_reset(&mut self) {
        let today = Utc::now().date_naive();
        if today != self.current_date {
            self.reset_daily(today);
        }
    }

    /// 새로운 날을 위한 일일 추적 초기화.
    fn reset_daily(&mut self, new_date: chrono::NaiveDate) {
        self.current_date = new_date;
        self.records.clear();
        self.code_pnl.clear();
        self.daily_total = Decimal::ZERO;
        self.trading_paused = false;
    }

    /// 손익 이벤트를 기록합니다.
    ///
    /// # Returns
    /// 업데이트된 일일 한도 상태
    pub fn record_pnl(&mut self, record: PnLRecord) -> DailyLimitStatus {
        // 날짜 변경 확인
        self.check_and_reset();

        self.daily_total += record.amount;

        let code_total = self
            .code_pnl
            .entry(record.code.clone())
            .or_insert(Decimal::ZERO);
        *code_total += record.amount;

        self.records.push(record);

        // 한도 초과 확인
        self.check_limit_breach();

        self.get_status()
    }

    /// 이익을 기록합니다.
    pub fn record_profit(&mut self, code: &str, amount: Decimal) -> DailyLimitStatus {
        self.record_pnl(PnLRecord::new(code, amount.abs()))
    }

    /// 손실을 기록합니다.
    pub fn record_loss(&mut self, code: &str, amount: Decimal) -> DailyLimitStatus {
        self.record_pnl(PnLRecord::new(code, -amount.abs()))
    }

    /// 일일 손실 한도 초과 여부를 확인합니다.
    fn check_limit_breach(&mut self) {
        if self.daily_total >= Decimal::ZERO || self.trading_paused {
            return;
        }

        let loss = self.daily_total.abs();
        if loss >= self.max_daily_loss() {
            self.trading_paused = true;
            warn!(
                daily_pnl = %self.daily_total,
                limit = %self.max_daily_loss(),
                "일일 손실 한도 도달, 거래 중지"
            );
        }
    }

    /// 유효 일일 손실 한도를 계산합니다 (초기 자본 × 한도 비율).
    fn max_daily_loss(&self) -> Decimal {
        Decimal::from_f64_retain(
            self.starting_balance.to_f64().unwrap_or(0.0) * self.max_daily_loss_pct / 100.0,
        )
        .unwrap_or(Decimal::ZERO)
    }

    /// 현재 일일 한도 상태를 조회합니다.
    pub fn get_status(&mut self) -> DailyLimitStatus {
        // 날짜 변경 확인
        self.check_and_reset();

        let limit = self.max_daily_loss();
        let current_loss = if self.daily_total < Decimal::ZERO {
            self.daily_total.abs()
        } else {
            Decimal::ZERO
        };

        let remaining = limit - current_loss;
        let limit_usage_pct = if limit > Decimal::ZERO {
            (current_loss / limit * Decimal::from(100))
                .to_f64()
                .unwrap_or(0.0)
        } else {
            0.0
        };

        let warning = if limit_usage_pct >= 90.0 {
            Some(format!(
                "CRITICAL: Daily loss limit is {:.1}% used. Trading will be paused at 100%.",
                limit_usage_pct
            ))
        } else if limit_usage_pct >= 70.0 {
            Some(format!(
                "WARNING: Daily loss limit is {:.1}% used. Consider reducing position sizes.",
                limit_usage_pct
            ))
        } else {
            None
        };

        DailyLimitStatus {
            can_trade: !self.trading_paused,
            daily_pnl: self.daily_total,
            max_daily_loss: limit,
            remaining_allowance: remaining.max(Decimal::ZERO),
            limit_usage_pct,
            trade_count: self.records.len(),
            warning,
        }
    }

    /// 거래 허용 여부를 확인합니다.
    pub fn can_trade(&mut self) -> bool {
        self.check_and_reset();
        !self.trading_paused
    }

    /// 일일 손익을 조회합니다.
    pub fn daily_pnl(&mut self) -> Decimal {
        self.check_and_reset();
        self.daily_total
    }

    /// 특정 종목의 손익을 조회합니다.
    pub fn code_pnl(&mut self, code: &str) -> Decimal {
        self.check_and_reset();
        self.code_pnl.get(code).copied().unwrap_or(Decimal::ZERO)
    }

    /// 오늘의 모든 손익 기록을 조회합니다.
    pub fn records(&mut self) -> &[PnLRecord] {
        self.check_and_reset();
        &self.records
    }

    /// 오늘의 손익 이벤트 횟수를 조회합니다.
    pub fn trade_count(&mut self) -> usize {
        self.check_and_reset();
        self.records.len()
    }

    /// 수동으로 추적기를 초기화합니다 (테스트 또는 수동 재정의용).
    pub fn force_reset(&mut self) {
        self.reset_daily(Utc::now().date_naive());
    }

    /// 거래 일시 중지를 재정의합니다 (관리자 기능).
    pub fn override_pause(&mut self, allow_trading: bool) {
        self.trading_paused = !allow_trading;
    }

    /// 시작 잔액을 업데이트합니다 (동적 조정용).
    pub fn update_starting_balance(&mut self, balance: Decimal) {
        self.starting_balance = balance;
    }

    /// 수익 거래 횟수를 조회합니다.
    pub fn winning_trades(&mut self) -> usize {
        self.check_and_reset();
        self.records.iter().filter(|r| r.is_profit()).count()
    }

    /// 손실 거래 횟수를 조회합니다.
    pub fn losing_trades(&mut self) -> usize {
        self.check_and_reset();
        self.records.iter().filter(|r| r.is_loss()).count()
    }

    /// 승률을 조회합니다.
    pub fn win_rate(&mut self) -> f64 {
        self.check_and_reset();
        let total = self.records.len();
        if total == 0 {
            return 0.0;
        }
        self.winning_trades() as f64 / total as f64
    }

    /// 총 이익을 조회합니다 (모든 양의 손익 합계).
    pub fn total_profit(&mut self) -> Decimal {
        self.check_and_reset();
        self.records
            .iter()
            .filter(|r| r.is_profit())
            .map(|r| r.amount)
            .sum()
    }

    /// 총 손실을 조회합니다 (모든 음의 손익 합계, 양수로 반환).
    pub fn total_loss(&mut self) -> Decimal {
        self.check_and_reset();
        self.records
            .iter()
            .filter(|r| r.is_loss())
            .map(|r| r.amount.abs())
            .sum()
    }
}
