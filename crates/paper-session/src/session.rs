//! 트레이딩 세션.
//!
//! 한 번에 하나의 세션만 활성화되며, 세션은 시작부터 종료까지의 거래
//! 통계를 누적합니다. 세션을 닫으면 최종 잔고가 스냅샷되어 세션 이력에
//! 추가됩니다.

use chrono::{DateTime, Duration, Utc};
use paper_core::{Side, TradeRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 활성 트레이딩 세션.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingSession {
    /// 세션 ID
    pub id: Uuid,
    /// 세션 이름
    pub name: String,
    /// 시작 타임스탬프
    pub started_at: DateTime<Utc>,
    /// 시작 시점 현금
    pub starting_cash: Decimal,
    /// 총 거래 횟수
    pub trade_count: u32,
    /// 매수 체결 횟수
    pub buy_count: u32,
    /// 매도 체결 횟수
    pub sell_count: u32,
    /// 수익 매도 횟수
    pub winning_trades: u32,
    /// 손실 매도 횟수
    pub losing_trades: u32,
    /// 세션 중 실현 손익
    pub realized_pnl: Decimal,
    /// 세션 중 지불한 수수료
    pub commission_paid: Decimal,
    /// 세션 중 지불한 거래세
    pub tax_paid: Decimal,
    /// 세션 거래 로그
    pub trades: Vec<TradeRecord>,
}

impl TradingSession {
    /// 새 세션을 시작합니다.
    pub fn new(name: impl Into<String>, starting_cash: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            started_at: Utc::now(),
            starting_cash,
            trade_count: 0,
            buy_count: 0,
            sell_count: 0,
            winning_trades: 0,
            losing_trades: 0,
            realized_pnl: Decimal::ZERO,
            commission_paid: Decimal::ZERO,
            tax_paid: Decimal::ZERO,
            trades: Vec::new(),
        }
    }

    /// 체결을 세션 통계에 반영합니다.
    pub fn record_trade(&mut self, trade: &TradeRecord) {
        self.trade_count += 1;
        match trade.side {
            Side::Buy => self.buy_count += 1,
            Side::Sell => {
                self.sell_count += 1;
                self.realized_pnl += trade.realized_pnl;
                if trade.realized_pnl > Decimal::ZERO {
                    self.winning_trades += 1;
                } else if trade.realized_pnl < Decimal::ZERO {
                    self.losing_trades += 1;
                }
            }
        }
        self.commission_paid += trade.commission;
        self.tax_paid += trade.tax;
        self.trades.push(trade.clone());
    }

    /// 세션 경과 시간을 반환합니다.
    pub fn duration(&self) -> Duration {
        Utc::now() - self.started_at
    }

    /// 매도 기준 승률을 반환합니다.
    pub fn win_rate(&self) -> f64 {
        let decided = self.winning_trades + self.losing_trades;
        if decided == 0 {
            return 0.0;
        }
        self.winning_trades as f64 / decided as f64
    }

    /// 진행 중인 세션의 중간 보고서를 만듭니다.
    pub fn report(&self, current_cash: Decimal) -> SessionReport {
        SessionReport {
            id: self.id,
            name: self.name.clone(),
            started_at: self.started_at,
            ended_at: None,
            starting_cash: self.starting_cash,
            ending_cash: current_cash,
            return_pct: Self::return_pct(self.starting_cash, current_cash),
            trade_count: self.trade_count,
            buy_count: self.buy_count,
            sell_count: self.sell_count,
            winning_trades: self.winning_trades,
            losing_trades: self.losing_trades,
            win_rate: self.win_rate(),
            realized_pnl: self.realized_pnl,
            commission_paid: self.commission_paid,
            tax_paid: self.tax_paid,
        }
    }

    /// 세션을 종료하고 최종 보고서를 만듭니다.
    pub fn close(self, ending_cash: Decimal) -> SessionReport {
        let mut report = self.report(ending_cash);
        report.ended_at = Some(Utc::now());
        report
    }

    fn return_pct(starting: Decimal, ending: Decimal) -> Decimal {
        if starting.is_zero() {
            return Decimal::ZERO;
        }
        (ending - starting) / starting * Decimal::from(100)
    }
}

/// 종료된(또는 진행 중인) 세션 요약.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// 세션 ID
    pub id: Uuid,
    /// 세션 이름
    pub name: String,
    /// 시작 타임스탬프
    pub started_at: DateTime<Utc>,
    /// 종료 타임스탬프 (진행 중이면 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// 시작 현금
    pub starting_cash: Decimal,
    /// 종료(또는 현재) 현금
    pub ending_cash: Decimal,
    /// 현금 기준 수익률 (%)
    pub return_pct: Decimal,
    /// 총 거래 횟수
    pub trade_count: u32,
    /// 매수 체결 횟수
    pub buy_count: u32,
    /// 매도 체결 횟수
    pub sell_count: u32,
    /// 수익 매도 횟수
    pub winning_trades: u32,
    /// 손실 매도 횟수
    pub losing_trades: u32,
    /// 승률
    pub win_rate: f64,
    /// 실현 손익
    pub realized_pnl: Decimal,
    /// 수수료 합계
    pub commission_paid: Decimal,
    /// 거래세 합계
    pub tax_paid: Decimal,
}
