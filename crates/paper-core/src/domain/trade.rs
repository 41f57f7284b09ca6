//! 체결 기록.
//!
//! 이 모듈은 가상 체결 관련 타입을 정의합니다:
//! - `TradeReason` - 체결이 발생한 사유
//! - `TradeRecord` - 개별 체결 기록

use crate::domain::Side;
use crate::types::{Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 체결이 발생한 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeReason {
    /// 사용자 직접 주문
    Manual,
    /// 지정가 조건 충족
    LimitTrigger,
    /// 스톱 조건 충족
    StopTrigger,
    /// 손절 발동
    StopLoss,
    /// 익절 발동
    TakeProfit,
    /// 추적 손절 발동
    TrailingStop,
    /// 세션 종료 시 일괄 청산
    SessionClose,
}

impl std::fmt::Display for TradeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TradeReason::Manual => "manual",
            TradeReason::LimitTrigger => "limit_trigger",
            TradeReason::StopTrigger => "stop_trigger",
            TradeReason::StopLoss => "stop_loss",
            TradeReason::TakeProfit => "take_profit",
            TradeReason::TrailingStop => "trailing_stop",
            TradeReason::SessionClose => "session_close",
        };
        write!(f, "{}", s)
    }
}

/// 체결된 주문을 나타내는 거래 기록.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    /// 내부 거래 ID
    pub id: Uuid,
    /// 관련 주문 ID
    pub order_id: Uuid,
    /// 종목 코드
    pub code: String,
    /// 종목명
    pub name: String,
    /// 거래 방향
    pub side: Side,
    /// 체결 수량
    pub quantity: Quantity,
    /// 체결 가격 (슬리피지 반영)
    pub price: Price,
    /// 수수료
    pub commission: Decimal,
    /// 거래세 (매도 시)
    pub tax: Decimal,
    /// 실현 손익 (매도 시, 비용 차감 후)
    pub realized_pnl: Decimal,
    /// 체결 사유
    pub reason: TradeReason,
    /// 체결 타임스탬프
    pub executed_at: DateTime<Utc>,
}

impl TradeRecord {
    /// 새 거래 기록을 생성합니다.
    pub fn new(
        order_id: Uuid,
        code: impl Into<String>,
        name: impl Into<String>,
        side: Side,
        quantity: Quantity,
        price: Price,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            code: code.into(),
            name: name.into(),
            side,
            quantity,
            price,
            commission: Decimal::ZERO,
            tax: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            reason: TradeReason::Manual,
            executed_at: Utc::now(),
        }
    }

    /// 수수료와 거래세를 설정합니다.
    pub fn with_costs(mut self, commission: Decimal, tax: Decimal) -> Self {
        self.commission = commission;
        self.tax = tax;
        self
    }

    /// 실현 손익을 설정합니다.
    pub fn with_realized_pnl(mut self, pnl: Decimal) -> Self {
        self.realized_pnl = pnl;
        self
    }

    /// 체결 사유를 설정합니다.
    pub fn with_reason(mut self, reason: TradeReason) -> Self {
        self.reason = reason;
        self
    }

    /// 거래의 명목 가치를 반환합니다.
    pub fn notional_value(&self) -> Decimal {
        self.price * self.quantity
    }

    /// 비용 차감 후 현금 흐름을 반환합니다 (매수: 음수, 매도: 양수).
    pub fn net_value(&self) -> Decimal {
        let notional = self.notional_value();
        match self.side {
            Side::Buy => -(notional + self.commission),
            Side::Sell => notional - self.commission - self.tax,
        }
    }
}
