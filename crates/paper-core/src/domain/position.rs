//! 포지션 추적.
//!
//! `Position`은 한 종목의 진입부터 전량 청산까지의 생애를 기록합니다.
//! 불변 조건: `quantity = entry_quantity - Σ exit.quantity`이며,
//! 수량이 0이 되는 순간 포지션은 종료되어 보고 목적 외에는 변경되지 않습니다.

use crate::domain::TradeReason;
use crate::types::{Percentage, Price, Quantity};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 포지션 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    /// 진입 수량 전체 보유 중
    Open,
    /// 일부 청산됨
    Partial,
    /// 전량 청산됨
    Closed,
}

/// 포지션의 부분/전량 청산 기록.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionExit {
    /// 청산 가격
    pub price: Price,
    /// 청산 수량
    pub quantity: Quantity,
    /// 청산 사유
    pub reason: TradeReason,
    /// 청산 타임스탬프
    pub exited_at: DateTime<Utc>,
}

/// 한 종목의 진입-청산 생애를 나타내는 포지션.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// 내부 포지션 ID
    pub id: Uuid,
    /// 종목 코드
    pub code: String,
    /// 종목명
    pub name: String,
    /// 평균 진입 가격 (거래량 가중)
    pub entry_price: Price,
    /// 누적 진입 수량
    pub entry_quantity: Quantity,
    /// 현재 보유 수량
    pub quantity: Quantity,
    /// 청산 기록
    pub exits: Vec<PositionExit>,
    /// 실현 손익
    pub realized_pnl: Decimal,
    /// 마지막 시세
    pub last_price: Price,
    /// 손절 가격
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<Price>,
    /// 익절 가격
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<Price>,
    /// 추적 손절 비율 (5 = 5%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_stop_pct: Option<Percentage>,
    /// 진입 이후 관측된 최고가 (추적 손절 기준)
    pub highest_price: Price,
    /// 포지션 상태
    pub status: PositionStatus,
    /// 이 포지션을 연 전략 식별자
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<String>,
    /// 진입 타임스탬프
    pub opened_at: DateTime<Utc>,
    /// 마지막 업데이트 타임스탬프
    pub updated_at: DateTime<Utc>,
    /// 청산 완료 타임스탬프
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    /// 새 포지션을 생성합니다.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        entry_price: Price,
        quantity: Quantity,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            entry_price,
            entry_quantity: quantity,
            quantity,
            exits: Vec::new(),
            realized_pnl: Decimal::ZERO,
            last_price: entry_price,
            stop_loss: None,
            take_profit: None,
            trailing_stop_pct: None,
            highest_price: entry_price,
            status: PositionStatus::Open,
            strategy_id: None,
            opened_at: now,
            updated_at: now,
            closed_at: None,
        }
    }

    /// 손절 가격을 설정합니다.
    pub fn with_stop_loss(mut self, price: Price) -> Self {
        self.stop_loss = Some(price);
        self
    }

    /// 익절 가격을 설정합니다.
    pub fn with_take_profit(mut self, price: Price) -> Self {
        self.take_profit = Some(price);
        self
    }

    /// 추적 손절 비율을 설정합니다.
    pub fn with_trailing_stop(mut self, pct: Percentage) -> Self {
        self.trailing_stop_pct = Some(pct);
        self
    }

    /// 전략 식별자를 설정합니다.
    pub fn with_strategy(mut self, strategy_id: impl Into<String>) -> Self {
        self.strategy_id = Some(strategy_id.into());
        self
    }

    /// 포지션에 추가 진입합니다 (평균 단가를 거래량 가중으로 갱신).
    pub fn add(&mut self, price: Price, quantity: Quantity) {
        let total_cost = self.entry_price * self.quantity + price * quantity;
        self.quantity += quantity;
        self.entry_quantity += quantity;
        if !self.quantity.is_zero() {
            self.entry_price = total_cost / self.quantity;
        }
        self.update_price(price);
    }

    /// 포지션을 줄이고 실현 손익을 반환합니다.
    ///
    /// 요청 수량이 보유 수량보다 크면 보유 수량으로 잘라서 처리하며,
    /// 수량이 0이 되면 포지션을 종료 상태로 전환합니다.
    pub fn reduce(&mut self, price: Price, quantity: Quantity, reason: TradeReason) -> Decimal {
        let exit_qty = quantity.min(self.quantity);
        if exit_qty.is_zero() {
            return Decimal::ZERO;
        }

        let pnl = (price - self.entry_price) * exit_qty;
        let now = Utc::now();

        self.exits.push(PositionExit {
            price,
            quantity: exit_qty,
            reason,
            exited_at: now,
        });
        self.quantity -= exit_qty;
        self.realized_pnl += pnl;
        self.updated_at = now;

        if self.quantity.is_zero() {
            self.status = PositionStatus::Closed;
            self.closed_at = Some(now);
        } else {
            self.status = PositionStatus::Partial;
        }

        self.last_price = price;
        pnl
    }

    /// 마지막 시세를 갱신하고 최고가를 끌어올립니다.
    pub fn update_price(&mut self, price: Price) {
        self.last_price = price;
        if price > self.highest_price {
            self.highest_price = price;
        }
        self.updated_at = Utc::now();
    }

    /// 지금까지 청산된 총 수량을 반환합니다.
    pub fn exited_quantity(&self) -> Quantity {
        self.exits.iter().map(|e| e.quantity).sum()
    }

    /// 평가 금액을 반환합니다.
    pub fn market_value(&self) -> Decimal {
        self.last_price * self.quantity
    }

    /// 잔여 수량의 매수 원가를 반환합니다.
    pub fn cost_basis(&self) -> Decimal {
        self.entry_price * self.quantity
    }

    /// 미실현 손익을 반환합니다.
    pub fn unrealized_pnl(&self) -> Decimal {
        (self.last_price - self.entry_price) * self.quantity
    }

    /// 수익률(%)을 반환합니다.
    pub fn return_pct(&self) -> Decimal {
        if self.entry_price.is_zero() {
            return Decimal::ZERO;
        }
        (self.last_price - self.entry_price) / self.entry_price * Decimal::from(100)
    }

    /// 포지션이 열려 있는지 확인합니다.
    pub fn is_open(&self) -> bool {
        self.status != PositionStatus::Closed
    }

    /// 포지션이 종료되었는지 확인합니다.
    pub fn is_closed(&self) -> bool {
        self.status == PositionStatus::Closed
    }

    /// 보유 기간을 반환합니다 (종료 전이면 현재까지).
    pub fn holding_duration(&self) -> Duration {
        let end = self.closed_at.unwrap_or_else(Utc::now);
        end - self.opened_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_position_add_vwap() {
        let mut position = Position::new("005930", "삼성전자", dec!(70000), dec!(10));

        position.add(dec!(72000), dec!(10));

        assert_eq!(position.quantity, dec!(20));
        assert_eq!(position.entry_quantity, dec!(20));
        assert_eq!(position.entry_price, dec!(71000));
    }

    #[test]
    fn test_position_reduce_and_close() {
        let mut position = Position::new("005930", "삼성전자", dec!(70000), dec!(20));

        let pnl = position.reduce(dec!(75000), dec!(10), TradeReason::Manual);
        assert_eq!(pnl, dec!(50000));
        assert_eq!(position.status, PositionStatus::Partial);
        assert_eq!(position.quantity, dec!(10));

        let pnl = position.reduce(dec!(68000), dec!(10), TradeReason::StopLoss);
        assert_eq!(pnl, dec!(-20000));
        assert!(position.is_closed());
        assert!(position.closed_at.is_some());
        assert_eq!(position.realized_pnl, dec!(30000));
    }

    #[test]
    fn test_position_quantity_invariant() {
        let mut position = Position::new("005930", "삼성전자", dec!(70000), dec!(10));
        position.add(dec!(71000), dec!(5));
        position.reduce(dec!(72000), dec!(7), TradeReason::Manual);

        // quantity = entry_quantity - Σ exit.quantity
        assert_eq!(
            position.quantity,
            position.entry_quantity - position.exited_quantity()
        );
    }

    #[test]
    fn test_position_reduce_clamps() {
        let mut position = Position::new("005930", "삼성전자", dec!(70000), dec!(10));

        // 보유보다 많은 청산 요청은 보유 수량으로 잘림
        let pnl = position.reduce(dec!(71000), dec!(999), TradeReason::Manual);

        assert_eq!(pnl, dec!(10000)); // (71000-70000)*10
        assert!(position.is_closed());
        assert_eq!(position.exited_quantity(), dec!(10));
    }

    #[test]
    fn test_highest_price_ratchet() {
        let mut position = Position::new("005930", "삼성전자", dec!(70000), dec!(10));

        position.update_price(dec!(74000));
        assert_eq!(position.highest_price, dec!(74000));

        // 가격이 내려가도 최고가는 유지
        position.update_price(dec!(71000));
        assert_eq!(position.highest_price, dec!(74000));
        assert_eq!(position.last_price, dec!(71000));
    }
}
