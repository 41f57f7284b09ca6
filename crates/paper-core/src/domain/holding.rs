//! 보유 종목.
//!
//! `Holding`은 가상 계좌가 현재 보유 중인 한 종목의 수량과 평균 단가를
//! 나타냅니다. 최초 매수 시 생성되고, 이후 매수/매도마다 갱신되며,
//! 수량이 0이 되면 계좌에서 제거됩니다.

use crate::types::{Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 한 종목의 보유 내역.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    /// 종목 코드
    pub code: String,
    /// 종목명
    pub name: String,
    /// 보유 수량
    pub quantity: Quantity,
    /// 평균 매수 단가
    pub avg_price: Price,
    /// 마지막 시세
    pub last_price: Price,
    /// 최초 매수 타임스탬프
    pub opened_at: DateTime<Utc>,
    /// 마지막 업데이트 타임스탬프
    pub updated_at: DateTime<Utc>,
}

impl Holding {
    /// 최초 매수로 새 보유 종목을 생성합니다.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        let now = Utc::now();
        Self {
            code: code.into(),
            name: name.into(),
            quantity,
            avg_price: price,
            last_price: price,
            opened_at: now,
            updated_at: now,
        }
    }

    /// 평가 금액을 반환합니다.
    pub fn market_value(&self) -> Decimal {
        self.last_price * self.quantity
    }

    /// 매수 원가를 반환합니다.
    pub fn cost_basis(&self) -> Decimal {
        self.avg_price * self.quantity
    }

    /// 미실현 손익을 반환합니다.
    pub fn unrealized_pnl(&self) -> Decimal {
        (self.last_price - self.avg_price) * self.quantity
    }

    /// 수익률(%)을 반환합니다.
    pub fn return_pct(&self) -> Decimal {
        if self.avg_price.is_zero() {
            return Decimal::ZERO;
        }
        (self.last_price - self.avg_price) / self.avg_price * Decimal::from(100)
    }

    /// 마지막 시세를 갱신합니다.
    pub fn update_price(&mut self, price: Price) {
        self.last_price = price;
        self.updated_at = Utc::now();
    }

    /// 추가 매수를 반영합니다 (평균 단가를 거래량 가중으로 갱신).
    pub fn apply_buy(&mut self, price: Price, quantity: Quantity) {
        let total_cost = self.cost_basis() + price * quantity;
        self.quantity += quantity;
        if !self.quantity.is_zero() {
            self.avg_price = total_cost / self.quantity;
        }
        self.last_price = price;
        self.updated_at = Utc::now();
    }

    /// 매도를 반영하고 (체결 수량, 원가 대비 총손익)을 반환합니다.
    ///
    /// 요청 수량이 보유 수량보다 크면 보유 수량으로 잘라서 처리합니다.
    pub fn apply_sell(&mut self, price: Price, quantity: Quantity) -> (Quantity, Decimal) {
        let sold = quantity.min(self.quantity);
        let pnl = (price - self.avg_price) * sold;
        self.quantity -= sold;
        self.last_price = price;
        self.updated_at = Utc::now();
        (sold, pnl)
    }

    /// 보유 수량이 0인지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.quantity.is_zero()
    }
}
