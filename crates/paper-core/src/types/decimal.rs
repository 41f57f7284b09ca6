//! 정밀한 금융 계산을 위한 Decimal 유틸리티.
//!
//! 원화 기준 금액/수량 계산에 필요한 정밀 소수점 타입과 유틸리티를 제공합니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 금융 정밀도를 위한 가격 타입.
pub type Price = Decimal;

/// 주문 수량을 위한 타입.
pub type Quantity = Decimal;

/// 퍼센트 타입 (5 = 5%).
pub type Percentage = Decimal;

/// Decimal 연산을 위한 확장 트레이트.
pub trait DecimalExt {
    /// 퍼센트 문자열로 변환합니다 (예: "5.25%").
    fn to_percentage_string(&self) -> String;

    /// 원 단위로 반올림합니다 (원화는 소수점이 없음).
    fn round_krw(&self) -> Decimal;
}

impl DecimalExt for Decimal {
    fn to_percentage_string(&self) -> String {
        format!("{:.2}%", self)
    }

    fn round_krw(&self) -> Decimal {
        self.round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
    }
}

/// 통화가 포함된 금액.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// 금액
    pub amount: Decimal,
    /// 통화
    pub currency: String,
}

impl Money {
    /// 새 금액을 생성합니다.
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into().to_uppercase(),
        }
    }

    /// 원화 금액을 생성합니다.
    pub fn krw(amount: Decimal) -> Self {
        Self::new(amount, "KRW")
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
