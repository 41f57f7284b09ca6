//! 주문 타입 및 상태 정의.
//!
//! 이 모듈은 주문 관련 타입을 정의합니다:
//! - `Side` - 주문 방향 (매수/매도)
//! - `OrderType` - 주문 유형 (시장가, 지정가, 스톱, 스톱지정가)
//! - `OrderState` - 주문 생명주기 상태
//! - `OrderEvent` - 상태 전이를 일으키는 이벤트
//! - `Order` - 주문 엔티티

use crate::types::{Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 주문 방향 (매수 또는 매도).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// 매수
    Buy,
    /// 매도
    Sell,
}

impl Side {
    /// 반대 방향을 반환합니다.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// 주문 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// 시장가 주문 - 현재 가격으로 즉시 체결
    Market,
    /// 지정가 주문 - 지정 가격 이상/이하에서 체결
    Limit,
    /// 스톱 주문 - 트리거 가격 도달 시 시장가 체결
    Stop,
    /// 스톱 지정가 주문 - 트리거 후 지정가 규칙 적용
    StopLimit,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::Stop => write!(f, "STOP"),
            OrderType::StopLimit => write!(f, "STOP_LIMIT"),
        }
    }
}

/// 주문 생명주기 상태.
///
/// `Filled`, `Cancelled`, `Rejected`, `Expired`, `Failed`는 최종 상태이며,
/// 최종 상태에서 빠져나가는 전이는 존재하지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    /// 주문 생성됨 (아직 제출되지 않음)
    Created,
    /// 제출 요청됨 (접수 대기)
    PendingSubmit,
    /// 접수 완료
    Submitted,
    /// 체결 대기
    PendingFill,
    /// 부분 체결됨
    PartialFill,
    /// 전량 체결됨
    Filled,
    /// 취소됨
    Cancelled,
    /// 거부됨
    Rejected,
    /// 유효 기간 만료
    Expired,
    /// 처리 실패
    Failed,
}

impl OrderState {
    /// 주문이 최종 상태인지 확인합니다.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::Filled
                | OrderState::Cancelled
                | OrderState::Rejected
                | OrderState::Expired
                | OrderState::Failed
        )
    }

    /// 주문이 여전히 활성 상태인지 확인합니다.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderState::Created => "CREATED",
            OrderState::PendingSubmit => "PENDING_SUBMIT",
            OrderState::Submitted => "SUBMITTED",
            OrderState::PendingFill => "PENDING_FILL",
            OrderState::PartialFill => "PARTIAL_FILL",
            OrderState::Filled => "FILLED",
            OrderState::Cancelled => "CANCELLED",
            OrderState::Rejected => "REJECTED",
            OrderState::Expired => "EXPIRED",
            OrderState::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// 주문 상태 전이를 일으키는 이벤트.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEvent {
    /// 제출 요청
    Submit,
    /// 접수 확인
    Ack,
    /// 부분 체결
    Partial,
    /// 전량 체결
    Fill,
    /// 취소 요청
    Cancel,
    /// 취소 확인
    CancelAck,
    /// 거부
    Reject,
    /// 만료
    Expire,
    /// 실패
    Fail,
}

impl std::fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderEvent::Submit => "SUBMIT",
            OrderEvent::Ack => "ACK",
            OrderEvent::Partial => "PARTIAL",
            OrderEvent::Fill => "FILL",
            OrderEvent::Cancel => "CANCEL",
            OrderEvent::CancelAck => "CANCEL_ACK",
            OrderEvent::Reject => "REJECT",
            OrderEvent::Expire => "EXPIRE",
            OrderEvent::Fail => "FAIL",
        };
        write!(f, "{}", s)
    }
}

/// 주문 엔티티.
///
/// `state`는 동일 주문 ID의 생명주기 상태를 그대로 투영한 읽기 전용 값이며,
/// 상태 전이는 항상 생명주기 상태 기계를 통해서만 일어납니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// 내부 주문 ID
    pub id: Uuid,
    /// 종목 코드
    pub code: String,
    /// 종목명
    pub name: String,
    /// 주문 방향
    pub side: Side,
    /// 주문 유형
    pub order_type: OrderType,
    /// 주문 수량
    pub quantity: Quantity,
    /// 지정가 (지정가/스톱지정가 주문)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Price>,
    /// 스톱 트리거 가격 (스톱/스톱지정가 주문)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Price>,
    /// 현재 상태
    pub state: OrderState,
    /// 체결된 수량
    pub filled_quantity: Quantity,
    /// 체결 가격 (슬리피지 반영)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_price: Option<Price>,
    /// 부과된 수수료
    pub commission: Decimal,
    /// 부과된 거래세 (매도 시)
    pub tax: Decimal,
    /// 생성 타임스탬프
    pub created_at: DateTime<Utc>,
    /// 마지막 업데이트 타임스탬프
    pub updated_at: DateTime<Utc>,
}

impl Order {
    fn build(
        code: impl Into<String>,
        name: impl Into<String>,
        side: Side,
        order_type: OrderType,
        quantity: Quantity,
        limit_price: Option<Price>,
        stop_price: Option<Price>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            side,
            order_type,
            quantity,
            limit_price,
            stop_price,
            state: OrderState::Created,
            filled_quantity: Decimal::ZERO,
            filled_price: None,
            commission: Decimal::ZERO,
            tax: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// 시장가 주문을 생성합니다.
    pub fn market(
        code: impl Into<String>,
        name: impl Into<String>,
        side: Side,
        quantity: Quantity,
    ) -> Self {
        Self::build(code, name, side, OrderType::Market, quantity, None, None)
    }

    /// 지정가 주문을 생성합니다.
    pub fn limit(
        code: impl Into<String>,
        name: impl Into<String>,
        side: Side,
        quantity: Quantity,
        limit_price: Price,
    ) -> Self {
        Self::build(
            code,
            name,
            side,
            OrderType::Limit,
            quantity,
            Some(limit_price),
            None,
        )
    }

    /// 스톱 주문을 생성합니다.
    pub fn stop(
        code: impl Into<String>,
        name: impl Into<String>,
        side: Side,
        quantity: Quantity,
        stop_price: Price,
    ) -> Self {
        Self::build(
            code,
            name,
            side,
            OrderType::Stop,
            quantity,
            None,
            Some(stop_price),
        )
    }

    /// 스톱 지정가 주문을 생성합니다.
    pub fn stop_limit(
        code: impl Into<String>,
        name: impl Into<String>,
        side: Side,
        quantity: Quantity,
        stop_price: Price,
        limit_price: Price,
    ) -> Self {
        Self::build(
            code,
            name,
            side,
            OrderType::StopLimit,
            quantity,
            Some(limit_price),
            Some(stop_price),
        )
    }

    /// 남은 체결 수량을 반환합니다.
    pub fn remaining_quantity(&self) -> Quantity {
        self.quantity - self.filled_quantity
    }

    /// 주문이 전량 체결되었는지 확인합니다.
    pub fn is_filled(&self) -> bool {
        self.state == OrderState::Filled
    }

    /// 주문이 활성 상태인지 확인합니다.
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// 주문의 명목 가치를 계산합니다 (지정가 기준).
    pub fn notional_value(&self) -> Option<Decimal> {
        self.limit_price.map(|p| p * self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_market_order() {
        let order = Order::market("005930", "삼성전자", Side::Buy, dec!(10));

        assert_eq!(order.state, OrderState::Created);
        assert_eq!(order.order_type, OrderType::Market);
        assert_eq!(order.filled_quantity, Decimal::ZERO);
        assert!(order.limit_price.is_none());
        assert_eq!(order.remaining_quantity(), dec!(10));
    }

    #[test]
    fn test_limit_order() {
        let order = Order::limit("005930", "삼성전자", Side::Sell, dec!(5), dec!(71000));

        assert_eq!(order.order_type, OrderType::Limit);
        assert_eq!(order.limit_price, Some(dec!(71000)));
        assert_eq!(order.notional_value(), Some(dec!(355000)));
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderState::Filled.is_terminal());
        assert!(OrderState::Cancelled.is_terminal());
        assert!(OrderState::Rejected.is_terminal());
        assert!(OrderState::Expired.is_terminal());
        assert!(OrderState::Failed.is_terminal());

        assert!(OrderState::Created.is_active());
        assert!(OrderState::PendingSubmit.is_active());
        assert!(OrderState::Submitted.is_active());
        assert!(OrderState::PendingFill.is_active());
        assert!(OrderState::PartialFill.is_active());
    }
}
