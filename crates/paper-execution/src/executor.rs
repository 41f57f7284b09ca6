//! 주문 실행기.
//!
//! 제공 기능:
//! - 주문 생성 및 제출
//! - 시장가/지정가/스톱 주문을 원장에 대해 실행
//! - 대기 주문 관리 및 시세 기반 트리거 검사
//! - 주문 취소/만료 처리
//! - 체결 이력 및 실행 통계
//!
//! 주문의 `state` 필드는 항상 동일 ID의 생명주기 상태 기계를 투영하며,
//! 실행기의 모든 상태 변경은 생명주기 이벤트를 통해 일어납니다.

use chrono::{DateTime, Utc};
use paper_core::{
    Order, OrderEvent, OrderState, OrderType, Price, Quantity, Side, TradeReason, TradeRecord,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ledger::{Ledger, LedgerError};
use crate::lifecycle::{LifecycleError, LifecycleManager, OrderLifecycle};

/// 실행기 에러 타입.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// 주문을 찾을 수 없음
    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    /// 이미 최종 상태인 주문에 대한 요청 (취소가 체결과 경합한 경우 포함)
    #[error("Order already complete: {0}")]
    AlreadyComplete(Uuid),

    /// 잘못된 주문 파라미터
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// 원장이 주문을 거부함 (주문은 Rejected 상태로 전이됨)
    #[error("Order {order_id} rejected: {reason}")]
    Rejected {
        order_id: Uuid,
        #[source]
        reason: LedgerError,
    },

    /// 생명주기 전이 오류 (호출자 버그)
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// 실행 통계.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub total_orders: usize,
    pub filled_orders: usize,
    pub cancelled_orders: usize,
    pub rejected_orders: usize,
    pub active_orders: usize,
    pub buy_fills: usize,
    pub sell_fills: usize,
    pub total_commission: Decimal,
    pub total_tax: Decimal,
    pub fill_rate: f64,
}

/// 주문 생성/제출/실행을 담당하는 실행기.
#[derive(Debug, Default)]
pub struct OrderExecutor {
    /// ID별 모든 주문
    orders: HashMap<Uuid, Order>,
    /// 체결 대기 중인 주문 ID (제출 순서 유지)
    pending: Vec<Uuid>,
    /// 주문별 생명주기 상태 기계
    lifecycles: LifecycleManager,
    /// 체결 이력
    fills: Vec<TradeRecord>,
}

impl OrderExecutor {
    /// 새 실행기를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== 주문 생성 ====================

    /// 새 주문을 생성합니다. 부수 효과 없이 `Created` 주문과 생명주기를
    /// 등록합니다.
    pub fn create_order(
        &mut self,
        code: &str,
        name: &str,
        side: Side,
        order_type: OrderType,
        quantity: Quantity,
        limit_price: Option<Price>,
        stop_price: Option<Price>,
    ) -> Result<Order, ExecutorError> {
        if quantity <= Decimal::ZERO {
            return Err(ExecutorError::InvalidOrder(format!(
                "quantity must be positive, got {}",
                quantity
            )));
        }

        let order = match order_type {
            OrderType::Market => Order::market(code, name, side, quantity),
            OrderType::Limit => {
                let price = limit_price.ok_or_else(|| {
                    ExecutorError::InvalidOrder("limit order requires a limit price".into())
                })?;
                Order::limit(code, name, side, quantity, price)
            }
            OrderType::Stop => {
                let price = stop_price.ok_or_else(|| {
                    ExecutorError::InvalidOrder("stop order requires a stop price".into())
                })?;
                Order::stop(code, name, side, quantity, price)
            }
            OrderType::StopLimit => {
                let stop = stop_price.ok_or_else(|| {
                    ExecutorError::InvalidOrder("stop-limit order requires a stop price".into())
                })?;
                let limit = limit_price.ok_or_else(|| {
                    ExecutorError::InvalidOrder("stop-limit order requires a limit price".into())
                })?;
                Order::stop_limit(code, name, side, quantity, stop, limit)
            }
        };

        self.lifecycles.create(order.id);
        self.orders.insert(order.id, order.clone());

        debug!(order_id = %order.id, code = %code, side = %side, order_type = %order_type, "주문 생성");
        Ok(order)
    }

    /// 주문을 제출합니다.
    ///
    /// 가상 증권사는 즉시 접수하므로 제출과 접수 확인이 한 번에 일어나며,
    /// 주문은 대기 목록에 올라갑니다.
    pub fn submit_order(&mut self, order_id: Uuid) -> Result<(), ExecutorError> {
        let order = self
            .orders
            .get(&order_id)
            .ok_or(ExecutorError::OrderNotFound(order_id))?;
        if order.state.is_terminal() {
            return Err(ExecutorError::AlreadyComplete(order_id));
        }

        let lifecycle = self
            .lifecycles
            .get_mut(order_id)
            .ok_or(LifecycleError::NotFound(order_id))?;
        lifecycle.submit()?;
        lifecycle.acknowledge()?;
        self.sync_state(order_id);

        if !self.pending.contains(&order_id) {
            self.pending.push(order_id);
        }
        Ok(())
    }

    // ==================== 주문 실행 ====================

    /// 주문을 현재 가격으로 원장에 대해 실행합니다.
    ///
    /// 성공 시 주문은 `Filled`가 되고 체결 이력에 추가됩니다. 원장이
    /// 거부하면 주문은 `Rejected`가 되고 거부 사유가 그대로 반환됩니다.
    pub fn execute_market_order(
        &mut self,
        order_id: Uuid,
        price: Price,
        ledger: &mut Ledger,
        reason: TradeReason,
    ) -> Result<TradeRecord, ExecutorError> {
        let order = self
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(ExecutorError::OrderNotFound(order_id))?;
        if order.state.is_terminal() {
            return Err(ExecutorError::AlreadyComplete(order_id));
        }

        let quantity = order.remaining_quantity();
        let result = match order.side {
            Side::Buy => ledger
                .buy(&order.code, &order.name, price, quantity)
                .map(|fill| (fill.quantity, fill.price, fill.commission, Decimal::ZERO, Decimal::ZERO)),
            Side::Sell => ledger
                .sell(&order.code, price, Some(quantity))
                .map(|fill| (fill.quantity, fill.price, fill.commission, fill.tax, fill.realized_pnl)),
        };

        match result {
            Ok((fill_qty, fill_price, commission, tax, realized_pnl)) => {
                {
                    let lifecycle = self
                        .lifecycles
                        .get_mut(order_id)
                        .ok_or(LifecycleError::NotFound(order_id))?;
                    lifecycle.fill(json!({
                        "price": fill_price.to_string(),
                        "quantity": fill_qty.to_string(),
                        "commission": commission.to_string(),
                    }))?;
                }

                if let Some(stored) = self.orders.get_mut(&order_id) {
                    stored.filled_quantity += fill_qty;
                    stored.filled_price = Some(fill_price);
                    stored.commission += commission;
                    stored.tax += tax;
                }
                self.sync_state(order_id);
                self.pending.retain(|id| *id != order_id);

                let record =
                    TradeRecord::new(order_id, &order.code, &order.name, order.side, fill_qty, fill_price)
                        .with_costs(commission, tax)
                        .with_realized_pnl(realized_pnl)
                        .with_reason(reason);
                self.fills.push(record.clone());

                debug!(
                    order_id = %order_id,
                    code = %order.code,
                    side = %order.side,
                    price = %fill_price,
                    quantity = %fill_qty,
                    "주문 체결"
                );
                Ok(record)
            }
            Err(ledger_err) => {
                {
                    let lifecycle = self
                        .lifecycles
                        .get_mut(order_id)
                        .ok_or(LifecycleError::NotFound(order_id))?;
                    lifecycle.reject(json!({ "reason": ledger_err.to_string() }))?;
                }
                self.sync_state(order_id);
                self.pending.retain(|id| *id != order_id);

                warn!(
                    order_id = %order_id,
                    code = %order.code,
                    reason = %ledger_err,
                    "주문 거부"
                );
                Err(ExecutorError::Rejected {
                    order_id,
                    reason: ledger_err,
                })
            }
        }
    }

    /// 대기 주문들을 새 시세에 대해 검사하고 조건을 충족한 주문을
    /// 실행합니다.
    ///
    /// 트리거 규칙:
    /// - 시장가: 항상
    /// - 지정가 매수: `price <= limit` / 지정가 매도: `price >= limit`
    /// - 스톱 매수: `price >= stop` / 스톱 매도: `price <= stop`
    /// - 스톱 지정가: 스톱 트리거 후 지정가 규칙 적용
    pub fn check_pending_orders(
        &mut self,
        prices: &HashMap<String, Price>,
        ledger: &mut Ledger,
    ) -> Vec<TradeRecord> {
        let candidates: Vec<(Uuid, Price, TradeReason)> = self
            .pending
            .iter()
            .filter_map(|id| {
                let order = self.orders.get(id)?;
                let price = *prices.get(&order.code)?;
                let reason = Self::trigger_reason(order, price)?;
                Some((*id, price, reason))
            })
            .collect();

        let mut executed = Vec::new();
        for (order_id, price, reason) in candidates {
            match self.execute_market_order(order_id, price, ledger, reason) {
                Ok(record) => executed.push(record),
                // 거부된 주문은 이미 Rejected로 전이되어 대기 목록에서 빠짐
                Err(ExecutorError::Rejected { .. }) => {}
                Err(e) => warn!(order_id = %order_id, error = %e, "대기 주문 실행 실패"),
            }
        }
        executed
    }

    fn trigger_reason(order: &Order, price: Price) -> Option<TradeReason> {
        match order.order_type {
            OrderType::Market => Some(TradeReason::Manual),
            OrderType::Limit => {
                let limit = order.limit_price?;
                let triggered = match order.side {
                    Side::Buy => price <= limit,
                    Side::Sell => price >= limit,
                };
                triggered.then_some(TradeReason::LimitTrigger)
            }
            OrderType::Stop => {
                let stop = order.stop_price?;
                let triggered = match order.side {
                    Side::Buy => price >= stop,
                    Side::Sell => price <= stop,
                };
                triggered.then_some(TradeReason::StopTrigger)
            }
            OrderType::StopLimit => {
                let stop = order.stop_price?;
                let limit = order.limit_price?;
                let triggered = match order.side {
                    Side::Buy => price >= stop && price <= limit,
                    Side::Sell => price <= stop && price >= limit,
                };
                triggered.then_some(TradeReason::StopTrigger)
            }
        }
    }

    // ==================== 취소/만료 ====================

    /// 주문을 취소합니다.
    ///
    /// 이미 최종 상태인 주문(체결이 취소보다 앞선 경우 포함)은
    /// `AlreadyComplete`로 거부되며, 이는 정상적인 결과로 다뤄야 합니다.
    pub fn cancel_order(&mut self, order_id: Uuid) -> Result<Order, ExecutorError> {
        let order = self
            .orders
            .get(&order_id)
            .ok_or(ExecutorError::OrderNotFound(order_id))?;
        if order.state.is_terminal() {
            return Err(ExecutorError::AlreadyComplete(order_id));
        }

        self.lifecycles
            .get_mut(order_id)
            .ok_or(LifecycleError::NotFound(order_id))?
            .cancel()?;
        self.sync_state(order_id);
        self.pending.retain(|id| *id != order_id);

        debug!(order_id = %order_id, "주문 취소");
        self.orders
            .get(&order_id)
            .cloned()
            .ok_or(ExecutorError::OrderNotFound(order_id))
    }

    /// 모든 대기 주문을 취소하고 취소된 주문 ID를 반환합니다.
    pub fn cancel_all_pending(&mut self) -> Vec<Uuid> {
        let ids = self.pending.clone();
        let mut cancelled = Vec::new();
        for id in ids {
            if self.cancel_order(id).is_ok() {
                cancelled.push(id);
            }
        }
        cancelled
    }

    /// 주문을 만료 처리합니다.
    ///
    /// 엔진에는 자체 만료 시계가 없으므로 세션 타이머 등 호출자가
    /// 명시적으로 주입해야 합니다.
    pub fn expire_order(&mut self, order_id: Uuid) -> Result<(), ExecutorError> {
        let order = self
            .orders
            .get(&order_id)
            .ok_or(ExecutorError::OrderNotFound(order_id))?;
        if order.state.is_terminal() {
            return Err(ExecutorError::AlreadyComplete(order_id));
        }

        self.lifecycles
            .get_mut(order_id)
            .ok_or(LifecycleError::NotFound(order_id))?
            .expire()?;
        self.sync_state(order_id);
        self.pending.retain(|id| *id != order_id);
        Ok(())
    }

    // ==================== 조회 ====================

    /// ID로 주문을 조회합니다.
    pub fn get_order(&self, order_id: Uuid) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    /// 대기 중인 주문들을 제출 순서대로 반환합니다.
    pub fn pending_orders(&self) -> Vec<&Order> {
        self.pending
            .iter()
            .filter_map(|id| self.orders.get(id))
            .collect()
    }

    /// 체결 이력을 반환합니다.
    pub fn fills(&self) -> &[TradeRecord] {
        &self.fills
    }

    /// 특정 종목의 체결 이력을 최근 것부터 최대 `limit`개 반환합니다.
    pub fn fills_for_code(&self, code: &str, limit: usize) -> Vec<&TradeRecord> {
        self.fills
            .iter()
            .rev()
            .filter(|t| t.code == code)
            .take(limit)
            .collect()
    }

    /// 주문의 생명주기를 조회합니다.
    pub fn lifecycle(&self, order_id: Uuid) -> Option<&OrderLifecycle> {
        self.lifecycles.get(order_id)
    }

    /// 주문의 현재 상태에서 허용되는 이벤트들을 반환합니다.
    pub fn valid_events(&self, order_id: Uuid) -> Vec<OrderEvent> {
        self.lifecycles
            .get(order_id)
            .map(|lc| lc.valid_events())
            .unwrap_or_default()
    }

    /// 총 주문 수를 반환합니다.
    pub fn total_orders(&self) -> usize {
        self.orders.len()
    }

    /// 실행 통계를 반환합니다.
    pub fn stats(&self) -> ExecutionStats {
        let total = self.orders.len();
        let filled = self
            .orders
            .values()
            .filter(|o| o.state == OrderState::Filled)
            .count();
        let cancelled = self
            .orders
            .values()
            .filter(|o| o.state == OrderState::Cancelled)
            .count();
        let rejected = self
            .orders
            .values()
            .filter(|o| o.state == OrderState::Rejected)
            .count();
        let active = self.orders.values().filter(|o| o.is_active()).count();

        let buy_fills = self.fills.iter().filter(|t| t.side == Side::Buy).count();
        let sell_fills = self.fills.iter().filter(|t| t.side == Side::Sell).count();

        ExecutionStats {
            total_orders: total,
            filled_orders: filled,
            cancelled_orders: cancelled,
            rejected_orders: rejected,
            active_orders: active,
            buy_fills,
            sell_fills,
            total_commission: self.fills.iter().map(|t| t.commission).sum(),
            total_tax: self.fills.iter().map(|t| t.tax).sum(),
            fill_rate: if total > 0 {
                filled as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    // ==================== 정리 ====================

    /// 특정 시각보다 오래된 최종 상태 주문과 생명주기를 제거합니다.
    pub fn cleanup_old_orders(&mut self, older_than: DateTime<Utc>) {
        let to_remove: Vec<Uuid> = self
            .orders
            .iter()
            .filter(|(_, o)| o.state.is_terminal() && o.updated_at < older_than)
            .map(|(id, _)| *id)
            .collect();

        for id in to_remove {
            self.orders.remove(&id);
            self.lifecycles.remove(id);
        }
    }

    /// 최종 상태 생명주기를 보존 한도까지만 남깁니다.
    pub fn gc_lifecycles(&mut self, retain: usize) -> usize {
        self.lifecycles.gc(retain)
    }

    // ==================== 내부 ====================

    /// 주문의 상태 투영을 생명주기와 동기화합니다.
    fn sync_state(&mut self, order_id: Uuid) {
        if let (Some(order), Some(lifecycle)) =
            (self.orders.get_mut(&order_id), self.lifecycles.get(order_id))
        {
            order.state = lifecycle.state();
            order.updated_at = Utc::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper_core::TradingConfig;
    use rust_decimal::prelude::FromPrimitive;

    /// Decimal 생성을 위한 헬퍼 매크로
    macro_rules! dec {
        ($val:expr) => {
            Decimal::from_f64($val as f64).unwrap()
        };
    }

    fn setup() -> (OrderExecutor, Ledger) {
        (OrderExecutor::new(), Ledger::new(TradingConfig::default()))
    }

    fn create_market_buy(executor: &mut OrderExecutor, quantity: Decimal) -> Order {
        executor
            .create_order(
                "005930",
                "삼성전자",
                Side::Buy,
                OrderType::Market,
                quantity,
                None,
                None,
            )
            .unwrap()
    }

    #[test]
    fn test_create_and_submit() {
        let (mut executor, _) = setup();

        let order = create_market_buy(&mut executor, dec!(10));
        assert_eq!(order.state, OrderState::Created);
        assert!(executor.pending_orders().is_empty());

        executor.submit_order(order.id).unwrap();

        let stored = executor.get_order(order.id).unwrap();
        assert_eq!(stored.state, OrderState::Submitted);
        assert_eq!(executor.pending_orders().len(), 1);
    }

    #[test]
    fn test_execute_market_buy() {
        let (mut executor, mut ledger) = setup();

        let order = create_market_buy(&mut executor, dec!(10));
        executor.submit_order(order.id).unwrap();

        let record = executor
            .execute_market_order(order.id, dec!(70000), &mut ledger, TradeReason::Manual)
            .unwrap();

        assert_eq!(record.quantity, dec!(10));
        assert_eq!(record.price, dec!(70000));

        let stored = executor.get_order(order.id).unwrap();
        assert_eq!(stored.state, OrderState::Filled);
        assert_eq!(stored.filled_quantity, dec!(10));
        assert!(executor.pending_orders().is_empty());
        assert_eq!(ledger.position_count(), 1);
    }

    #[test]
    fn test_ledger_rejection_marks_order_rejected() {
        let (mut executor, mut ledger) = setup();

        // 자본금보다 큰 주문
        let order = create_market_buy(&mut executor, dec!(1000));
        executor.submit_order(order.id).unwrap();

        let result =
            executor.execute_market_order(order.id, dec!(70000), &mut ledger, TradeReason::Manual);

        assert!(matches!(
            result,
            Err(ExecutorError::Rejected {
                reason: LedgerError::InsufficientCash { .. },
                ..
            })
        ));

        let stored = executor.get_order(order.id).unwrap();
        assert_eq!(stored.state, OrderState::Rejected);
        assert!(executor.pending_orders().is_empty());
        // 원장은 변경되지 않음
        assert_eq!(ledger.cash(), dec!(10000000));
    }

    #[test]
    fn test_limit_buy_triggers_at_or_below_limit() {
        let (mut executor, mut ledger) = setup();

        let order = executor
            .create_order(
                "005930",
                "삼성전자",
                Side::Buy,
                OrderType::Limit,
                dec!(10),
                Some(dec!(69000)),
                None,
            )
            .unwrap();
        executor.submit_order(order.id).unwrap();

        // 지정가보다 높은 시세: 미체결
        let mut prices = HashMap::new();
        prices.insert("005930".to_string(), dec!(70000));
        assert!(executor.check_pending_orders(&prices, &mut ledger).is_empty());
        assert_eq!(executor.pending_orders().len(), 1);

        // 지정가 이하로 하락: 체결
        prices.insert("005930".to_string(), dec!(68500));
        let executed = executor.check_pending_orders(&prices, &mut ledger);

        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].reason, TradeReason::LimitTrigger);
        assert_eq!(executed[0].price, dec!(68500));
        assert!(executor.pending_orders().is_empty());
    }

    #[test]
    fn test_stop_sell_triggers_at_or_below_stop() {
        let (mut executor, mut ledger) = setup();

        // 먼저 보유 물량 확보
        let buy = create_market_buy(&mut executor, dec!(10));
        executor.submit_order(buy.id).unwrap();
        executor
            .execute_market_order(buy.id, dec!(70000), &mut ledger, TradeReason::Manual)
            .unwrap();

        let stop = executor
            .create_order(
                "005930",
                "삼성전자",
                Side::Sell,
                OrderType::Stop,
                dec!(10),
                None,
                Some(dec!(68000)),
            )
            .unwrap();
        executor.submit_order(stop.id).unwrap();

        let mut prices = HashMap::new();
        prices.insert("005930".to_string(), dec!(69000));
        assert!(executor.check_pending_orders(&prices, &mut ledger).is_empty());

        prices.insert("005930".to_string(), dec!(67500));
        let executed = executor.check_pending_orders(&prices, &mut ledger);

        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].reason, TradeReason::StopTrigger);
        assert_eq!(executed[0].side, Side::Sell);
    }

    #[test]
    fn test_cancel_pending_order() {
        let (mut executor, _) = setup();

        let order = executor
            .create_order(
                "005930",
                "삼성전자",
                Side::Buy,
                OrderType::Limit,
                dec!(10),
                Some(dec!(69000)),
                None,
            )
            .unwrap();
        executor.submit_order(order.id).unwrap();

        let cancelled = executor.cancel_order(order.id).unwrap();

        assert_eq!(cancelled.state, OrderState::Cancelled);
        assert!(executor.pending_orders().is_empty());
    }

    #[test]
    fn test_cancel_filled_order_is_already_complete() {
        let (mut executor, mut ledger) = setup();

        let order = create_market_buy(&mut executor, dec!(10));
        executor.submit_order(order.id).unwrap();
        executor
            .execute_market_order(order.id, dec!(70000), &mut ledger, TradeReason::Manual)
            .unwrap();

        // 체결이 취소보다 앞섬: AlreadyComplete, 주문은 Filled 유지
        let result = executor.cancel_order(order.id);
        assert!(matches!(result, Err(ExecutorError::AlreadyComplete(_))));
        assert_eq!(
            executor.get_order(order.id).unwrap().state,
            OrderState::Filled
        );
    }

    #[test]
    fn test_cancel_all_pending() {
        let (mut executor, _) = setup();

        for _ in 0..3 {
            let order = executor
                .create_order(
                    "005930",
                    "삼성전자",
                    Side::Buy,
                    OrderType::Limit,
                    dec!(1),
                    Some(dec!(60000)),
                    None,
                )
                .unwrap();
            executor.submit_order(order.id).unwrap();
        }

        let cancelled = executor.cancel_all_pending();

        assert_eq!(cancelled.len(), 3);
        assert!(executor.pending_orders().is_empty());
    }

    #[test]
    fn test_expire_order() {
        let (mut executor, _) = setup();

        let order = executor
            .create_order(
                "005930",
                "삼성전자",
                Side::Buy,
                OrderType::Limit,
                dec!(1),
                Some(dec!(60000)),
                None,
            )
            .unwrap();
        executor.submit_order(order.id).unwrap();

        executor.expire_order(order.id).unwrap();

        assert_eq!(
            executor.get_order(order.id).unwrap().state,
            OrderState::Expired
        );
        assert!(executor.pending_orders().is_empty());
    }

    #[test]
    fn test_invalid_order_parameters() {
        let (mut executor, _) = setup();

        // 수량 0
        let result = executor.create_order(
            "005930",
            "삼성전자",
            Side::Buy,
            OrderType::Market,
            Decimal::ZERO,
            None,
            None,
        );
        assert!(matches!(result, Err(ExecutorError::InvalidOrder(_))));

        // 지정가 없는 지정가 주문
        let result = executor.create_order(
            "005930",
            "삼성전자",
            Side::Buy,
            OrderType::Limit,
            dec!(10),
            None,
            None,
        );
        assert!(matches!(result, Err(ExecutorError::InvalidOrder(_))));
    }

    #[test]
    fn test_stats_and_history() {
        let (mut executor, mut ledger) = setup();

        let buy = create_market_buy(&mut executor, dec!(10));
        executor.submit_order(buy.id).unwrap();
        executor
            .execute_market_order(buy.id, dec!(70000), &mut ledger, TradeReason::Manual)
            .unwrap();

        let sell = executor
            .create_order(
                "005930",
                "삼성전자",
                Side::Sell,
                OrderType::Market,
                dec!(10),
                None,
                None,
            )
            .unwrap();
        executor.submit_order(sell.id).unwrap();
        executor
            .execute_market_order(sell.id, dec!(71000), &mut ledger, TradeReason::Manual)
            .unwrap();

        let pending = executor
            .create_order(
                "000660",
                "SK하이닉스",
                Side::Buy,
                OrderType::Limit,
                dec!(1),
                Some(dec!(100000)),
                None,
            )
            .unwrap();
        executor.submit_order(pending.id).unwrap();

        let stats = executor.stats();
        assert_eq!(stats.total_orders, 3);
        assert_eq!(stats.filled_orders, 2);
        assert_eq!(stats.active_orders, 1);
        assert_eq!(stats.buy_fills, 1);
        assert_eq!(stats.sell_fills, 1);
        assert!(stats.total_commission > Decimal::ZERO);
        assert!(stats.total_tax > Decimal::ZERO);

        let history = executor.fills_for_code("005930", 10);
        assert_eq!(history.len(), 2);
        // 최근 체결부터 반환
        assert_eq!(history[0].side, Side::Sell);
    }
}
