//! 주문 생명주기 상태 기계.
//!
//! 제공 기능:
//! - (현재 상태, 이벤트) -> 다음 상태의 닫힌 전이 테이블
//! - 주문별 전이 이력 기록
//! - 전이 콜백 (콜백 오류는 상태를 오염시키지 않도록 격리)
//! - 주문 ID로 키잉된 생명주기 관리자
//!
//! 최종 상태(`Filled`, `Cancelled`, `Rejected`, `Expired`, `Failed`)에서의
//! 모든 이벤트는 `InvalidTransition`입니다. 이는 비즈니스 거부가 아니라
//! 호출자 버그를 뜻하는 하드 에러이며, 같은 호출을 재시도해도 성공하지
//! 않습니다.

use chrono::{DateTime, Utc};
use paper_core::{OrderEvent, OrderState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// 생명주기 에러 타입.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LifecycleError {
    /// 현재 상태에서 허용되지 않는 이벤트 (호출자 버그)
    #[error("Invalid transition: event {event} is not legal from state {state}")]
    InvalidTransition { state: OrderState, event: OrderEvent },

    /// 해당 주문의 생명주기가 존재하지 않음
    #[error("Lifecycle not found for order: {0}")]
    NotFound(Uuid),
}

/// 전이 테이블: (현재 상태, 이벤트)에 대한 다음 상태.
///
/// 테이블에 없는 조합은 `None`이며, 최종 상태는 어떤 이벤트도 받지
/// 않습니다.
pub fn next_state(state: OrderState, event: OrderEvent) -> Option<OrderState> {
    use OrderEvent::*;
    use OrderState::*;

    let next = match (state, event) {
        (Created, Submit) => PendingSubmit,
        (Created, Cancel) => Cancelled,
        (Created, Reject) => Rejected,
        (Created, Fail) => Failed,

        (PendingSubmit, Ack) => Submitted,
        (PendingSubmit, Cancel) => Cancelled,
        (PendingSubmit, Reject) => Rejected,
        (PendingSubmit, Expire) => Expired,
        (PendingSubmit, Fail) => Failed,

        (Submitted, Ack) => PendingFill,
        (Submitted, Partial) => PartialFill,
        (Submitted, Fill) => Filled,
        (Submitted, Cancel) => Cancelled,
        (Submitted, CancelAck) => Cancelled,
        (Submitted, Reject) => Rejected,
        (Submitted, Expire) => Expired,
        (Submitted, Fail) => Failed,

        (PendingFill, Partial) => PartialFill,
        (PendingFill, Fill) => Filled,
        (PendingFill, Cancel) => Cancelled,
        (PendingFill, CancelAck) => Cancelled,
        (PendingFill, Expire) => Expired,
        (PendingFill, Fail) => Failed,

        (PartialFill, Partial) => PartialFill,
        (PartialFill, Fill) => Filled,
        (PartialFill, Cancel) => Cancelled,
        (PartialFill, CancelAck) => Cancelled,
        (PartialFill, Expire) => Expired,
        (PartialFill, Fail) => Failed,

        // 최종 상태는 흡수 상태
        _ => return None,
    };
    Some(next)
}

const ALL_EVENTS: [OrderEvent; 9] = [
    OrderEvent::Submit,
    OrderEvent::Ack,
    OrderEvent::Partial,
    OrderEvent::Fill,
    OrderEvent::Cancel,
    OrderEvent::CancelAck,
    OrderEvent::Reject,
    OrderEvent::Expire,
    OrderEvent::Fail,
];

/// 타임스탬프가 포함된 전이 이력 항목.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// 전이 전 상태
    pub from: OrderState,
    /// 발생 이벤트
    pub event: OrderEvent,
    /// 전이 후 상태
    pub to: OrderState,
    /// 전이 타임스탬프
    pub timestamp: DateTime<Utc>,
    /// 이벤트 세부 정보 (체결 수량/가격, 거부 사유 등)
    pub details: serde_json::Value,
}

/// 전이 콜백 타입.
///
/// 콜백의 오류는 로그로 남기고 무시합니다. 상태 전이 자체는 콜백 결과와
/// 무관하게 이미 완료된 뒤입니다.
pub type TransitionCallback =
    Box<dyn Fn(&TransitionRecord) -> Result<(), Box<dyn std::error::Error>> + Send + Sync>;

/// 단일 주문의 생명주기 상태 기계.
pub struct OrderLifecycle {
    /// 주문 ID
    order_id: Uuid,
    /// 현재 상태
    state: OrderState,
    /// 전이 이력 (추가 전용)
    history: Vec<TransitionRecord>,
    /// 전이 콜백
    callback: Option<TransitionCallback>,
}

impl std::fmt::Debug for OrderLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderLifecycle")
            .field("order_id", &self.order_id)
            .field("state", &self.state)
            .field("history_len", &self.history.len())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl OrderLifecycle {
    /// `Created` 상태의 새 생명주기를 생성합니다.
    pub fn new(order_id: Uuid) -> Self {
        Self {
            order_id,
            state: OrderState::Created,
            history: Vec::new(),
            callback: None,
        }
    }

    /// 전이 콜백을 설정합니다.
    pub fn set_callback(&mut self, callback: TransitionCallback) {
        self.callback = Some(callback);
    }

    /// 주문 ID를 반환합니다.
    pub fn order_id(&self) -> Uuid {
        self.order_id
    }

    /// 현재 상태를 반환합니다.
    pub fn state(&self) -> OrderState {
        self.state
    }

    /// 전이 이력을 반환합니다.
    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    /// 마지막 전이 타임스탬프를 반환합니다.
    pub fn last_transition_at(&self) -> Option<DateTime<Utc>> {
        self.history.last().map(|r| r.timestamp)
    }

    /// 현재 상태가 최종 상태인지 확인합니다.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// 이벤트가 현재 상태에서 허용되는지 전이 없이 확인합니다.
    ///
    /// 멱등한 재시도를 위해 호출자가 사전에 합법성을 조사할 수 있습니다.
    pub fn can_transition(&self, event: OrderEvent) -> bool {
        next_state(self.state, event).is_some()
    }

    /// 현재 상태에서 허용되는 모든 이벤트를 반환합니다.
    pub fn valid_events(&self) -> Vec<OrderEvent> {
        ALL_EVENTS
            .iter()
            .copied()
            .filter(|&e| self.can_transition(e))
            .collect()
    }

    /// 이벤트를 적용해 상태를 전이합니다.
    ///
    /// 성공 시 상태 갱신과 이력 추가가 원자적으로 일어난 뒤 콜백이
    /// 호출됩니다. 콜백 오류는 로그만 남기고 무시합니다.
    pub fn transition(
        &mut self,
        event: OrderEvent,
        details: serde_json::Value,
    ) -> Result<OrderState, LifecycleError> {
        let next = next_state(self.state, event).ok_or(LifecycleError::InvalidTransition {
            state: self.state,
            event,
        })?;

        let from = self.state;
        let record = TransitionRecord {
            from,
            event,
            to: next,
            timestamp: Utc::now(),
            details,
        };

        self.state = next;
        self.history.push(record.clone());

        debug!(
            order_id = %self.order_id,
            from = %from,
            event = %event,
            to = %next,
            "주문 상태 전이"
        );

        if let Some(callback) = &self.callback {
            if let Err(e) = callback(&record) {
                warn!(
                    order_id = %self.order_id,
                    error = %e,
                    "전이 콜백 실패 (무시됨)"
                );
            }
        }

        Ok(next)
    }

    // ==================== 편의 메서드 ====================

    /// 제출 요청 이벤트를 적용합니다.
    pub fn submit(&mut self) -> Result<OrderState, LifecycleError> {
        self.transition(OrderEvent::Submit, serde_json::Value::Null)
    }

    /// 접수 확인 이벤트를 적용합니다.
    pub fn acknowledge(&mut self) -> Result<OrderState, LifecycleError> {
        self.transition(OrderEvent::Ack, serde_json::Value::Null)
    }

    /// 부분 체결 이벤트를 적용합니다.
    pub fn partial_fill(
        &mut self,
        details: serde_json::Value,
    ) -> Result<OrderState, LifecycleError> {
        self.transition(OrderEvent::Partial, details)
    }

    /// 전량 체결 이벤트를 적용합니다.
    pub fn fill(&mut self, details: serde_json::Value) -> Result<OrderState, LifecycleError> {
        self.transition(OrderEvent::Fill, details)
    }

    /// 취소 이벤트를 적용합니다.
    pub fn cancel(&mut self) -> Result<OrderState, LifecycleError> {
        self.transition(OrderEvent::Cancel, serde_json::Value::Null)
    }

    /// 거부 이벤트를 적용합니다.
    pub fn reject(&mut self, details: serde_json::Value) -> Result<OrderState, LifecycleError> {
        self.transition(OrderEvent::Reject, details)
    }

    /// 만료 이벤트를 적용합니다.
    pub fn expire(&mut self) -> Result<OrderState, LifecycleError> {
        self.transition(OrderEvent::Expire, serde_json::Value::Null)
    }

    /// 실패 이벤트를 적용합니다.
    pub fn fail(&mut self, details: serde_json::Value) -> Result<OrderState, LifecycleError> {
        self.transition(OrderEvent::Fail, details)
    }
}

/// 주문 ID로 키잉된 생명주기 관리자.
#[derive(Debug, Default)]
pub struct LifecycleManager {
    lifecycles: HashMap<Uuid, OrderLifecycle>,
}

impl LifecycleManager {
    /// 새 관리자를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 주문의 생명주기를 생성합니다. 이미 있으면 기존 것을 유지합니다.
    pub fn create(&mut self, order_id: Uuid) -> &mut OrderLifecycle {
        self.lifecycles
            .entry(order_id)
            .or_insert_with(|| OrderLifecycle::new(order_id))
    }

    /// 생명주기를 조회합니다.
    pub fn get(&self, order_id: Uuid) -> Option<&OrderLifecycle> {
        self.lifecycles.get(&order_id)
    }

    /// 생명주기를 가변으로 조회합니다.
    pub fn get_mut(&mut self, order_id: Uuid) -> Option<&mut OrderLifecycle> {
        self.lifecycles.get_mut(&order_id)
    }

    /// 생명주기를 제거합니다.
    pub fn remove(&mut self, order_id: Uuid) -> Option<OrderLifecycle> {
        self.lifecycles.remove(&order_id)
    }

    /// 주문에 이벤트를 적용합니다.
    pub fn transition(
        &mut self,
        order_id: Uuid,
        event: OrderEvent,
        details: serde_json::Value,
    ) -> Result<OrderState, LifecycleError> {
        let lifecycle = self
            .lifecycles
            .get_mut(&order_id)
            .ok_or(LifecycleError::NotFound(order_id))?;
        lifecycle.transition(event, details)
    }

    /// 특정 상태의 모든 주문에 이벤트를 일괄 적용합니다.
    ///
    /// 예: 모든 `PendingSubmit` 주문을 일괄 접수 처리.
    /// 전이된 주문 ID 목록을 반환합니다.
    pub fn transition_all(&mut self, from: OrderState, event: OrderEvent) -> Vec<Uuid> {
        let mut transitioned = Vec::new();
        for (id, lifecycle) in self.lifecycles.iter_mut() {
            if lifecycle.state() == from
                && lifecycle.transition(event, serde_json::Value::Null).is_ok()
            {
                transitioned.push(*id);
            }
        }
        transitioned
    }

    /// 특정 상태의 주문 ID들을 반환합니다.
    pub fn in_state(&self, state: OrderState) -> Vec<Uuid> {
        self.lifecycles
            .iter()
            .filter(|(_, lc)| lc.state() == state)
            .map(|(id, _)| *id)
            .collect()
    }

    /// 활성 상태(최종 상태가 아닌) 주문 ID들을 반환합니다.
    pub fn active(&self) -> Vec<Uuid> {
        self.lifecycles
            .iter()
            .filter(|(_, lc)| !lc.is_terminal())
            .map(|(id, _)| *id)
            .collect()
    }

    /// 관리 중인 생명주기 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.lifecycles.len()
    }

    /// 관리 중인 생명주기가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.lifecycles.is_empty()
    }

    /// 최종 상태 항목이 보존 한도를 넘으면 오래된 것부터 제거합니다.
    ///
    /// 마지막 전이 타임스탬프 기준으로 가장 오래된 최종 상태 항목부터
    /// 삭제하며, 제거된 개수를 반환합니다.
    pub fn gc(&mut self, retain: usize) -> usize {
        let mut terminal: Vec<(Uuid, DateTime<Utc>)> = self
            .lifecycles
            .iter()
            .filter(|(_, lc)| lc.is_terminal())
            .map(|(id, lc)| (*id, lc.last_transition_at().unwrap_or(DateTime::<Utc>::MIN_UTC)))
            .collect();

        if terminal.len() <= retain {
            return 0;
        }

        terminal.sort_by_key(|(_, ts)| *ts);
        let excess = terminal.len() - retain;
        for (id, _) in terminal.into_iter().take(excess) {
            self.lifecycles.remove(&id);
        }
        excess
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn filled_lifecycle() -> OrderLifecycle {
        let mut lc = OrderLifecycle::new(Uuid::new_v4());
        lc.submit().unwrap();
        lc.acknowledge().unwrap();
        lc.fill(serde_json::json!({"price": "1000", "quantity": "10"}))
            .unwrap();
        lc
    }

    #[test]
    fn test_happy_path() {
        let mut lc = OrderLifecycle::new(Uuid::new_v4());
        assert_eq!(lc.state(), OrderState::Created);

        assert_eq!(lc.submit().unwrap(), OrderState::PendingSubmit);
        assert_eq!(lc.acknowledge().unwrap(), OrderState::Submitted);
        assert_eq!(
            lc.partial_fill(serde_json::json!({"quantity": "5"})).unwrap(),
            OrderState::PartialFill
        );
        assert_eq!(
            lc.fill(serde_json::Value::Null).unwrap(),
            OrderState::Filled
        );
        assert!(lc.is_terminal());
        assert_eq!(lc.history().len(), 4);
    }

    #[test]
    fn test_terminal_states_absorb_all_events() {
        // 모든 최종 상태에서 모든 이벤트는 InvalidTransition
        let terminals = [
            OrderState::Filled,
            OrderState::Cancelled,
            OrderState::Rejected,
            OrderState::Expired,
            OrderState::Failed,
        ];

        for state in terminals {
            for event in super::ALL_EVENTS {
                assert_eq!(next_state(state, event), None, "{state} + {event}");
            }
        }
    }

    #[test]
    fn test_invalid_transition_is_hard_error() {
        let mut lc = OrderLifecycle::new(Uuid::new_v4());

        // Created에서 Fill은 불가
        let err = lc.fill(serde_json::Value::Null).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                state: OrderState::Created,
                event: OrderEvent::Fill,
            }
        );

        // 실패한 전이는 상태/이력을 변경하지 않음
        assert_eq!(lc.state(), OrderState::Created);
        assert!(lc.history().is_empty());
    }

    #[test]
    fn test_can_transition_and_valid_events() {
        let mut lc = OrderLifecycle::new(Uuid::new_v4());

        assert!(lc.can_transition(OrderEvent::Submit));
        assert!(!lc.can_transition(OrderEvent::Fill));

        lc.submit().unwrap();
        lc.acknowledge().unwrap();

        let events = lc.valid_events();
        assert!(events.contains(&OrderEvent::Fill));
        assert!(events.contains(&OrderEvent::Cancel));
        assert!(!events.contains(&OrderEvent::Submit));
    }

    #[test]
    fn test_history_records_details() {
        let lc = filled_lifecycle();

        let last = lc.history().last().unwrap();
        assert_eq!(last.event, OrderEvent::Fill);
        assert_eq!(last.to, OrderState::Filled);
        assert_eq!(last.details["price"], "1000");
    }

    #[test]
    fn test_callback_invoked_and_errors_swallowed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let mut lc = OrderLifecycle::new(Uuid::new_v4());
        lc.set_callback(Box::new(move |_record| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            // 콜백이 실패해도 전이는 유지되어야 함
            Err("callback failure".into())
        }));

        lc.submit().unwrap();
        lc.acknowledge().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(lc.state(), OrderState::Submitted);
        assert_eq!(lc.history().len(), 2);
    }

    #[test]
    fn test_manager_bulk_transition() {
        let mut manager = LifecycleManager::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        manager.create(a).submit().unwrap();
        manager.create(b).submit().unwrap();
        manager.create(c); // Created 상태 유지

        // 모든 PendingSubmit 주문 일괄 접수
        let acked = manager.transition_all(OrderState::PendingSubmit, OrderEvent::Ack);

        assert_eq!(acked.len(), 2);
        assert_eq!(manager.get(a).unwrap().state(), OrderState::Submitted);
        assert_eq!(manager.get(b).unwrap().state(), OrderState::Submitted);
        assert_eq!(manager.get(c).unwrap().state(), OrderState::Created);
        assert_eq!(manager.in_state(OrderState::Submitted).len(), 2);
        assert_eq!(manager.active().len(), 3);
    }

    #[test]
    fn test_manager_not_found() {
        let mut manager = LifecycleManager::new();
        let result = manager.transition(
            Uuid::new_v4(),
            OrderEvent::Submit,
            serde_json::Value::Null,
        );
        assert!(matches!(result, Err(LifecycleError::NotFound(_))));
    }

    #[test]
    fn test_gc_removes_oldest_terminals() {
        let mut manager = LifecycleManager::new();

        // 최종 상태 3개 생성
        let mut terminal_ids = Vec::new();
        for _ in 0..3 {
            let id = Uuid::new_v4();
            let lc = manager.create(id);
            lc.submit().unwrap();
            lc.cancel().unwrap();
            terminal_ids.push(id);
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        // 활성 상태 1개
        let active_id = Uuid::new_v4();
        manager.create(active_id).submit().unwrap();

        let removed = manager.gc(1);

        assert_eq!(removed, 2);
        assert_eq!(manager.len(), 2);
        // 가장 오래된 두 개가 제거되고 최신 최종 상태와 활성 주문은 유지
        assert!(manager.get(terminal_ids[2]).is_some());
        assert!(manager.get(active_id).is_some());
    }
}
