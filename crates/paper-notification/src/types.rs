//! 알림 타입 및 trait 정의.

use chrono::{DateTime, Utc};
use paper_core::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// 알림 전송 오류.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Failed to deliver notification: {0}")]
    Delivery(String),
}

/// 알림 우선순위 레벨.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    /// 낮은 우선순위 (정보성)
    Low,
    /// 일반 우선순위 (일반 업데이트)
    #[default]
    Normal,
    /// 높은 우선순위 (중요 이벤트)
    High,
    /// 긴급 우선순위 (즉시 대응 필요)
    Critical,
}

/// 알림 이벤트 타입.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// 세션 시작
    SessionStarted {
        session_id: Uuid,
        name: String,
        starting_cash: Decimal,
    },
    /// 세션 종료
    SessionEnded {
        session_id: Uuid,
        name: String,
        ending_cash: Decimal,
        realized_pnl: Decimal,
        trade_count: u32,
    },
    /// 주문 체결 알림
    OrderExecuted {
        order_id: Uuid,
        code: String,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        commission: Decimal,
        reason: String,
    },
    /// 주문 거부 알림
    OrderRejected {
        code: String,
        side: Side,
        reason: String,
    },
    /// 포지션 진입
    PositionOpened {
        code: String,
        quantity: Decimal,
        entry_price: Decimal,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    },
    /// 포지션 청산
    PositionClosed {
        code: String,
        quantity: Decimal,
        entry_price: Decimal,
        exit_price: Decimal,
        pnl: Decimal,
        reason: String,
    },
    /// 손절 발동
    StopLossTriggered {
        code: String,
        quantity: Decimal,
        trigger_price: Decimal,
        current_price: Decimal,
    },
    /// 익절 발동
    TakeProfitTriggered {
        code: String,
        quantity: Decimal,
        trigger_price: Decimal,
        current_price: Decimal,
    },
    /// 일일 손실 한도 도달로 거래 중지
    TradingPaused { reason: String, daily_pnl: Decimal },
    /// 거래 재개
    TradingResumed,
    /// 리스크 경고
    RiskAlert { alert_type: String, message: String },
    /// 사용자 정의 알림
    Custom { title: String, message: String },
}

/// 알림 메시지.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// 고유 알림 ID
    pub id: Uuid,
    /// 알림 이벤트
    pub event: NotificationEvent,
    /// 우선순위 레벨
    pub priority: NotificationPriority,
    /// 타임스탬프
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// 새 알림을 생성합니다.
    pub fn new(event: NotificationEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
            priority: NotificationPriority::Normal,
            timestamp: Utc::now(),
        }
    }

    /// 우선순위 레벨을 설정합니다.
    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// 알림 채널 trait.
///
/// 구현체의 실패는 호출 측에서 로그로 남기고 무시해야 하며, 매매 흐름을
/// 중단시켜서는 안 됩니다.
pub trait Notifier: Send + Sync {
    /// 알림을 전송합니다.
    fn notify(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// 아무 동작도 하지 않는 기본 알림 채널.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: &Notification) -> Result<(), NotificationError> {
        Ok(())
    }
}

/// tracing 로그로 출력하는 알림 채널.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!(
            id = %notification.id,
            priority = ?notification.priority,
            event = ?notification.event,
            "알림"
        );
        Ok(())
    }
}
