//! 트레이딩 알림.
//!
//! 이 crate는 세션/체결/리스크 이벤트의 알림 타입과 알림 채널
//! trait를 제공합니다. 실제 전송(텔레그램 등)은 엔진 범위 밖이며,
//! 호출 측은 `Notifier` 구현체를 주입합니다. 알림 실패는 어떤 경우에도
//! 매매 정합성에 영향을 주지 않아야 합니다.

pub mod types;

// 주요 타입 재내보내기
pub use types::{
    LogNotifier, NoopNotifier, Notification, NotificationError, NotificationEvent,
    NotificationPriority, Notifier,
};
