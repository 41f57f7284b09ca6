//! 리스크 관리 시스템.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 계좌 단위 리스크 한도 설정 (포지션 크기, 총 노출)
//! - 기본 손절/익절/추적 손절 비율
//! - 일일 손실 한도 서킷 브레이커
//!
//! # 예제
//!
//! ```rust,ignore
//! use paper_risk::{DailyLossTracker, RiskConfig};
//!
//! let config = RiskConfig::default();
//! let mut tracker = DailyLossTracker::new(config.max_daily_loss_pct, starting_balance);
//!
//! tracker.record_loss("005930", loss_amount);
//! if !tracker.can_trade() {
//!     // 당일 거래 중지
//! }
//! ```

pub mod config;
pub mod limits;

// 주요 타입 재내보내기
pub use config::{CodeRiskConfig, RiskConfig};
pub use limits::{DailyLimitStatus, DailyLossTracker, PnLRecord};
