//! 모의투자 세션 오케스트레이터.
//!
//! 이 crate는 가상 원장, 주문 실행기, 포지션 트래커, 일일 손실 서킷
//! 브레이커를 하나의 세션으로 묶는 공개 파사드 `PaperTrader`를
//! 제공합니다.
//!
//! # 예제
//!
//! ```rust,ignore
//! use paper_session::PaperTrader;
//! use paper_core::TradingConfig;
//! use paper_risk::RiskConfig;
//!
//! let trader = PaperTrader::new(TradingConfig::default(), RiskConfig::default());
//! trader.start_session("아침 세션");
//! trader.buy("005930", "삼성전자", price, quantity)?;
//! trader.update_prices(price_map);
//! ```

pub mod session;
pub mod trader;

// 주요 타입 재내보내기
pub use session::{SessionReport, TradingSession};
pub use trader::{
    PaperTrader, PerformanceReport, PortfolioStatus, StateExport, TradeReport, TraderError,
};
