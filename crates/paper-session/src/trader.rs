//! 모의투자 오케스트레이터.
//!
//! `PaperTrader`는 가상 원장 하나, 주문 실행기 하나, 포지션 트래커
//! 하나, 일일 손실 추적기 하나를 소유하고 이들을 하나의 매매 흐름으로
//! 묶습니다. 전역 싱글턴 없이 모든 구성 요소는 명시적으로 생성되어
//! 주입됩니다.
//!
//! # 동시성
//!
//! 모든 변경 연산(매수/매도/시세 반영)은 내부 상태를 감싼 단일
//! `parking_lot::RwLock`의 쓰기 잠금 아래에서 끝까지 실행됩니다. 시세
//! 반영 중 손절이 발동해 내부 매도로 이어지는 경로는 `*_locked` 내부
//! 함수로 재진입하므로 같은 잠금을 두 번 잡지 않으며, 동시에 들어온
//! 수동 매도와 교차될 수 없습니다. 조회 연산은 읽기 잠금을 사용합니다.

use chrono::{DateTime, Utc};
use paper_core::{
    Holding, Order, OrderType, Percentage, Position, Price, Quantity, Side, TradeReason,
    TradeRecord, TradingConfig,
};
use paper_execution::{
    ExecutionStats, ExecutorError, Ledger, LedgerError, LedgerSnapshot, OrderExecutor,
    PositionSummary, PositionTracker, PositionTrackerError, RiskExposure, TriggerReason,
};
use paper_notification::{NoopNotifier, Notification, NotificationEvent, Notifier};
use paper_risk::{DailyLossTracker, PnLRecord, RiskConfig};
use parking_lot::RwLock;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::session::{SessionReport, TradingSession};

/// 오케스트레이터 에러 타입.
///
/// 구성 요소의 비즈니스 거부를 하나의 결과 타입으로 모읍니다. 어떤
/// 변형도 언와인드 없이 값으로 반환되며, 거부된 호출은 부수 효과를
/// 남기지 않습니다.
#[derive(Debug, Error)]
pub enum TraderError {
    /// 일일 손실 한도 도달 또는 수동 중지로 거래가 막힘
    #[error("Trading is paused")]
    TradingPaused,

    /// 리스크 설정에서 비활성화된 종목
    #[error("Trading disabled for code: {0}")]
    CodeDisabled(String),

    /// 주문 1건의 포지션 크기 한도 초과
    #[error("Position size {requested_pct:.2}% exceeds limit {limit_pct:.2}%")]
    PositionSizeExceeded { requested_pct: f64, limit_pct: f64 },

    /// 계좌 총 노출 한도 초과
    #[error("Total exposure {requested_pct:.2}% would exceed limit {limit_pct:.2}%")]
    ExposureExceeded { requested_pct: f64, limit_pct: f64 },

    /// 원장 거부
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// 실행기 오류
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// 포지션 트래커 오류
    #[error(transparent)]
    Tracker(#[from] PositionTrackerError),
}

/// 매수/매도 호출의 결과.
#[derive(Debug, Clone)]
pub struct TradeReport {
    /// 생성된 주문 (최종 상태 반영)
    pub order: Order,
    /// 즉시 체결된 경우 체결 기록 (지정가/스톱 주문은 None)
    pub fill: Option<TradeRecord>,
}

/// 포트폴리오 상태 요약.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioStatus {
    /// 현금
    pub cash: Decimal,
    /// 보유 종목 평가액
    pub holdings_value: Decimal,
    /// 총 평가액
    pub total_value: Decimal,
    /// 누적 실현 손익
    pub realized_pnl: Decimal,
    /// 미실현 손익
    pub unrealized_pnl: Decimal,
    /// 보유 종목 수
    pub position_count: usize,
    /// 대기 주문 수
    pub pending_order_count: usize,
    /// 거래 중지 여부
    pub trading_paused: bool,
    /// 당일 실현 손익
    pub daily_pnl: Decimal,
    /// 일일 손실 한도
    pub daily_loss_limit: Decimal,
    /// 활성 세션 존재 여부
    pub session_active: bool,
}

/// 성과 보고서.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// 생성 타임스탬프
    pub generated_at: DateTime<Utc>,
    /// 원장 스냅샷
    pub portfolio: LedgerSnapshot,
    /// 포지션 집계
    pub positions: PositionSummary,
    /// 리스크 노출
    pub exposure: RiskExposure,
    /// 실행 통계
    pub execution: ExecutionStats,
    /// 당일 실현 손익
    pub daily_pnl: Decimal,
    /// 거래 중지 여부
    pub trading_paused: bool,
    /// 진행 중인 세션 요약
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionReport>,
}

/// 영속화/UI 렌더링용 전체 상태 스냅샷.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateExport {
    /// 내보낸 타임스탬프
    pub exported_at: DateTime<Utc>,
    /// 원장 스냅샷
    pub portfolio: LedgerSnapshot,
    /// 보유 종목
    pub holdings: Vec<Holding>,
    /// 오픈 포지션
    pub open_positions: Vec<Position>,
    /// 종료 포지션
    pub closed_positions: Vec<Position>,
    /// 대기 주문
    pub pending_orders: Vec<Order>,
    /// 체결 이력
    pub fills: Vec<TradeRecord>,
    /// 거래 중지 여부
    pub trading_paused: bool,
    /// 당일 실현 손익
    pub daily_pnl: Decimal,
    /// 진행 중인 세션
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionReport>,
    /// 세션 이력
    pub session_history: Vec<SessionReport>,
}

/// 정수 연산으로 가격에 백분율 조정을 적용합니다.
/// 예시: apply_pct(70000, -2.0) = 68600 (2% 감소)
fn apply_pct(price: Price, pct: f64) -> Price {
    let scaled_factor = ((100.0 + pct) * 10000.0).round() as i64;
    (price * Decimal::from(scaled_factor)) / Decimal::from(1_000_000)
}

/// 잠금 아래에서 관리되는 내부 상태.
struct TraderInner {
    ledger: Ledger,
    executor: OrderExecutor,
    tracker: PositionTracker,
    daily: DailyLossTracker,
    session: Option<TradingSession>,
    history: Vec<SessionReport>,
    last_prices: HashMap<String, Price>,
}

/// 모의투자 세션 오케스트레이터 (공개 파사드).
pub struct PaperTrader {
    inner: RwLock<TraderInner>,
    notifier: Arc<dyn Notifier>,
    trading_config: TradingConfig,
    risk_config: RiskConfig,
}

impl PaperTrader {
    /// 새 오케스트레이터를 생성합니다. 알림 채널은 기본적으로 no-op입니다.
    pub fn new(trading_config: TradingConfig, risk_config: RiskConfig) -> Self {
        let ledger = Ledger::new(trading_config.clone());
        let daily = DailyLossTracker::new(
            risk_config.max_daily_loss_pct,
            trading_config.initial_capital,
        );

        Self {
            inner: RwLock::new(TraderInner {
                ledger,
                executor: OrderExecutor::new(),
                tracker: PositionTracker::new(),
                daily,
                session: None,
                history: Vec::new(),
                last_prices: HashMap::new(),
            }),
            notifier: Arc::new(NoopNotifier),
            trading_config,
            risk_config,
        }
    }

    /// 알림 채널을 주입합니다.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// 매매 설정 참조를 반환합니다.
    pub fn trading_config(&self) -> &TradingConfig {
        &self.trading_config
    }

    /// 리스크 설정 참조를 반환합니다.
    pub fn risk_config(&self) -> &RiskConfig {
        &self.risk_config
    }

    // ==================== 세션 ====================

    /// 새 세션을 시작하고 세션 ID를 반환합니다.
    ///
    /// 종료되지 않은 활성 세션이 있으면 강제로 닫고 이력에 추가합니다.
    pub fn start_session(&self, name: &str) -> Uuid {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        if let Some(active) = inner.session.take() {
            warn!(session = %active.name, "종료되지 않은 세션을 강제 종료");
            let report = active.close(inner.ledger.cash());
            self.notify_event(NotificationEvent::SessionEnded {
                session_id: report.id,
                name: report.name.clone(),
                ending_cash: report.ending_cash,
                realized_pnl: report.realized_pnl,
                trade_count: report.trade_count,
            });
            inner.history.push(report);
        }

        let session = TradingSession::new(name, inner.ledger.cash());
        let session_id = session.id;
        info!(session_id = %session_id, name = %name, cash = %session.starting_cash, "세션 시작");
        self.notify_event(NotificationEvent::SessionStarted {
            session_id,
            name: name.to_string(),
            starting_cash: session.starting_cash,
        });
        inner.session = Some(session);
        session_id
    }

    /// 활성 세션을 종료하고 최종 보고서를 반환합니다.
    pub fn end_session(&self) -> Option<SessionReport> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let session = inner.session.take()?;
        let report = session.close(inner.ledger.cash());
        info!(
            session_id = %report.id,
            realized_pnl = %report.realized_pnl,
            trade_count = report.trade_count,
            "세션 종료"
        );
        self.notify_event(NotificationEvent::SessionEnded {
            session_id: report.id,
            name: report.name.clone(),
            ending_cash: report.ending_cash,
            realized_pnl: report.realized_pnl,
            trade_count: report.trade_count,
        });
        inner.history.push(report.clone());
        Some(report)
    }

    // ==================== 매매 ====================

    /// 시장가 매수.
    pub fn buy(
        &self,
        code: &str,
        name: &str,
        price: Price,
        quantity: Quantity,
    ) -> Result<TradeReport, TraderError> {
        self.place_order(code, name, Side::Buy, OrderType::Market, quantity, price, None, None)
    }

    /// 시장가 매도. 수량을 생략하면 전량 매도합니다.
    pub fn sell(
        &self,
        code: &str,
        price: Price,
        quantity: Option<Quantity>,
    ) -> Result<TradeReport, TraderError> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        if !inner.daily.can_trade() {
            return Err(TraderError::TradingPaused);
        }
        self.sell_locked(inner, code, price, quantity, TradeReason::Manual)
    }

    /// 일반화된 주문 진입점.
    ///
    /// 사전 검사(중지 여부 → 현금 → 포지션 크기 → 총 노출)를 통과한
    /// 주문만 실행기로 넘어갑니다. 시장가 주문은 즉시 체결되고, 지정가/
    /// 스톱 주문은 대기 목록에 올라가 `update_prices`에서 체결됩니다.
    #[allow(clippy::too_many_arguments)]
    pub fn place_order(
        &self,
        code: &str,
        name: &str,
        side: Side,
        order_type: OrderType,
        quantity: Quantity,
        current_price: Price,
        limit_price: Option<Price>,
        stop_price: Option<Price>,
    ) -> Result<TradeReport, TraderError> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        if !inner.daily.can_trade() {
            return Err(TraderError::TradingPaused);
        }

        match side {
            Side::Sell => {
                if order_type == OrderType::Market {
                    return self.sell_locked(inner, code, current_price, Some(quantity), TradeReason::Manual);
                }
                // 지정가/스톱 매도는 보유 확인만 하고 대기
                if inner.ledger.get_holding(code).is_none() {
                    return Err(LedgerError::PositionNotFound(code.to_string()).into());
                }
            }
            Side::Buy => {
                let check_price = limit_price.or(stop_price).unwrap_or(current_price);
                self.buy_checks(inner, code, check_price, quantity)?;
            }
        }

        let order = inner.executor.create_order(
            code,
            name,
            side,
            order_type,
            quantity,
            limit_price,
            stop_price,
        )?;
        inner.executor.submit_order(order.id)?;

        if order_type == OrderType::Market {
            // 매수 시장가 (매도 시장가는 위에서 처리됨)
            return match inner.executor.execute_market_order(
                order.id,
                current_price,
                &mut inner.ledger,
                TradeReason::Manual,
            ) {
                Ok(record) => {
                    self.handle_fill_locked(inner, &record);
                    let order = inner.executor.get_order(order.id).cloned().unwrap_or(order);
                    Ok(TradeReport {
                        order,
                        fill: Some(record),
                    })
                }
                Err(e) => {
                    self.notify_event(NotificationEvent::OrderRejected {
                        code: code.to_string(),
                        side,
                        reason: e.to_string(),
                    });
                    Err(e.into())
                }
            };
        }

        let order = inner.executor.get_order(order.id).cloned().unwrap_or(order);
        Ok(TradeReport { order, fill: None })
    }

    // ==================== 시세 반영 ====================

    /// 시세 스냅샷을 반영합니다.
    ///
    /// 원장/포지션 평가 갱신 → 대기 주문 트리거 검사 → (중지 상태가
    /// 아니면) 손절/익절 평가 후 내부 매도 경로로 청산 → 추적 손절 상향
    /// 순서로 진행되며, 이 틱에서 발생한 모든 체결 기록을 반환합니다.
    pub fn update_prices(&self, prices: &HashMap<String, Price>) -> Vec<TradeRecord> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        inner
            .last_prices
            .extend(prices.iter().map(|(k, v)| (k.clone(), *v)));
        inner.ledger.update_prices(prices);
        inner.tracker.update_prices(prices);

        // 대기 주문 체결 검사
        let mut fills = inner.executor.check_pending_orders(prices, &mut inner.ledger);
        for record in fills.clone() {
            self.handle_fill_locked(inner, &record);
        }

        // 손절/익절 평가는 거래 중지 상태에서는 건너뜀
        if inner.daily.can_trade() {
            let triggers = inner.tracker.check_stop_conditions(prices);
            for trigger in triggers {
                match trigger.reason {
                    TriggerReason::StopLoss => {
                        self.notify_event(NotificationEvent::StopLossTriggered {
                            code: trigger.code.clone(),
                            quantity: trigger.quantity,
                            trigger_price: trigger.trigger_level,
                            current_price: trigger.current_price,
                        });
                    }
                    TriggerReason::TakeProfit => {
                        self.notify_event(NotificationEvent::TakeProfitTriggered {
                            code: trigger.code.clone(),
                            quantity: trigger.quantity,
                            trigger_price: trigger.trigger_level,
                            current_price: trigger.current_price,
                        });
                    }
                }

                info!(
                    code = %trigger.code,
                    reason = %trigger.reason,
                    trigger_level = %trigger.trigger_level,
                    current_price = %trigger.current_price,
                    "보호 청산 발동"
                );
                match self.sell_locked(
                    inner,
                    &trigger.code,
                    trigger.current_price,
                    Some(trigger.quantity),
                    trigger.reason.into(),
                ) {
                    Ok(report) => {
                        if let Some(fill) = report.fill {
                            fills.push(fill);
                        }
                    }
                    Err(e) => warn!(code = %trigger.code, error = %e, "보호 청산 실패"),
                }
            }

            inner.tracker.update_trailing_stops(prices, None);
        }

        fills
    }

    // ==================== 주문 관리 ====================

    /// 주문을 취소합니다.
    ///
    /// 이미 체결/취소/거부된 주문은 `AlreadyComplete`로 반환되며, 취소가
    /// 체결과 경합한 호출자는 이를 정상 결과로 다뤄야 합니다.
    pub fn cancel_order(&self, order_id: Uuid) -> Result<Order, TraderError> {
        let mut guard = self.inner.write();
        Ok(guard.executor.cancel_order(order_id)?)
    }

    /// 모든 대기 주문을 취소하고 취소된 주문 ID를 반환합니다.
    pub fn cancel_all_orders(&self) -> Vec<Uuid> {
        let mut guard = self.inner.write();
        guard.executor.cancel_all_pending()
    }

    /// 주문을 만료 처리합니다 (세션 타이머 등 외부에서 주입).
    pub fn expire_order(&self, order_id: Uuid) -> Result<(), TraderError> {
        let mut guard = self.inner.write();
        Ok(guard.executor.expire_order(order_id)?)
    }

    /// 모든 오픈 포지션을 마지막 시세로 청산합니다.
    pub fn close_all_positions(&self) -> Vec<TradeRecord> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let targets: Vec<(String, Price)> = inner
            .tracker
            .open_positions()
            .into_iter()
            .map(|p| (p.code.clone(), p.last_price))
            .collect();

        let mut records = Vec::new();
        for (code, price) in targets {
            match self.sell_locked(inner, &code, price, None, TradeReason::SessionClose) {
                Ok(report) => {
                    if let Some(fill) = report.fill {
                        records.push(fill);
                    }
                }
                Err(e) => warn!(code = %code, error = %e, "일괄 청산 실패"),
            }
        }
        records
    }

    // ==================== 중지/재개 ====================

    /// 거래를 수동으로 중지합니다.
    pub fn pause_trading(&self) {
        let mut guard = self.inner.write();
        guard.daily.override_pause(false);
        let daily_pnl = guard.daily.daily_pnl();
        info!("거래 수동 중지");
        self.notify_event(NotificationEvent::TradingPaused {
            reason: "manual pause".to_string(),
            daily_pnl,
        });
    }

    /// 거래를 재개합니다 (서킷 브레이커 해제 포함).
    pub fn resume_trading(&self) {
        let mut guard = self.inner.write();
        guard.daily.override_pause(true);
        info!("거래 재개");
        self.notify_event(NotificationEvent::TradingResumed);
    }

    /// 거래 중지 여부를 반환합니다.
    pub fn is_paused(&self) -> bool {
        !self.inner.write().daily.can_trade()
    }

    // ==================== 조회 ====================

    /// 포트폴리오 상태를 반환합니다.
    pub fn portfolio_status(&self) -> PortfolioStatus {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let snapshot = inner.ledger.snapshot();
        let daily = inner.daily.get_status();

        PortfolioStatus {
            cash: snapshot.cash,
            holdings_value: snapshot.holdings_value,
            total_value: snapshot.total_value,
            realized_pnl: snapshot.realized_pnl,
            unrealized_pnl: snapshot.unrealized_pnl,
            position_count: snapshot.position_count,
            pending_order_count: inner.executor.pending_orders().len(),
            trading_paused: !daily.can_trade,
            daily_pnl: daily.daily_pnl,
            daily_loss_limit: daily.max_daily_loss,
            session_active: inner.session.is_some(),
        }
    }

    /// 보유 종목들을 반환합니다.
    pub fn holdings(&self) -> Vec<Holding> {
        self.inner
            .read()
            .ledger
            .holdings()
            .into_iter()
            .cloned()
            .collect()
    }

    /// ID로 주문을 조회합니다.
    pub fn get_order(&self, order_id: Uuid) -> Option<Order> {
        self.inner.read().executor.get_order(order_id).cloned()
    }

    /// 대기 주문들을 반환합니다.
    pub fn pending_orders(&self) -> Vec<Order> {
        self.inner
            .read()
            .executor
            .pending_orders()
            .into_iter()
            .cloned()
            .collect()
    }

    /// 오픈 포지션들을 반환합니다.
    pub fn positions(&self) -> Vec<Position> {
        self.inner
            .read()
            .tracker
            .open_positions()
            .into_iter()
            .cloned()
            .collect()
    }

    /// 종료된 포지션들을 반환합니다.
    pub fn closed_positions(&self) -> Vec<Position> {
        self.inner.read().tracker.closed_positions().to_vec()
    }

    /// 성과 보고서를 반환합니다.
    pub fn performance_report(&self) -> PerformanceReport {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let portfolio = inner.ledger.snapshot();
        let daily = inner.daily.get_status();
        let session = inner.session.as_ref().map(|s| s.report(portfolio.cash));

        PerformanceReport {
            generated_at: Utc::now(),
            positions: inner.tracker.summary(),
            exposure: inner.tracker.risk_exposure(),
            execution: inner.executor.stats(),
            daily_pnl: daily.daily_pnl,
            trading_paused: !daily.can_trade,
            session,
            portfolio,
        }
    }

    /// 세션 이력을 반환합니다.
    pub fn session_history(&self) -> Vec<SessionReport> {
        self.inner.read().history.clone()
    }

    /// 영속화/복원에 적합한 전체 상태 스냅샷을 내보냅니다.
    pub fn export_state(&self) -> StateExport {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let portfolio = inner.ledger.snapshot();
        let daily = inner.daily.get_status();
        let session = inner.session.as_ref().map(|s| s.report(portfolio.cash));

        StateExport {
            exported_at: Utc::now(),
            holdings: inner.ledger.holdings().into_iter().cloned().collect(),
            open_positions: inner.tracker.open_positions().into_iter().cloned().collect(),
            closed_positions: inner.tracker.closed_positions().to_vec(),
            pending_orders: inner
                .executor
                .pending_orders()
                .into_iter()
                .cloned()
                .collect(),
            fills: inner.executor.fills().to_vec(),
            trading_paused: !daily.can_trade,
            daily_pnl: daily.daily_pnl,
            session,
            session_history: inner.history.clone(),
            portfolio,
        }
    }

    // ==================== 내부 ====================

    /// 매수 사전 검사: 중지 여부는 호출자가 이미 확인한 뒤이며, 여기서는
    /// 종목 활성화 → 현금 → 포지션 크기 비율 → 총 노출 비율 순서로
    /// 검사합니다. 현금 검사는 원장에 위임하기 전에 다시 계산해 값싼
    /// 조기 거부를 제공합니다.
    fn buy_checks(
        &self,
        inner: &mut TraderInner,
        code: &str,
        check_price: Price,
        quantity: Quantity,
    ) -> Result<(), TraderError> {
        if !self.risk_config.is_code_enabled(code) {
            return Err(TraderError::CodeDisabled(code.to_string()));
        }

        let feasibility = inner.ledger.can_buy(code, check_price, quantity);
        if let Some(reason) = feasibility.reason {
            return Err(reason.into());
        }

        let total_value = inner.ledger.snapshot().total_value;
        if total_value <= Decimal::ZERO {
            return Ok(());
        }

        let notional = check_price * quantity;
        let hundred = Decimal::from(100);

        let requested_pct = (notional / total_value * hundred).to_f64().unwrap_or(0.0);
        let limit_pct = self.risk_config.get_max_position_pct(code);
        if requested_pct > limit_pct {
            return Err(TraderError::PositionSizeExceeded {
                requested_pct,
                limit_pct,
            });
        }

        let exposure_after = inner.tracker.total_exposure() + notional;
        let exposure_pct = (exposure_after / total_value * hundred).to_f64().unwrap_or(0.0);
        if exposure_pct > self.risk_config.max_total_exposure_pct {
            return Err(TraderError::ExposureExceeded {
                requested_pct: exposure_pct,
                limit_pct: self.risk_config.max_total_exposure_pct,
            });
        }

        Ok(())
    }

    /// 내부 매도 경로. 수동 매도와 손절/익절/일괄 청산이 모두 이 경로를
    /// 지나며, 호출 시점에 쓰기 잠금은 이미 잡혀 있습니다.
    fn sell_locked(
        &self,
        inner: &mut TraderInner,
        code: &str,
        price: Price,
        quantity: Option<Quantity>,
        reason: TradeReason,
    ) -> Result<TradeReport, TraderError> {
        let holding = inner
            .ledger
            .get_holding(code)
            .ok_or_else(|| LedgerError::PositionNotFound(code.to_string()))?;
        let name = holding.name.clone();
        let held = holding.quantity;
        let sell_qty = quantity.unwrap_or(held).min(held);

        let order = inner.executor.create_order(
            code,
            &name,
            Side::Sell,
            OrderType::Market,
            sell_qty,
            None,
            None,
        )?;
        inner.executor.submit_order(order.id)?;

        match inner
            .executor
            .execute_market_order(order.id, price, &mut inner.ledger, reason)
        {
            Ok(record) => {
                self.handle_fill_locked(inner, &record);
                let order = inner.executor.get_order(order.id).cloned().unwrap_or(order);
                Ok(TradeReport {
                    order,
                    fill: Some(record),
                })
            }
            Err(e) => {
                self.notify_event(NotificationEvent::OrderRejected {
                    code: code.to_string(),
                    side: Side::Sell,
                    reason: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// 체결 후처리. 포지션 등록/청산, 세션 통계, 일일 손익과 서킷
    /// 브레이커, 알림을 한 곳에서 처리합니다. 수동 주문과 대기 주문
    /// 트리거 체결이 모두 이 경로를 지납니다.
    fn handle_fill_locked(&self, inner: &mut TraderInner, record: &TradeRecord) {
        if let Some(session) = inner.session.as_mut() {
            session.record_trade(record);
        }

        self.notify_event(NotificationEvent::OrderExecuted {
            order_id: record.order_id,
            code: record.code.clone(),
            side: record.side,
            quantity: record.quantity,
            price: record.price,
            commission: record.commission,
            reason: record.reason.to_string(),
        });

        match record.side {
            Side::Buy => {
                let (stop_loss, take_profit, trailing) =
                    self.derive_stops(&record.code, record.price);
                let position = inner.tracker.open_position(
                    &record.code,
                    &record.name,
                    record.price,
                    record.quantity,
                    stop_loss,
                    take_profit,
                    trailing,
                );
                self.notify_event(NotificationEvent::PositionOpened {
                    code: record.code.clone(),
                    quantity: record.quantity,
                    entry_price: position.entry_price,
                    stop_loss: position.stop_loss,
                    take_profit: position.take_profit,
                });
            }
            Side::Sell => {
                match inner.tracker.close_position(
                    &record.code,
                    record.price,
                    Some(record.quantity),
                    record.reason,
                ) {
                    Ok((position, _)) => {
                        self.notify_event(NotificationEvent::PositionClosed {
                            code: record.code.clone(),
                            quantity: record.quantity,
                            entry_price: position.entry_price,
                            exit_price: record.price,
                            pnl: record.realized_pnl,
                            reason: record.reason.to_string(),
                        });
                    }
                    Err(e) => {
                        warn!(code = %record.code, error = %e, "포지션 청산 동기화 실패")
                    }
                }

                // 실현 손익을 일일 추적기에 기록하고 서킷 브레이커 검사
                let was_allowed = inner.daily.can_trade();
                let status = inner.daily.record_pnl(
                    PnLRecord::new(&record.code, record.realized_pnl)
                        .with_order_id(record.order_id.to_string()),
                );
                if was_allowed && !status.can_trade {
                    warn!(
                        daily_pnl = %status.daily_pnl,
                        limit = %status.max_daily_loss,
                        "일일 손실 한도 도달, 거래 중지"
                    );
                    self.notify_event(NotificationEvent::TradingPaused {
                        reason: "daily loss limit reached".to_string(),
                        daily_pnl: status.daily_pnl,
                    });
                }
            }
        }
    }

    /// 설정 비율로 기본 손절/익절/추적 손절 수준을 도출합니다.
    fn derive_stops(
        &self,
        code: &str,
        entry_price: Price,
    ) -> (Option<Price>, Option<Price>, Option<Percentage>) {
        let stop_loss = apply_pct(entry_price, -self.risk_config.get_stop_loss_pct(code));
        let take_profit = apply_pct(entry_price, self.risk_config.get_take_profit_pct(code));
        let trailing = if self.risk_config.enable_trailing_stop {
            Decimal::from_f64_retain(self.risk_config.trailing_stop_pct)
        } else {
            None
        };
        (Some(stop_loss), Some(take_profit), trailing)
    }

    /// 알림을 전송합니다. 전송 실패는 로그만 남기고 매매 흐름에 영향을
    /// 주지 않습니다.
    fn notify_event(&self, event: NotificationEvent) {
        let notification = Notification::new(event);
        if let Err(e) = self.notifier.notify(&notification) {
            warn!(error = %e, "알림 전송 실패 (무시됨)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    /// 알림을 수집하는 테스트용 채널.
    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<NotificationEvent>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: &Notification) -> Result<(), paper_notification::NotificationError> {
            self.events.lock().unwrap().push(notification.event.clone());
            Ok(())
        }
    }

    fn test_trader() -> PaperTrader {
        PaperTrader::new(TradingConfig::default(), RiskConfig::default())
    }

    #[test]
    fn test_market_buy_opens_position_with_stops() {
        let trader = test_trader();

        let report = trader.buy("005930", "삼성전자", dec!(70000), dec!(10)).unwrap();

        assert!(report.fill.is_some());
        assert_eq!(trader.holdings().len(), 1);

        let positions = trader.positions();
        assert_eq!(positions.len(), 1);
        // 기본 손절 2% / 익절 5%
        assert_eq!(positions[0].stop_loss, Some(dec!(68600)));
        assert_eq!(positions[0].take_profit, Some(dec!(73500)));
    }

    #[test]
    fn test_buy_rejected_when_position_size_exceeds_limit() {
        let trader = test_trader();

        // 기본 한도는 계좌의 10%: 2,000,000 / 10,000,000 = 20%
        let result = trader.buy("005930", "삼성전자", dec!(100000), dec!(20));

        assert!(matches!(
            result,
            Err(TraderError::PositionSizeExceeded { .. })
        ));
        assert!(trader.holdings().is_empty());
    }

    #[test]
    fn test_buy_rejected_when_exposure_exceeds_limit() {
        let mut config = TradingConfig::default();
        config.max_position_pct = dec!(100); // 원장 수준 한도는 끔
        let mut risk = RiskConfig::default();
        risk.max_position_pct = 30.0;
        risk.max_total_exposure_pct = 50.0;
        let trader = PaperTrader::new(config, risk);

        // 각 25%씩 두 번은 허용, 세 번째에서 총 노출 75% > 50% 거부
        trader.buy("005930", "삼성전자", dec!(50000), dec!(50)).unwrap();
        let result = trader.buy("000660", "SK하이닉스", dec!(100000), dec!(25));

        assert!(matches!(result, Err(TraderError::ExposureExceeded { .. })));
    }

    #[test]
    fn test_insufficient_cash_early_rejection() {
        let trader = test_trader();

        let result = trader.buy("005930", "삼성전자", dec!(1000000), dec!(11));

        assert!(matches!(
            result,
            Err(TraderError::Ledger(LedgerError::InsufficientCash { .. }))
        ));
        // 부수 효과 없음
        assert!(trader.holdings().is_empty());
        assert_eq!(trader.portfolio_status().cash, dec!(10000000));
    }

    #[test]
    fn test_sell_closes_position_and_records_daily_pnl() {
        let trader = test_trader();
        trader.buy("005930", "삼성전자", dec!(70000), dec!(10)).unwrap();

        let report = trader.sell("005930", dec!(72000), None).unwrap();

        let fill = report.fill.unwrap();
        assert!(fill.realized_pnl > Decimal::ZERO);
        assert!(trader.positions().is_empty());
        assert_eq!(trader.closed_positions().len(), 1);

        let status = trader.portfolio_status();
        assert_eq!(status.daily_pnl, fill.realized_pnl);
    }

    #[test]
    fn test_update_prices_fills_pending_limit_order() {
        let trader = test_trader();

        let report = trader
            .place_order(
                "005930",
                "삼성전자",
                Side::Buy,
                OrderType::Limit,
                dec!(10),
                dec!(70000),
                Some(dec!(69000)),
                None,
            )
            .unwrap();

        assert!(report.fill.is_none());
        assert_eq!(trader.pending_orders().len(), 1);

        let mut prices = HashMap::new();
        prices.insert("005930".to_string(), dec!(68500));
        let fills = trader.update_prices(&prices);

        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].reason, TradeReason::LimitTrigger);
        assert!(trader.pending_orders().is_empty());
        // 체결이 포지션으로 이어짐
        assert_eq!(trader.positions().len(), 1);
    }

    #[test]
    fn test_stop_loss_trigger_routes_through_sell() {
        let notifier = Arc::new(RecordingNotifier::default());
        let trader = PaperTrader::new(TradingConfig::default(), RiskConfig::default())
            .with_notifier(notifier.clone());

        trader.buy("005930", "삼성전자", dec!(70000), dec!(10)).unwrap();

        // 손절 수준(68600) 아래로 하락
        let mut prices = HashMap::new();
        prices.insert("005930".to_string(), dec!(68000));
        let fills = trader.update_prices(&prices);

        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].reason, TradeReason::StopLoss);
        assert!(trader.positions().is_empty());
        assert!(trader.holdings().is_empty());

        let events = notifier.events.lock().unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, NotificationEvent::StopLossTriggered { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, NotificationEvent::PositionClosed { .. })));
    }

    #[test]
    fn test_manual_pause_and_resume() {
        let trader = test_trader();

        trader.pause_trading();
        assert!(trader.is_paused());

        let result = trader.buy("005930", "삼성전자", dec!(70000), dec!(1));
        assert!(matches!(result, Err(TraderError::TradingPaused)));

        trader.resume_trading();
        assert!(!trader.is_paused());
        assert!(trader.buy("005930", "삼성전자", dec!(70000), dec!(1)).is_ok());
    }

    #[test]
    fn test_session_force_close_on_restart() {
        let trader = test_trader();

        let first = trader.start_session("아침");
        let second = trader.start_session("오후");

        assert_ne!(first, second);
        // 첫 세션은 강제 종료되어 이력에 있음
        let history = trader.session_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, first);
    }

    #[test]
    fn test_session_records_trades() {
        let trader = test_trader();
        trader.start_session("테스트");

        trader.buy("005930", "삼성전자", dec!(70000), dec!(10)).unwrap();
        trader.sell("005930", dec!(71000), None).unwrap();

        let report = trader.end_session().unwrap();

        assert_eq!(report.trade_count, 2);
        assert_eq!(report.buy_count, 1);
        assert_eq!(report.sell_count, 1);
        assert!(report.realized_pnl > Decimal::ZERO);
        assert!(report.ended_at.is_some());
    }

    #[test]
    fn test_close_all_positions() {
        let trader = test_trader();
        trader.buy("005930", "삼성전자", dec!(70000), dec!(10)).unwrap();
        trader.buy("000660", "SK하이닉스", dec!(100000), dec!(5)).unwrap();

        let records = trader.close_all_positions();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.reason == TradeReason::SessionClose));
        assert!(trader.positions().is_empty());
        assert!(trader.holdings().is_empty());
    }

    #[test]
    fn test_cancel_order_after_fill_is_already_complete() {
        let trader = test_trader();

        let report = trader.buy("005930", "삼성전자", dec!(70000), dec!(10)).unwrap();

        let result = trader.cancel_order(report.order.id);
        assert!(matches!(
            result,
            Err(TraderError::Executor(ExecutorError::AlreadyComplete(_)))
        ));
    }

    #[test]
    fn test_export_state_round_trip() {
        let trader = test_trader();
        trader.start_session("테스트");
        trader.buy("005930", "삼성전자", dec!(70000), dec!(10)).unwrap();

        let exported = trader.export_state();
        let json = serde_json::to_string(&exported).unwrap();
        let restored: StateExport = serde_json::from_str(&json).unwrap();

        // 복원된 스냅샷은 현금/보유/포지션이 원 단위까지 일치해야 함
        assert_eq!(restored.portfolio.cash, exported.portfolio.cash);
        assert_eq!(restored.holdings.len(), 1);
        assert_eq!(restored.holdings[0].quantity, dec!(10));
        assert_eq!(restored.open_positions.len(), 1);
        assert_eq!(
            restored.open_positions[0].entry_price,
            exported.open_positions[0].entry_price
        );
        assert_eq!(restored.daily_pnl, exported.daily_pnl);
    }
}
