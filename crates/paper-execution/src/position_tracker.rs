//! 포지션 추적 및 리스크 평가.
//!
//! 제공 기능:
//! - 체결에 따른 포지션 오픈/추가/축소/종료
//! - 손절/익절 조건 평가 (평가만 하고 청산 결정은 오케스트레이터 몫)
//! - 추적 손절 수준 상향 (절대 하향하지 않음)
//! - 손익 집계 및 노출 보고

use chrono::{DateTime, Utc};
use paper_core::{Percentage, Position, Price, Quantity, TradeReason};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// ATR 기반 추적 손절의 기본 배수.
const ATR_STOP_MULTIPLIER: u32 = 2;

/// 포지션 트래커 에러 타입.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PositionTrackerError {
    #[error("Position not found for code: {0}")]
    PositionNotFound(String),
}

/// 손절/익절 트리거 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    /// 손절 조건 충족 (`price <= stop_loss`)
    StopLoss,
    /// 익절 조건 충족 (`price >= take_profit`)
    TakeProfit,
}

impl From<TriggerReason> for TradeReason {
    fn from(reason: TriggerReason) -> Self {
        match reason {
            TriggerReason::StopLoss => TradeReason::StopLoss,
            TriggerReason::TakeProfit => TradeReason::TakeProfit,
        }
    }
}

impl std::fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerReason::StopLoss => write!(f, "stop_loss"),
            TriggerReason::TakeProfit => write!(f, "take_profit"),
        }
    }
}

/// 손절/익절 조건 충족 보고.
///
/// 트리거는 보고일 뿐이며 포지션을 직접 청산하지 않습니다. 청산 실행은
/// 오케스트레이터가 담당해 리스크 평가와 실행을 분리합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopTrigger {
    /// 종목 코드
    pub code: String,
    /// 종목명
    pub name: String,
    /// 트리거 사유
    pub reason: TriggerReason,
    /// 설정되어 있던 트리거 수준
    pub trigger_level: Price,
    /// 트리거 시점의 현재 가격
    pub current_price: Price,
    /// 청산 대상 수량
    pub quantity: Quantity,
}

/// 포지션 변경 이벤트.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PositionTrackerEvent {
    /// 포지션 오픈
    Opened {
        position_id: Uuid,
        code: String,
        quantity: Quantity,
        price: Price,
        timestamp: DateTime<Utc>,
    },
    /// 포지션 증가 (추가 매수)
    Increased {
        position_id: Uuid,
        quantity: Quantity,
        price: Price,
        new_total: Quantity,
        timestamp: DateTime<Utc>,
    },
    /// 포지션 감소 (부분 청산)
    Decreased {
        position_id: Uuid,
        quantity: Quantity,
        price: Price,
        realized_pnl: Decimal,
        remaining: Quantity,
        timestamp: DateTime<Utc>,
    },
    /// 포지션 종료 (전량 청산)
    Closed {
        position_id: Uuid,
        final_pnl: Decimal,
        timestamp: DateTime<Utc>,
    },
}

/// 포지션 집계 요약.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSummary {
    /// 오픈 포지션 수
    pub open_count: usize,
    /// 종료 포지션 수
    pub closed_count: usize,
    /// 오픈 포지션 평가액
    pub market_value: Decimal,
    /// 오픈 포지션 매수 원가
    pub cost_basis: Decimal,
    /// 미실현 손익
    pub unrealized_pnl: Decimal,
    /// 실현 손익 (부분 청산 포함)
    pub realized_pnl: Decimal,
    /// 수익 종료 횟수
    pub winning_trades: usize,
    /// 손실 종료 횟수
    pub losing_trades: usize,
    /// 승률
    pub win_rate: f64,
    /// 종료 포지션의 평균 보유 시간 (초)
    pub avg_holding_secs: i64,
    /// 단일 포지션 최대 이익
    pub max_single_gain: Decimal,
    /// 단일 포지션 최대 손실
    pub max_single_loss: Decimal,
}

/// 종목별 노출.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeExposure {
    /// 종목 코드
    pub code: String,
    /// 평가액
    pub market_value: Decimal,
    /// 총 노출 대비 비중 (%)
    pub concentration_pct: Decimal,
}

/// 리스크 노출 보고.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskExposure {
    /// 총 노출 (오픈 포지션 평가액 합)
    pub total_exposure: Decimal,
    /// 손실 중인 포지션의 미실현 손실 합 (양수로 보고)
    pub unrealized_loss: Decimal,
    /// 종목별 집중도
    pub concentrations: Vec<CodeExposure>,
    /// 전략별 노출
    pub by_strategy: HashMap<String, Decimal>,
}

/// 오픈/종료 포지션을 관리하는 트래커.
#[derive(Debug, Default)]
pub struct PositionTracker {
    /// 종목 코드별 오픈 포지션
    open: HashMap<String, Position>,
    /// 종료된 포지션 이력
    closed: Vec<Position>,
    /// 포지션 이벤트
    events: Vec<PositionTrackerEvent>,
    /// 최대 이력 크기
    max_history_size: usize,
}

impl PositionTracker {
    /// 새 포지션 트래커를 생성합니다.
    pub fn new() -> Self {
        Self {
            open: HashMap::new(),
            closed: Vec::new(),
            events: Vec::new(),
            max_history_size: 10000,
        }
    }

    /// 커스텀 이력 크기로 생성합니다.
    pub fn with_history_size(max_history_size: usize) -> Self {
        Self {
            max_history_size,
            ..Self::new()
        }
    }

    // ==================== 포지션 오픈/종료 ====================

    /// 포지션을 오픈합니다.
    ///
    /// 같은 종목의 포지션이 이미 있으면 거래량 가중 평균으로 병합하고
    /// 수량을 합산합니다 (추가 매수). 이때 새로 지정한 손절/익절/추적
    /// 손절 수준이 기존 값을 대체합니다.
    pub fn open_position(
        &mut self,
        code: &str,
        name: &str,
        entry_price: Price,
        quantity: Quantity,
        stop_loss: Option<Price>,
        take_profit: Option<Price>,
        trailing_stop_pct: Option<Percentage>,
    ) -> Position {
        let now = Utc::now();

        if let Some(position) = self.open.get_mut(code) {
            position.add(entry_price, quantity);
            if stop_loss.is_some() {
                position.stop_loss = stop_loss;
            }
            if take_profit.is_some() {
                position.take_profit = take_profit;
            }
            if trailing_stop_pct.is_some() {
                position.trailing_stop_pct = trailing_stop_pct;
            }

            let snapshot = position.clone();
            self.events.push(PositionTrackerEvent::Increased {
                position_id: snapshot.id,
                quantity,
                price: entry_price,
                new_total: snapshot.quantity,
                timestamp: now,
            });
            self.trim_history();

            debug!(code = %code, quantity = %quantity, total = %snapshot.quantity, "포지션 추가");
            return snapshot;
        }

        let mut position = Position::new(code, name, entry_price, quantity);
        position.stop_loss = stop_loss;
        position.take_profit = take_profit;
        position.trailing_stop_pct = trailing_stop_pct;

        let snapshot = position.clone();
        self.open.insert(code.to_string(), position);
        self.events.push(PositionTrackerEvent::Opened {
            position_id: snapshot.id,
            code: code.to_string(),
            quantity,
            price: entry_price,
            timestamp: now,
        });
        self.trim_history();

        info!(
            code = %code,
            quantity = %quantity,
            price = %entry_price,
            stop_loss = ?stop_loss,
            take_profit = ?take_profit,
            "포지션 오픈"
        );
        snapshot
    }

    /// 포지션을 청산합니다.
    ///
    /// 수량을 생략하면 전량 청산하며, 보유 수량을 초과하는 요청은 보유
    /// 수량으로 잘라서 처리합니다. 수량이 0이 되면 포지션은 종료 이력으로
    /// 이동합니다. 반환값은 (청산 후 포지션 스냅샷, 실현 손익)입니다.
    pub fn close_position(
        &mut self,
        code: &str,
        exit_price: Price,
        quantity: Option<Quantity>,
        reason: TradeReason,
    ) -> Result<(Position, Decimal), PositionTrackerError> {
        let position = self
            .open
            .get_mut(code)
            .ok_or_else(|| PositionTrackerError::PositionNotFound(code.to_string()))?;

        let requested = quantity.unwrap_or(position.quantity);
        let pnl = position.reduce(exit_price, requested, reason);
        let snapshot = position.clone();
        let now = Utc::now();

        if snapshot.is_closed() {
            self.open.remove(code);
            self.closed.push(snapshot.clone());
            self.events.push(PositionTrackerEvent::Closed {
                position_id: snapshot.id,
                final_pnl: snapshot.realized_pnl,
                timestamp: now,
            });
            info!(
                code = %code,
                realized_pnl = %snapshot.realized_pnl,
                reason = %reason,
                "포지션 종료"
            );
        } else {
            let exited = snapshot
                .exits
                .last()
                .map(|e| e.quantity)
                .unwrap_or(requested);
            self.events.push(PositionTrackerEvent::Decreased {
                position_id: snapshot.id,
                quantity: exited,
                price: exit_price,
                realized_pnl: pnl,
                remaining: snapshot.quantity,
                timestamp: now,
            });
            debug!(code = %code, remaining = %snapshot.quantity, "포지션 축소");
        }

        self.trim_history();
        Ok((snapshot, pnl))
    }

    // ==================== 시세 및 리스크 평가 ====================

    /// 오픈 포지션의 시세를 갱신합니다.
    pub fn update_prices(&mut self, prices: &HashMap<String, Price>) {
        for (code, position) in self.open.iter_mut() {
            if let Some(&price) = prices.get(code) {
                position.update_price(price);
            }
        }
    }

    /// 모든 오픈 포지션의 손절/익절 조건을 평가합니다.
    ///
    /// 손절 조건이 우선하며, 트리거는 보고만 하고 포지션을 변경하지
    /// 않습니다.
    pub fn check_stop_conditions(&self, prices: &HashMap<String, Price>) -> Vec<StopTrigger> {
        let mut triggers = Vec::new();

        for (code, position) in &self.open {
            let Some(&price) = prices.get(code) else {
                continue;
            };

            if let Some(stop_loss) = position.stop_loss {
                if price <= stop_loss {
                    triggers.push(StopTrigger {
                        code: code.clone(),
                        name: position.name.clone(),
                        reason: TriggerReason::StopLoss,
                        trigger_level: stop_loss,
                        current_price: price,
                        quantity: position.quantity,
                    });
                    continue;
                }
            }

            if let Some(take_profit) = position.take_profit {
                if price >= take_profit {
                    triggers.push(StopTrigger {
                        code: code.clone(),
                        name: position.name.clone(),
                        reason: TriggerReason::TakeProfit,
                        trigger_level: take_profit,
                        current_price: price,
                        quantity: position.quantity,
                    });
                }
            }
        }

        triggers
    }

    /// 추적 손절 수준을 갱신합니다.
    ///
    /// 추적 손절 비율이 설정된 포지션에 대해 손절 수준을
    /// `현재가 × (1 − 비율)`로 끌어올립니다. ATR 데이터가 있으면
    /// `현재가 − ATR × 배수`를 사용합니다. 수준은 절대 내려가지 않습니다.
    /// 갱신된 (종목 코드, 새 손절 수준) 목록을 반환합니다.
    pub fn update_trailing_stops(
        &mut self,
        prices: &HashMap<String, Price>,
        atr: Option<&HashMap<String, Decimal>>,
    ) -> Vec<(String, Price)> {
        let mut raised = Vec::new();

        for (code, position) in self.open.iter_mut() {
            let Some(pct) = position.trailing_stop_pct else {
                continue;
            };
            let Some(&price) = prices.get(code) else {
                continue;
            };

            let candidate = match atr.and_then(|m| m.get(code)) {
                Some(&atr_value) => price - atr_value * Decimal::from(ATR_STOP_MULTIPLIER),
                None => price * (Decimal::ONE - pct / Decimal::from(100)),
            };

            let should_raise = match position.stop_loss {
                Some(current) => candidate > current,
                None => true,
            };
            if should_raise {
                position.stop_loss = Some(candidate);
                raised.push((code.clone(), candidate));
                debug!(code = %code, stop_loss = %candidate, "추적 손절 상향");
            }
        }

        raised
    }

    // ==================== 조회 ====================

    /// 종목의 오픈 포지션을 조회합니다.
    pub fn get_position(&self, code: &str) -> Option<&Position> {
        self.open.get(code)
    }

    /// 모든 오픈 포지션을 반환합니다.
    pub fn open_positions(&self) -> Vec<&Position> {
        self.open.values().collect()
    }

    /// 종료된 포지션들을 반환합니다.
    pub fn closed_positions(&self) -> &[Position] {
        &self.closed
    }

    /// 종목의 오픈 포지션 존재 여부를 확인합니다.
    pub fn has_position(&self, code: &str) -> bool {
        self.open.contains_key(code)
    }

    /// 오픈 포지션 수를 반환합니다.
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// 포지션 이벤트들을 반환합니다.
    pub fn events(&self) -> &[PositionTrackerEvent] {
        &self.events
    }

    // ==================== 집계 ====================

    /// 총 미실현 손익을 반환합니다.
    pub fn total_unrealized_pnl(&self) -> Decimal {
        self.open.values().map(|p| p.unrealized_pnl()).sum()
    }

    /// 총 실현 손익을 반환합니다 (오픈 포지션의 부분 청산 포함).
    pub fn total_realized_pnl(&self) -> Decimal {
        let open_realized: Decimal = self.open.values().map(|p| p.realized_pnl).sum();
        let closed_realized: Decimal = self.closed.iter().map(|p| p.realized_pnl).sum();
        open_realized + closed_realized
    }

    /// 총 노출을 반환합니다.
    pub fn total_exposure(&self) -> Decimal {
        self.open.values().map(|p| p.market_value()).sum()
    }

    /// 포지션 집계 요약을 반환합니다.
    pub fn summary(&self) -> PositionSummary {
        let winning = self
            .closed
            .iter()
            .filter(|p| p.realized_pnl > Decimal::ZERO)
            .count();
        let losing = self
            .closed
            .iter()
            .filter(|p| p.realized_pnl < Decimal::ZERO)
            .count();
        let closed_count = self.closed.len();

        let avg_holding_secs = if closed_count > 0 {
            self.closed
                .iter()
                .map(|p| p.holding_duration().num_seconds())
                .sum::<i64>()
                / closed_count as i64
        } else {
            0
        };

        PositionSummary {
            open_count: self.open.len(),
            closed_count,
            market_value: self.total_exposure(),
            cost_basis: self.open.values().map(|p| p.cost_basis()).sum(),
            unrealized_pnl: self.total_unrealized_pnl(),
            realized_pnl: self.total_realized_pnl(),
            winning_trades: winning,
            losing_trades: losing,
            win_rate: if closed_count > 0 {
                winning as f64 / closed_count as f64
            } else {
                0.0
            },
            avg_holding_secs,
            max_single_gain: self
                .closed
                .iter()
                .map(|p| p.realized_pnl)
                .max()
                .unwrap_or(Decimal::ZERO)
                .max(Decimal::ZERO),
            max_single_loss: self
                .closed
                .iter()
                .map(|p| p.realized_pnl)
                .min()
                .unwrap_or(Decimal::ZERO)
                .min(Decimal::ZERO),
        }
    }

    /// 리스크 노출 보고를 반환합니다.
    pub fn risk_exposure(&self) -> RiskExposure {
        let total = self.total_exposure();

        let mut concentrations: Vec<CodeExposure> = self
            .open
            .iter()
            .map(|(code, p)| {
                let market_value = p.market_value();
                let concentration_pct = if total > Decimal::ZERO {
                    market_value / total * Decimal::from(100)
                } else {
                    Decimal::ZERO
                };
                CodeExposure {
                    code: code.clone(),
                    market_value,
                    concentration_pct,
                }
            })
            .collect();
        concentrations.sort_by(|a, b| b.market_value.cmp(&a.market_value));

        let unrealized_loss = self
            .open
            .values()
            .map(|p| p.unrealized_pnl())
            .filter(|pnl| *pnl < Decimal::ZERO)
            .map(|pnl| pnl.abs())
            .sum();

        let mut by_strategy: HashMap<String, Decimal> = HashMap::new();
        for position in self.open.values() {
            if let Some(strategy) = &position.strategy_id {
                *by_strategy.entry(strategy.clone()).or_insert(Decimal::ZERO) +=
                    position.market_value();
            }
        }

        RiskExposure {
            total_exposure: total,
            unrealized_loss,
            concentrations,
            by_strategy,
        }
    }

    // ==================== 내부 ====================

    fn trim_history(&mut self) {
        if self.events.len() > self.max_history_size {
            let drain_count = self.events.len() - self.max_history_size;
            self.events.drain(0..drain_count);
        }
        if self.closed.len() > self.max_history_size {
            let drain_count = self.closed.len() - self.max_history_size;
            self.closed.drain(0..drain_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    /// Decimal 생성을 위한 헬퍼 매크로
    macro_rules! dec {
        ($val:expr) => {
            Decimal::from_f64($val as f64).unwrap()
        };
    }

    fn open_default(tracker: &mut PositionTracker) -> Position {
        tracker.open_position(
            "005930",
            "삼성전자",
            dec!(70000),
            dec!(10),
            Some(dec!(68600)), // -2%
            Some(dec!(73500)), // +5%
            None,
        )
    }

    #[test]
    fn test_open_position() {
        let mut tracker = PositionTracker::new();

        let position = open_default(&mut tracker);

        assert_eq!(position.quantity, dec!(10));
        assert_eq!(position.entry_price, dec!(70000));
        assert_eq!(position.stop_loss, Some(dec!(68600)));
        assert_eq!(tracker.open_count(), 1);
    }

    #[test]
    fn test_open_existing_merges_vwap() {
        let mut tracker = PositionTracker::new();
        open_default(&mut tracker);

        let merged = tracker.open_position(
            "005930",
            "삼성전자",
            dec!(72000),
            dec!(10),
            None,
            None,
            None,
        );

        // 평균가: (70000*10 + 72000*10) / 20 = 71000
        assert_eq!(merged.quantity, dec!(20));
        assert_eq!(merged.entry_price, dec!(71000));
        // 기존 손절/익절 유지
        assert_eq!(merged.stop_loss, Some(dec!(68600)));
        assert_eq!(tracker.open_count(), 1);
    }

    #[test]
    fn test_close_position_full() {
        let mut tracker = PositionTracker::new();
        open_default(&mut tracker);

        let (position, pnl) = tracker
            .close_position("005930", dec!(73000), None, TradeReason::Manual)
            .unwrap();

        assert_eq!(pnl, dec!(30000)); // (73000-70000)*10
        assert!(position.is_closed());
        assert!(!tracker.has_position("005930"));
        assert_eq!(tracker.closed_positions().len(), 1);
    }

    #[test]
    fn test_close_position_partial() {
        let mut tracker = PositionTracker::new();
        open_default(&mut tracker);

        let (position, pnl) = tracker
            .close_position("005930", dec!(73000), Some(dec!(4)), TradeReason::Manual)
            .unwrap();

        assert_eq!(pnl, dec!(12000));
        assert!(position.is_open());
        assert_eq!(position.quantity, dec!(6));
        assert!(tracker.has_position("005930"));

        // 불변 조건: quantity = entry_quantity - Σ exit.quantity
        assert_eq!(
            position.quantity,
            position.entry_quantity - position.exited_quantity()
        );
    }

    #[test]
    fn test_close_position_not_found() {
        let mut tracker = PositionTracker::new();

        let result = tracker.close_position("999999", dec!(1000), None, TradeReason::Manual);
        assert!(matches!(
            result,
            Err(PositionTrackerError::PositionNotFound(_))
        ));
    }

    #[test]
    fn test_stop_loss_trigger() {
        let mut tracker = PositionTracker::new();
        open_default(&mut tracker);

        let mut prices = HashMap::new();
        prices.insert("005930".to_string(), dec!(68000));
        tracker.update_prices(&prices);

        let triggers = tracker.check_stop_conditions(&prices);

        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].reason, TriggerReason::StopLoss);
        assert_eq!(triggers[0].trigger_level, dec!(68600));
        assert_eq!(triggers[0].current_price, dec!(68000));
        // 트리거는 포지션을 변경하지 않음
        assert!(tracker.has_position("005930"));
    }

    #[test]
    fn test_take_profit_trigger() {
        let mut tracker = PositionTracker::new();
        open_default(&mut tracker);

        let mut prices = HashMap::new();
        prices.insert("005930".to_string(), dec!(74000));

        let triggers = tracker.check_stop_conditions(&prices);

        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].reason, TriggerReason::TakeProfit);
    }

    #[test]
    fn test_no_trigger_within_band() {
        let mut tracker = PositionTracker::new();
        open_default(&mut tracker);

        let mut prices = HashMap::new();
        prices.insert("005930".to_string(), dec!(71000));

        assert!(tracker.check_stop_conditions(&prices).is_empty());
    }

    #[test]
    fn test_trailing_stop_raises_never_lowers() {
        let mut tracker = PositionTracker::new();
        tracker.open_position(
            "005930",
            "삼성전자",
            dec!(70000),
            dec!(10),
            Some(dec!(68600)),
            None,
            Some(dec!(2)), // 2% 추적
        );

        // 가격 상승: 손절 수준 상향 72000 * 0.98 = 70560
        let mut prices = HashMap::new();
        prices.insert("005930".to_string(), dec!(72000));
        let raised = tracker.update_trailing_stops(&prices, None);

        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].1, dec!(70560));

        // 가격 하락: 손절 수준 유지
        prices.insert("005930".to_string(), dec!(71000));
        let raised = tracker.update_trailing_stops(&prices, None);

        assert!(raised.is_empty());
        assert_eq!(
            tracker.get_position("005930").unwrap().stop_loss,
            Some(dec!(70560))
        );
    }

    #[test]
    fn test_trailing_stop_with_atr() {
        let mut tracker = PositionTracker::new();
        tracker.open_position(
            "005930",
            "삼성전자",
            dec!(70000),
            dec!(10),
            None,
            None,
            Some(dec!(2)),
        );

        let mut prices = HashMap::new();
        prices.insert("005930".to_string(), dec!(72000));
        let mut atr = HashMap::new();
        atr.insert("005930".to_string(), dec!(500));

        let raised = tracker.update_trailing_stops(&prices, Some(&atr));

        // 72000 - 500*2 = 71000
        assert_eq!(raised[0].1, dec!(71000));
    }

    #[test]
    fn test_summary() {
        let mut tracker = PositionTracker::new();

        // 수익 종료
        tracker.open_position("005930", "삼성전자", dec!(70000), dec!(10), None, None, None);
        tracker
            .close_position("005930", dec!(73000), None, TradeReason::TakeProfit)
            .unwrap();

        // 손실 종료
        tracker.open_position("000660", "SK하이닉스", dec!(120000), dec!(5), None, None, None);
        tracker
            .close_position("000660", dec!(118000), None, TradeReason::StopLoss)
            .unwrap();

        // 오픈 유지
        tracker.open_position("035720", "카카오", dec!(50000), dec!(20), None, None, None);

        let summary = tracker.summary();

        assert_eq!(summary.open_count, 1);
        assert_eq!(summary.closed_count, 2);
        assert_eq!(summary.winning_trades, 1);
        assert_eq!(summary.losing_trades, 1);
        assert!((summary.win_rate - 0.5).abs() < 0.01);
        assert_eq!(summary.realized_pnl, dec!(20000)); // 30000 - 10000
        assert_eq!(summary.max_single_gain, dec!(30000));
        assert_eq!(summary.max_single_loss, dec!(-10000));
        assert_eq!(summary.market_value, dec!(1000000));
    }

    #[test]
    fn test_risk_exposure() {
        let mut tracker = PositionTracker::new();

        tracker.open_position("005930", "삼성전자", dec!(70000), dec!(10), None, None, None);
        tracker.open_position("000660", "SK하이닉스", dec!(100000), dec!(3), None, None, None);

        // 한 종목은 손실 상태로
        let mut prices = HashMap::new();
        prices.insert("005930".to_string(), dec!(68000));
        tracker.update_prices(&prices);

        let exposure = tracker.risk_exposure();

        // 680000 + 300000
        assert_eq!(exposure.total_exposure, dec!(980000));
        assert_eq!(exposure.unrealized_loss, dec!(20000));
        assert_eq!(exposure.concentrations.len(), 2);
        // 평가액 내림차순
        assert_eq!(exposure.concentrations[0].code, "005930");
    }

    #[test]
    fn test_events_recorded() {
        let mut tracker = PositionTracker::new();

        tracker.open_position("005930", "삼성전자", dec!(70000), dec!(10), None, None, None);
        tracker.open_position("005930", "삼성전자", dec!(71000), dec!(5), None, None, None);
        tracker
            .close_position("005930", dec!(72000), Some(dec!(5)), TradeReason::Manual)
            .unwrap();
        tracker
            .close_position("005930", dec!(72000), None, TradeReason::Manual)
            .unwrap();

        let events = tracker.events();
        assert_eq!(events.len(), 4); // 오픈, 증가, 감소, 종료
        assert!(matches!(events[0], PositionTrackerEvent::Opened { .. }));
        assert!(matches!(events[1], PositionTrackerEvent::Increased { .. }));
        assert!(matches!(events[2], PositionTrackerEvent::Decreased { .. }));
        assert!(matches!(events[3], PositionTrackerEvent::Closed { .. }));
    }
}
