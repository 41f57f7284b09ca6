//! 가상 계좌 원장.
//!
//! 제공 기능:
//! - 현금과 보유 종목 관리
//! - 슬리피지/수수료/거래세를 반영한 매수/매도 처리
//! - 종목당/계좌 전체 노출 한도 적용
//! - 시세 반영(mark-to-market) 및 스냅샷 조회
//!
//! 모든 검사는 상태 변경 전에 수행됩니다. 거부된 호출은 원장을 일절
//! 변경하지 않으며, 수락된 호출 이후 현금은 항상 0 이상입니다.

use paper_core::{Holding, Price, Quantity, TradingConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// 원장 에러 타입.
///
/// 모두 비즈니스 규칙 거부이며, 호출자가 프로그램적으로 대응할 수 있도록
/// 한도/요청 값을 함께 전달합니다.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("Insufficient cash: required {required}, available {available}")]
    InsufficientCash {
        required: Decimal,
        available: Decimal,
    },

    #[error("Max positions reached: limit {limit}")]
    MaxPositionsReached { limit: usize },

    #[error("Position limit exceeded: {requested_pct}% requested, limit {limit_pct}%")]
    PositionLimitExceeded {
        requested_pct: Decimal,
        limit_pct: Decimal,
    },

    #[error("Position not found: {0}")]
    PositionNotFound(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(Decimal),
}

/// 매수 체결 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyFill {
    /// 종목 코드
    pub code: String,
    /// 체결 수량
    pub quantity: Quantity,
    /// 체결 가격 (슬리피지 반영)
    pub price: Price,
    /// 수수료
    pub commission: Decimal,
    /// 체결 후 잔여 현금
    pub cash_after: Decimal,
}

/// 매도 체결 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellFill {
    /// 종목 코드
    pub code: String,
    /// 체결 수량 (보유 수량으로 잘린 뒤)
    pub quantity: Quantity,
    /// 체결 가격 (슬리피지 반영)
    pub price: Price,
    /// 수수료
    pub commission: Decimal,
    /// 거래세
    pub tax: Decimal,
    /// 실현 손익 (비용 차감 후)
    pub realized_pnl: Decimal,
    /// 체결 후 잔여 현금
    pub cash_after: Decimal,
}

/// 원장 스냅샷.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// 현금
    pub cash: Decimal,
    /// 보유 종목 평가액
    pub holdings_value: Decimal,
    /// 총 평가액 (현금 + 보유 종목)
    pub total_value: Decimal,
    /// 누적 실현 손익
    pub realized_pnl: Decimal,
    /// 미실현 손익
    pub unrealized_pnl: Decimal,
    /// 누적 수수료
    pub commission_paid: Decimal,
    /// 누적 거래세
    pub tax_paid: Decimal,
    /// 보유 종목 수
    pub position_count: usize,
}

/// 매수 가능 여부 보고서 (`can_buy`의 결과).
#[derive(Debug, Clone)]
pub struct BuyFeasibility {
    /// 매수 가능 여부
    pub affordable: bool,
    /// 불가능한 경우 그 사유
    pub reason: Option<LedgerError>,
    /// 요청 수량에 필요한 금액 (수수료 포함)
    pub required: Decimal,
    /// 사용 가능한 현금
    pub available: Decimal,
    /// 현재 현금으로 매수 가능한 최대 수량
    pub max_quantity: Quantity,
}

/// 현금과 보유 종목을 관리하는 가상 계좌 원장.
#[derive(Debug, Clone)]
pub struct Ledger {
    /// 현금 잔고
    cash: Decimal,
    /// 종목 코드별 보유 내역
    holdings: HashMap<String, Holding>,
    /// 매매 비용 및 한도 설정
    config: TradingConfig,
    /// 누적 실현 손익
    realized_pnl: Decimal,
    /// 누적 수수료
    commission_paid: Decimal,
    /// 누적 거래세
    tax_paid: Decimal,
}

impl Ledger {
    /// 설정의 초기 자본금으로 새 원장을 생성합니다.
    pub fn new(config: TradingConfig) -> Self {
        Self {
            cash: config.initial_capital,
            holdings: HashMap::new(),
            config,
            realized_pnl: Decimal::ZERO,
            commission_paid: Decimal::ZERO,
            tax_paid: Decimal::ZERO,
        }
    }

    // ==================== 매수 ====================

    /// 종목을 매수합니다.
    ///
    /// 슬리피지로 체결가를 올리고 수수료를 부과한 뒤, 현금/보유 한도를
    /// 모두 통과해야 체결됩니다. 거부 시 상태는 변경되지 않습니다.
    pub fn buy(
        &mut self,
        code: &str,
        name: &str,
        price: Price,
        quantity: Quantity,
    ) -> Result<BuyFill, LedgerError> {
        if quantity <= Decimal::ZERO {
            return Err(LedgerError::InvalidQuantity(quantity));
        }

        let exec_price = self.buy_price(price);
        let notional = exec_price * quantity;
        let commission = self.commission(notional);
        let required = notional + commission;

        // 검사 1: 현금
        if required > self.cash {
            return Err(LedgerError::InsufficientCash {
                required,
                available: self.cash,
            });
        }

        // 검사 2: 신규 종목이면 보유 종목 수 한도
        let is_new = !self.holdings.contains_key(code);
        if is_new && self.holdings.len() >= self.config.max_positions {
            return Err(LedgerError::MaxPositionsReached {
                limit: self.config.max_positions,
            });
        }

        // 검사 3: 종목당 비중 한도 (체결 후 기준)
        let held_value = self
            .holdings
            .get(code)
            .map(|h| h.quantity * exec_price)
            .unwrap_or(Decimal::ZERO);
        let other_value: Decimal = self
            .holdings
            .iter()
            .filter(|(c, _)| c.as_str() != code)
            .map(|(_, h)| h.market_value())
            .sum();
        let position_after = held_value + notional;
        let total_after = self.cash - required + other_value + position_after;

        if total_after > Decimal::ZERO {
            let requested_pct = position_after / total_after * Decimal::from(100);
            if requested_pct > self.config.max_position_pct {
                return Err(LedgerError::PositionLimitExceeded {
                    requested_pct: requested_pct.round_dp(2),
                    limit_pct: self.config.max_position_pct,
                });
            }
        }

        // 모든 검사 통과 - 상태 반영
        self.cash -= required;
        self.commission_paid += commission;
        self.holdings
            .entry(code.to_string())
            .and_modify(|h| h.apply_buy(exec_price, quantity))
            .or_insert_with(|| Holding::new(code, name, exec_price, quantity));

        debug!(
            code = %code,
            quantity = %quantity,
            price = %exec_price,
            commission = %commission,
            cash = %self.cash,
            "매수 체결"
        );

        Ok(BuyFill {
            code: code.to_string(),
            quantity,
            price: exec_price,
            commission,
            cash_after: self.cash,
        })
    }

    /// 매수 가능 여부를 상태 변경 없이 검사합니다.
    ///
    /// 사전 검증과 최대 매수 가능 수량 계산에 사용됩니다.
    pub fn can_buy(&self, code: &str, price: Price, quantity: Quantity) -> BuyFeasibility {
        let exec_price = self.buy_price(price);
        let notional = exec_price * quantity;
        let commission = self.commission(notional);
        let required = notional + commission;

        let reason = if quantity <= Decimal::ZERO {
            Some(LedgerError::InvalidQuantity(quantity))
        } else if required > self.cash {
            Some(LedgerError::InsufficientCash {
                required,
                available: self.cash,
            })
        } else if !self.holdings.contains_key(code)
            && self.holdings.len() >= self.config.max_positions
        {
            Some(LedgerError::MaxPositionsReached {
                limit: self.config.max_positions,
            })
        } else {
            None
        };

        BuyFeasibility {
            affordable: reason.is_none(),
            reason,
            required,
            available: self.cash,
            max_quantity: self.max_affordable_quantity(price),
        }
    }

    /// 현재 현금으로 매수 가능한 최대 수량을 계산합니다.
    pub fn max_affordable_quantity(&self, price: Price) -> Quantity {
        let exec_price = self.buy_price(price);
        if exec_price <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let unit_cost = exec_price * (Decimal::ONE + self.config.commission_rate);
        let mut qty = (self.cash / unit_cost).floor();

        // 최소 수수료 바닥 때문에 한 단위 더 줄어야 할 수 있음
        while qty > Decimal::ZERO {
            let notional = exec_price * qty;
            if notional + self.commission(notional) <= self.cash {
                break;
            }
            qty -= Decimal::ONE;
        }
        qty.max(Decimal::ZERO)
    }

    // ==================== 매도 ====================

    /// 종목을 매도합니다.
    ///
    /// 수량을 생략하면 전량 매도하며, 보유 수량을 초과하는 요청은 보유
    /// 수량으로 잘라서 처리합니다. 실현 손익은 순매도대금에서 매수 원가를
    /// 뺀 값입니다.
    pub fn sell(
        &mut self,
        code: &str,
        price: Price,
        quantity: Option<Quantity>,
    ) -> Result<SellFill, LedgerError> {
        let holding = self
            .holdings
            .get_mut(code)
            .ok_or_else(|| LedgerError::PositionNotFound(code.to_string()))?;

        let requested = quantity.unwrap_or(holding.quantity);
        if requested <= Decimal::ZERO {
            return Err(LedgerError::InvalidQuantity(requested));
        }

        let exec_price = price * (Decimal::ONE - self.config.slippage_rate);
        let (sold, gross_pnl) = holding.apply_sell(exec_price, requested);
        let notional = exec_price * sold;
        let commission = {
            let c = notional * self.config.commission_rate;
            c.max(self.config.min_commission)
        };
        let tax = notional * self.config.tax_rate;
        let realized = gross_pnl - commission - tax;

        self.cash += notional - commission - tax;
        self.realized_pnl += realized;
        self.commission_paid += commission;
        self.tax_paid += tax;

        if holding.is_empty() {
            self.holdings.remove(code);
        }

        debug!(
            code = %code,
            quantity = %sold,
            price = %exec_price,
            realized_pnl = %realized,
            cash = %self.cash,
            "매도 체결"
        );

        Ok(SellFill {
            code: code.to_string(),
            quantity: sold,
            price: exec_price,
            commission,
            tax,
            realized_pnl: realized,
            cash_after: self.cash,
        })
    }

    // ==================== 시세 및 조회 ====================

    /// 보유 종목의 시세를 갱신합니다 (평가액 반영 외 부수 효과 없음).
    pub fn update_prices(&mut self, prices: &HashMap<String, Price>) {
        for (code, holding) in self.holdings.iter_mut() {
            if let Some(&price) = prices.get(code) {
                holding.update_price(price);
            }
        }
    }

    /// 원장 스냅샷을 반환합니다.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let holdings_value: Decimal = self.holdings.values().map(|h| h.market_value()).sum();
        let unrealized_pnl: Decimal = self.holdings.values().map(|h| h.unrealized_pnl()).sum();

        LedgerSnapshot {
            cash: self.cash,
            holdings_value,
            total_value: self.cash + holdings_value,
            realized_pnl: self.realized_pnl,
            unrealized_pnl,
            commission_paid: self.commission_paid,
            tax_paid: self.tax_paid,
            position_count: self.holdings.len(),
        }
    }

    /// 현금 잔고를 반환합니다.
    pub fn cash(&self) -> Decimal {
        self.cash
    }

    /// 종목의 보유 내역을 반환합니다.
    pub fn get_holding(&self, code: &str) -> Option<&Holding> {
        self.holdings.get(code)
    }

    /// 모든 보유 내역을 반환합니다.
    pub fn holdings(&self) -> Vec<&Holding> {
        self.holdings.values().collect()
    }

    /// 보유 종목 수를 반환합니다.
    pub fn position_count(&self) -> usize {
        self.holdings.len()
    }

    /// 설정 참조를 반환합니다.
    pub fn config(&self) -> &TradingConfig {
        &self.config
    }

    // ==================== 내부 ====================

    fn buy_price(&self, price: Price) -> Price {
        price * (Decimal::ONE + self.config.slippage_rate)
    }

    fn commission(&self, notional: Decimal) -> Decimal {
        (notional * self.config.commission_rate).max(self.config.min_commission)
    }
}
