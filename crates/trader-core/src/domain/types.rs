//! 주문 관련 열거형.
//!
//! 저장소와 거래소 어댑터가 문자열로 주고받는 값은
//! `Display`/`FromStr`로 소문자 토큰과 변환됩니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 매수/매도 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// 반대 방향.
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for Side {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err(format!("Invalid side: {}", s)),
        }
    }
}

/// 주문 유형.
///
/// 주문 제출, 체결 시뮬레이션, 취소 경로가 모두 이 값으로 분기합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// 지정가
    Limit,
    /// 시장가
    Market,
    /// 스톱 시장가 (`price`가 트리거 가격)
    StopLoss,
}

impl OrderType {
    /// 제출 시 가격이 필요한 유형인지 여부.
    pub fn requires_price(self) -> bool {
        match self {
            OrderType::Limit | OrderType::StopLoss => true,
            OrderType::Market => false,
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Limit => write!(f, "limit"),
            OrderType::Market => write!(f, "market"),
            OrderType::StopLoss => write!(f, "stop_loss"),
        }
    }
}

impl FromStr for OrderType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "limit" => Ok(OrderType::Limit),
            "market" => Ok(OrderType::Market),
            "stop_loss" => Ok(OrderType::StopLoss),
            _ => Err(format!("Invalid order type: {}", s)),
        }
    }
}

/// 주문 상태.
///
/// `Open`만 비종결 상태입니다. 나머지는 한 번 도달하면 바뀌지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// 미체결
    Open,
    /// 전량 체결
    Closed,
    /// 취소됨
    Canceled,
    /// 거래소가 접수를 거부함 (감사 목적으로 보존)
    Rejected,
}

impl OrderStatus {
    /// 종결 상태 여부.
    pub fn is_terminal(self) -> bool {
        !matches!(self, OrderStatus::Open)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Open => write!(f, "open"),
            OrderStatus::Closed => write!(f, "closed"),
            OrderStatus::Canceled => write!(f, "canceled"),
            OrderStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" | "new" | "pending_new" | "partially_filled" | "pending_cancel" => {
                Ok(OrderStatus::Open)
            }
            "closed" | "filled" => Ok(OrderStatus::Closed),
            "canceled" | "cancelled" | "expired" | "expired_in_match" => Ok(OrderStatus::Canceled),
            "rejected" => Ok(OrderStatus::Rejected),
            _ => Err(format!("Invalid order status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_type_tokens() {
        assert_eq!(OrderType::StopLoss.to_string(), "stop_loss");
        assert_eq!("LIMIT".parse::<OrderType>().unwrap(), OrderType::Limit);
        assert!("stop_limit".parse::<OrderType>().is_err());
    }

    #[test]
    fn test_exchange_status_aliases() {
        assert_eq!("FILLED".parse::<OrderStatus>().unwrap(), OrderStatus::Closed);
        assert_eq!("NEW".parse::<OrderStatus>().unwrap(), OrderStatus::Open);
        assert_eq!("EXPIRED".parse::<OrderStatus>().unwrap(), OrderStatus::Canceled);
        assert_eq!("PENDING_CANCEL".parse::<OrderStatus>().unwrap(), OrderStatus::Open);
        assert_eq!(
            "EXPIRED_IN_MATCH".parse::<OrderStatus>().unwrap(),
            OrderStatus::Canceled
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OrderStatus::Open.is_terminal());
        assert!(OrderStatus::Closed.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
    }
}
