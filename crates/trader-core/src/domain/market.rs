//! 시세 데이터 타입.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OHLCV 캔들.
///
/// `open_time`은 캔들 시작 시각 (Unix epoch 밀리초)입니다.
/// 거래소 어댑터는 캔들을 시간 오름차순으로 반환합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kline {
    /// 캔들 시작 시각 (ms)
    pub open_time: i64,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    pub volume: Decimal,
}

impl Kline {
    /// 새 캔들 생성.
    pub fn new(
        open_time: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// 시가와 종가의 산술 평균.
    pub fn mid_open_close(&self) -> Decimal {
        (self.open + self.close) / Decimal::TWO
    }
}
