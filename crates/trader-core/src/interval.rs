//! 캔들(Kline) 간격 변환.
//!
//! "15m", "4h", "1M" 같은 간격 토큰을 밀리초 단위 기간으로 변환합니다.
//! 단위 문자는 대소문자를 구분합니다 (`m` = 분, `M` = 월).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;
const WEEK_MS: i64 = 7 * DAY_MS;
/// 거래소 캔들 기준 한 달은 31일로 근사합니다.
const MONTH_MS: i64 = 31 * DAY_MS;

/// 캔들 간격 파싱 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("유효하지 않은 캔들 간격 '{interval}': {reason}")]
pub struct IntervalError {
    /// 입력된 간격 문자열
    pub interval: String,
    /// 실패 사유
    pub reason: String,
}

impl IntervalError {
    fn new(interval: &str, reason: impl Into<String>) -> Self {
        Self {
            interval: interval.to_string(),
            reason: reason.into(),
        }
    }
}

/// 캔들 간격 단위.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntervalUnit {
    /// 분 (`m`)
    Minute,
    /// 시간 (`h`)
    Hour,
    /// 일 (`d`)
    Day,
    /// 주 (`w`)
    Week,
    /// 월 (`M`)
    Month,
}

impl IntervalUnit {
    /// 단위 문자에서 변환.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'm' => Some(Self::Minute),
            'h' => Some(Self::Hour),
            'd' => Some(Self::Day),
            'w' => Some(Self::Week),
            'M' => Some(Self::Month),
            _ => None,
        }
    }

    /// 단위 문자 반환.
    pub fn as_char(self) -> char {
        match self {
            Self::Minute => 'm',
            Self::Hour => 'h',
            Self::Day => 'd',
            Self::Week => 'w',
            Self::Month => 'M',
        }
    }

    /// 단위 1개당 밀리초.
    pub fn millis(self) -> i64 {
        match self {
            Self::Minute => MINUTE_MS,
            Self::Hour => HOUR_MS,
            Self::Day => DAY_MS,
            Self::Week => WEEK_MS,
            Self::Month => MONTH_MS,
        }
    }
}

/// 파싱된 캔들 간격 (크기 + 단위).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KlineInterval {
    magnitude: u32,
    unit: IntervalUnit,
}

impl KlineInterval {
    /// 크기와 단위로 생성.
    pub fn new(magnitude: u32, unit: IntervalUnit) -> Self {
        Self { magnitude, unit }
    }

    pub fn magnitude(&self) -> u32 {
        self.magnitude
    }

    pub fn unit(&self) -> IntervalUnit {
        self.unit
    }

    /// 간격 길이 (밀리초). `i64` 범위를 넘으면 `i64::MAX`로 고정됩니다.
    pub fn as_millis(&self) -> i64 {
        i64::from(self.magnitude).saturating_mul(self.unit.millis())
    }
}

impl FromStr for KlineInterval {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let unit_char = chars
            .next_back()
            .ok_or_else(|| IntervalError::new(s, "빈 문자열"))?;
        let unit = IntervalUnit::from_char(unit_char)
            .ok_or_else(|| IntervalError::new(s, format!("알 수 없는 단위 '{}'", unit_char)))?;

        let number = chars.as_str();
        // u32::from_str는 앞의 '+'를 허용하므로 숫자만 받습니다
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IntervalError::new(s, format!("정수가 아닌 크기 '{}'", number)));
        }
        let magnitude: u32 = number
            .parse()
            .map_err(|_| IntervalError::new(s, format!("범위를 벗어난 크기 '{}'", number)))?;
        if magnitude == 0 {
            return Err(IntervalError::new(s, "크기는 0보다 커야 합니다"));
        }
        if i64::from(magnitude).checked_mul(unit.millis()).is_none() {
            return Err(IntervalError::new(s, "밀리초 범위를 넘는 간격"));
        }

        Ok(Self { magnitude, unit })
    }
}

impl fmt::Display for KlineInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit.as_char())
    }
}

/// 간격 토큰을 밀리초로 변환.
///
/// # Errors
///
/// 단위가 `m`, `h`, `d`, `w`, `M` 중 하나가 아니거나
/// 크기가 양의 정수가 아니면 `IntervalError`를 반환합니다.
pub fn kline_interval_to_ms(interval: &str) -> Result<i64, IntervalError> {
    interval.parse::<KlineInterval>().map(|i| i.as_millis())
}
