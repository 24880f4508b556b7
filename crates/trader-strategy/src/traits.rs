//! Strategy trait 정의.

use serde_json::Value;
use trader_core::{ExitAdjustment, Kline, Order};

use crate::StrategyError;

/// 트레이딩 전략 trait.
///
/// 봇은 폴링 주기마다 심볼별로 최신 캔들을 `set_up`에 넘긴 뒤
/// 신호 메서드를 호출합니다. 신호 메서드는 `set_up`에서 받은
/// 캔들만 참조합니다.
pub trait Strategy: Send + Sync {
    /// 전략 이름 반환.
    fn name(&self) -> &str;

    /// 최신 캔들(시간 오름차순)로 지표 계산.
    fn set_up(&mut self, klines: &[Kline]) -> Result<(), StrategyError>;

    /// 진입 신호.
    fn check_long_signal(&self) -> bool;

    /// 청산 신호. `position`은 보유 중인 포지션의 진입 주문입니다.
    fn check_short_signal(&self, position: Option<&Order>) -> bool;

    /// 보유 포지션의 익절/손절 임계값 수정 제안.
    ///
    /// 반환값은 제안일 뿐이며, 엔진이 래칫 규칙에 따라
    /// 불리한 방향의 수정은 버립니다.
    fn update_exit_thresholds(&mut self, _position: &Order) -> Option<ExitAdjustment> {
        None
    }

    /// 현재 전략 상태를 JSON으로 반환 (디버깅/모니터링용).
    fn get_state(&self) -> Value {
        Value::Null
    }
}
