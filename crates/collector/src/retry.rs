//! 재시도 정책 -- 선형 백오프 기반의 유한 재시도
//!
//! [`RetryPolicy`]는 수집 루프에 주입되는 순수 값 객체입니다.
//! 지연 계산만 담당하고 실제 대기는 호출자가 수행하므로,
//! 타이머 없이도 정책을 단위 테스트할 수 있습니다.

use std::time::Duration;

/// 유한 재시도 정책
///
/// 시도 번호는 1부터 시작하며, `attempt`번째 실패 후 대기 시간은
/// `base_delay * attempt`입니다 (선형 백오프).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 최대 시도 횟수 (1 이상)
    max_attempts: u32,
    /// 기본 지연
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// 새 재시도 정책을 생성합니다. `max_attempts`는 최소 1로 보정됩니다.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// 최대 시도 횟수를 반환합니다.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 시도 번호 목록을 반환합니다 (1..=max_attempts).
    pub fn attempts(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.max_attempts
    }

    /// `attempt`번째 실패 후 다음 시도까지의 대기 시간을 반환합니다.
    ///
    /// 마지막 시도 이후에는 호출할 필요가 없지만, 호출해도 안전합니다.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.max(1))
    }

    /// `attempt`번째 시도가 마지막인지 확인합니다.
    pub fn is_last_attempt(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }
}
