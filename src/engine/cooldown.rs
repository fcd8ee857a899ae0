//! 冷却调度
//!
//! 步间延迟取 [min_ms, max_ms] 闭区间内的随机值（抖动，避免对 AI 端点的同步重试风暴），
//! 等待以每秒一跳对外可见：每跳发布剩余整秒数 ceil(remaining_ms/1000)，
//! 跳前检查取消信号；睡眠与取消令牌竞速，取消后不再产生任何跳。

use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

/// 闭区间抖动时长；max < min 时按 min 处理
pub fn jitter_ms(min_ms: u64, max_ms: u64) -> u64 {
    let max_ms = max_ms.max(min_ms);
    rand::rng().random_range(min_ms..=max_ms)
}

/// 执行一次倒计时；完整走完返回 true，被取消返回 false
pub async fn countdown(
    total_ms: u64,
    cancel_token: &CancellationToken,
    mut on_tick: impl FnMut(u64),
) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(total_ms);

    loop {
        if cancel_token.is_cancelled() {
            return false;
        }
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return true;
        }
        let remaining_ms = (deadline - now).as_millis() as u64;
        on_tick(remaining_ms.div_ceil(1000));

        let sleep_for = Duration::from_millis(remaining_ms.min(1000));
        tokio::select! {
            _ = cancel_token.cancelled() => return false,
            _ = tokio::time::sleep(sleep_for) => {}
        }
    }
}
