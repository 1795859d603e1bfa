// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use rand::Rng;

/// 路径最少步数
pub const MIN_STEPS: usize = 8;
/// 路径最多步数
pub const MAX_STEPS: usize = 60;

/// 生成拟人的指针移动路径
///
/// 以随机偏移的控制点做二次贝塞尔曲线，缓入缓出，中间点带轻微抖动。
/// 返回的点不包含起点，最后一个点恰好是终点。
pub fn path<R: Rng>(from: (f64, f64), to: (f64, f64), rng: &mut R) -> Vec<(f64, f64)> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let distance = (dx * dx + dy * dy).sqrt();
    if distance < 1.0 {
        return vec![to];
    }

    let steps = ((distance / 12.0).round() as usize).clamp(MIN_STEPS, MAX_STEPS);

    // control point pushed off the straight line along its normal
    let offset = rng.random_range(-1.0..=1.0) * distance * 0.3;
    let (nx, ny) = (-dy / distance, dx / distance);
    let control = (
        (from.0 + to.0) / 2.0 + nx * offset,
        (from.1 + to.1) / 2.0 + ny * offset,
    );

    (1..=steps)
        .map(|i| {
            if i == steps {
                return to;
            }
            let t = i as f64 / steps as f64;
            let t = t * t * (3.0 - 2.0 * t);
            let u = 1.0 - t;
            let x = u * u * from.0 + 2.0 * u * t * control.0 + t * t * to.0;
            let y = u * u * from.1 + 2.0 * u * t * control.1 + t * t * to.1;
            (
                x + rng.random_range(-0.5..0.5),
                y + rng.random_range(-0.5..0.5),
            )
        })
        .collect()
}
