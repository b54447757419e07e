//! 摆链用的方向/角度工具

use std::f32::consts::PI;

use glam::Vec2;

use super::config::DEFAULT_GRAVITY;

/// 角度（弧度）→ 方向向量 (sin, cos)
///
/// 0 弧度对应 +Y，即链条局部坐标系中的"下"。
#[inline]
pub fn radian_to_direction(radian: f32) -> Vec2 {
    Vec2::new(radian.sin(), radian.cos())
}

/// 从 `from` 转到 `to` 的有符号夹角（弧度），范围 [-PI, PI]
pub fn direction_to_radian(from: Vec2, to: Vec2) -> f32 {
    let q1 = to.y.atan2(to.x);
    let q2 = from.y.atan2(from.x);
    let mut radian = q1 - q2;
    while radian < -PI {
        radian += 2.0 * PI;
    }
    while radian > PI {
        radian -= 2.0 * PI;
    }
    radian
}

/// 按顺序旋转：先更新 x，再用新 x 计算 y
///
/// 与严格的旋转矩阵不同，这里保留了历史实现的运算顺序，
/// 驱动平移和链段旋转都依赖该顺序，改动会改变模拟结果。
#[inline]
pub fn rotate_sequential(v: Vec2, radian: f32) -> Vec2 {
    let (sin, cos) = radian.sin_cos();
    let x = v.x * cos - v.y * sin;
    let y = x * sin + v.y * cos;
    Vec2::new(x, y)
}

/// 重力归一化为单位向量，零向量或非有限值退回竖直向下
pub fn normalize_gravity(gravity: Vec2) -> Vec2 {
    gravity.try_normalize().unwrap_or(DEFAULT_GRAVITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_zero_radian_points_down_the_chain() {
        let dir = radian_to_direction(0.0);
        assert_abs_diff_eq!(dir.x, 0.0);
        assert_abs_diff_eq!(dir.y, 1.0);
    }

    #[test]
    fn test_direction_to_radian_signed() {
        let quarter = direction_to_radian(Vec2::X, Vec2::Y);
        assert_abs_diff_eq!(quarter, PI / 2.0, epsilon = 1e-6);

        let back = direction_to_radian(Vec2::Y, Vec2::X);
        assert_abs_diff_eq!(back, -PI / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_direction_to_radian_wraps() {
        // 170° → -170°：atan2 差值为 -340°，应回绕到 +20°
        let from = Vec2::from_angle(170f32.to_radians());
        let to = Vec2::from_angle(-170f32.to_radians());
        let radian = direction_to_radian(from, to);
        assert_abs_diff_eq!(radian, 20f32.to_radians(), epsilon = 1e-5);

        let same = direction_to_radian(Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0));
        assert_abs_diff_eq!(same, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_gravity() {
        assert_eq!(normalize_gravity(Vec2::new(0.0, -9.8)), Vec2::new(0.0, -1.0));
        assert_eq!(normalize_gravity(Vec2::ZERO), DEFAULT_GRAVITY);
        assert_eq!(normalize_gravity(Vec2::new(f32::NAN, 1.0)), DEFAULT_GRAVITY);
    }

    #[test]
    fn test_rotate_sequential_uses_updated_x() {
        let v = Vec2::new(1.0, 0.0);
        let r = PI / 2.0;
        let rotated = rotate_sequential(v, r);
        // x' = cos = 0, y' = x' * sin + 0 = 0（严格旋转应为 1）
        assert_abs_diff_eq!(rotated.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(rotated.y, 0.0, epsilon = 1e-6);

        let identity = rotate_sequential(Vec2::new(0.3, -0.7), 0.0);
        assert_abs_diff_eq!(identity.x, 0.3);
        assert_abs_diff_eq!(identity.y, -0.7);
    }
}
