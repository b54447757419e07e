//! 摆链物理配置
//!
//! 所有参数扁平化，直接在代码中修改默认值即可。
//! 每个 `PuppetPhysics` 在创建时拍下一份快照，运行中修改全局配置不会影响已有实例。

use glam::Vec2;
use once_cell::sync::Lazy;
use std::sync::RwLock;

// ========== 常量 ==========

/// 空气阻力：重力方向变化时链段的滞后旋转系数（角度差 / 阻力）
pub const AIR_RESISTANCE: f32 = 5.0;

/// 输入/输出权重的满值（定义文件中的权重为 0~100）
pub const MAXIMUM_WEIGHT: f32 = 100.0;

/// 微动阈值（乘以组的位置归一化最大值）
pub const MOVEMENT_THRESHOLD: f32 = 0.001;

/// 最大追帧时间（秒），累计时间超过此值直接清零
pub const MAX_DELTA_TIME: f32 = 5.0;

/// 延迟归一化帧率：delay = 粒子延迟 * 步长 * 30
pub const DELAY_FRAME_RATE: f32 = 30.0;

/// 平移输出的各轴单位缩放
pub const TRANSLATION_SCALE: Vec2 = Vec2::ONE;

/// 默认重力（竖直向下）
pub const DEFAULT_GRAVITY: Vec2 = Vec2::new(0.0, -1.0);

/// 默认风力
pub const DEFAULT_WIND: Vec2 = Vec2::ZERO;

/// 物理配置（扁平化，不嵌套）
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsConfig {
    /// 空气阻力，默认 5.0
    /// 越大 → 重力方向变化时链条跟随越慢，摆动越明显
    pub air_resistance: f32,

    /// 微动阈值，默认 0.001
    /// |x| 小于 阈值 * 位置归一化最大值 时吸附到 0，消除静止附近的抖动
    pub movement_threshold: f32,

    /// 最大追帧时间（秒），默认 5.0
    /// 卡顿（如调试器暂停）后不追帧，直接丢弃累计时间
    pub max_delta_time: f32,

    /// 是否输出调试日志，默认 false
    pub debug_log: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            air_resistance: AIR_RESISTANCE,
            movement_threshold: MOVEMENT_THRESHOLD,
            max_delta_time: MAX_DELTA_TIME,
            debug_log: false,
        }
    }
}

/// 全局配置实例
static PHYSICS_CONFIG: Lazy<RwLock<PhysicsConfig>> =
    Lazy::new(|| RwLock::new(PhysicsConfig::default()));

/// 获取当前配置（只读）
pub fn get_config() -> PhysicsConfig {
    PHYSICS_CONFIG.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// 手动设置配置（用于运行时调试）
pub fn set_config(config: PhysicsConfig) {
    *PHYSICS_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = config;
}

/// 重置为默认配置
pub fn reset_config() {
    *PHYSICS_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = PhysicsConfig::default();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_constants() {
        let config = PhysicsConfig::default();
        assert_eq!(config.air_resistance, AIR_RESISTANCE);
        assert_eq!(config.movement_threshold, MOVEMENT_THRESHOLD);
        assert_eq!(config.max_delta_time, MAX_DELTA_TIME);
        assert!(!config.debug_log);
    }
}
