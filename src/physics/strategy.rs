//! X / Y / Angle 策略表
//!
//! 构建时为每个输入、输出按类型选定函数指针，每步直接调用，热循环中不再分支。

use glam::Vec2;

use super::config::TRANSLATION_SCALE;
use super::integrator::StrandDrive;
use super::math::direction_to_radian;
use super::normalize::{normalize_parameter_value, ValueRange};
use super::rig::{Normalization, PhysicsKind, PhysicsParticle};

/// 输入累加：把归一化后的参数贡献累加进组的驱动平移/角度
pub type AccumulateFn = fn(
    drive: &mut StrandDrive,
    value: f32,
    parameter: &ValueRange,
    normalization: &Normalization,
    reflect: bool,
    weight: f32,
);

/// 输出取值：由粒子相对前一粒子的位移得到原始输出值
pub type ExtractFn = fn(
    translation: Vec2,
    strand: &[PhysicsParticle],
    particle_index: usize,
    reflect: bool,
    gravity: Vec2,
) -> f32;

/// 输出缩放：由配置的 scale 得到实际乘数
pub type ScaleFn = fn(scale: f32) -> f32;

/// 输出策略
#[derive(Clone, Copy, Debug)]
pub struct OutputStrategy {
    pub value: ExtractFn,
    pub scale: ScaleFn,
}

/// 按类型选择输入策略
pub fn input_strategy(kind: PhysicsKind) -> AccumulateFn {
    match kind {
        PhysicsKind::TranslationX => accumulate_translation_x,
        PhysicsKind::TranslationY => accumulate_translation_y,
        PhysicsKind::Angle => accumulate_angle,
    }
}

/// 按类型选择输出策略
pub fn output_strategy(kind: PhysicsKind) -> OutputStrategy {
    match kind {
        PhysicsKind::TranslationX => OutputStrategy {
            value: extract_translation_x,
            scale: scale_translation_x,
        },
        PhysicsKind::TranslationY => OutputStrategy {
            value: extract_translation_y,
            scale: scale_translation_y,
        },
        PhysicsKind::Angle => OutputStrategy {
            value: extract_angle,
            scale: scale_angle,
        },
    }
}

// ========== 输入 ==========

fn accumulate_translation_x(
    drive: &mut StrandDrive,
    value: f32,
    parameter: &ValueRange,
    normalization: &Normalization,
    reflect: bool,
    weight: f32,
) {
    drive.translation.x +=
        normalize_parameter_value(value, parameter, &normalization.position, reflect) * weight;
}

fn accumulate_translation_y(
    drive: &mut StrandDrive,
    value: f32,
    parameter: &ValueRange,
    normalization: &Normalization,
    reflect: bool,
    weight: f32,
) {
    drive.translation.y +=
        normalize_parameter_value(value, parameter, &normalization.position, reflect) * weight;
}

fn accumulate_angle(
    drive: &mut StrandDrive,
    value: f32,
    parameter: &ValueRange,
    normalization: &Normalization,
    reflect: bool,
    weight: f32,
) {
    drive.angle += normalize_parameter_value(value, parameter, &normalization.angle, reflect) * weight;
}

// ========== 输出 ==========

fn extract_translation_x(
    translation: Vec2,
    _strand: &[PhysicsParticle],
    _particle_index: usize,
    reflect: bool,
    _gravity: Vec2,
) -> f32 {
    if reflect {
        -translation.x
    } else {
        translation.x
    }
}

fn extract_translation_y(
    translation: Vec2,
    _strand: &[PhysicsParticle],
    _particle_index: usize,
    reflect: bool,
    _gravity: Vec2,
) -> f32 {
    if reflect {
        -translation.y
    } else {
        translation.y
    }
}

/// 相对参考方向的有符号角度（度）
///
/// 参考方向：第 2 个及以后的粒子取上一链段方向，否则取重力的反方向。
fn extract_angle(
    translation: Vec2,
    strand: &[PhysicsParticle],
    particle_index: usize,
    reflect: bool,
    gravity: Vec2,
) -> f32 {
    let parent = if particle_index >= 2 {
        strand[particle_index - 1].position - strand[particle_index - 2].position
    } else {
        -gravity
    };
    let degrees = direction_to_radian(parent, translation).to_degrees();
    if reflect {
        -degrees
    } else {
        degrees
    }
}

fn scale_translation_x(scale: f32) -> f32 {
    TRANSLATION_SCALE.x * scale
}

fn scale_translation_y(scale: f32) -> f32 {
    TRANSLATION_SCALE.y * scale
}

fn scale_angle(scale: f32) -> f32 {
    scale
}
