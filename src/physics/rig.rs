//! 物理骨架数据模型
//!
//! 所有组的输入、输出、粒子都平铺在三个 Vec 中，
//! 每个组只记录自己在其中的 (起始索引, 数量)。
//! 各组的子区间按组顺序首尾相接、互不重叠。

use std::ops::Range;

use glam::Vec2;

use crate::model::{ParameterHandle, ParameterId};
use crate::{PhysicsError, Result};

use super::config::MAXIMUM_WEIGHT;
use super::normalize::ValueRange;
use super::strategy::{AccumulateFn, OutputStrategy};

/// 链条局部坐标系中的"下"，也是静止时链段的方向
pub const REST_DIRECTION: Vec2 = Vec2::Y;

// ============================================================================
// 类型标签
// ============================================================================

/// 输入/输出类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhysicsKind {
    /// X 方向平移
    TranslationX,
    /// Y 方向平移
    TranslationY,
    /// 角度
    Angle,
}

impl PhysicsKind {
    /// 从定义文件中的标签解析（"X" / "Y" / "Angle"），未知标签直接报错
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "X" => Ok(Self::TranslationX),
            "Y" => Ok(Self::TranslationY),
            "Angle" => Ok(Self::Angle),
            _ => Err(PhysicsError::UnknownKind { tag: tag.to_string() }),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::TranslationX => "X",
            Self::TranslationY => "Y",
            Self::Angle => "Angle",
        }
    }
}

/// 组的归一化范围
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Normalization {
    /// 平移的工作范围
    pub position: ValueRange,
    /// 角度的工作范围（度）
    pub angle: ValueRange,
}

// ============================================================================
// 粒子
// ============================================================================

/// 链条中的一个质点
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsParticle {
    // --- 静态数据 ---
    /// 速度保留系数 (0~1)
    pub mobility: f32,
    /// 响应延迟
    pub delay: f32,
    /// 外力项的加速度系数
    pub acceleration: f32,
    /// 与前一个粒子的固定距离
    pub radius: f32,
    /// 静止位置（构建时按链条计算）
    pub initial_position: Vec2,

    // --- 动态数据 ---
    pub position: Vec2,
    pub last_position: Vec2,
    pub last_gravity: Vec2,
    pub velocity: Vec2,
    pub force: Vec2,
}

impl PhysicsParticle {
    pub fn new(mobility: f32, delay: f32, acceleration: f32, radius: f32) -> Self {
        Self {
            mobility,
            delay,
            acceleration,
            radius,
            initial_position: Vec2::ZERO,
            position: Vec2::ZERO,
            last_position: Vec2::ZERO,
            last_gravity: REST_DIRECTION,
            velocity: Vec2::ZERO,
            force: Vec2::ZERO,
        }
    }

    /// 回到静止位置并清空动态状态
    fn rest_at(&mut self, initial_position: Vec2) {
        self.initial_position = initial_position;
        self.position = initial_position;
        self.last_position = initial_position;
        self.last_gravity = REST_DIRECTION;
        self.velocity = Vec2::ZERO;
        self.force = Vec2::ZERO;
    }
}

// ============================================================================
// 输入 / 输出
// ============================================================================

/// 驱动输入：读取一个模型参数
#[derive(Clone, Debug)]
pub struct PhysicsInput {
    pub source: ParameterId,
    pub(crate) source_handle: Option<ParameterHandle>,
    pub kind: PhysicsKind,
    /// 权重 (0~100)
    pub weight: f32,
    pub reflect: bool,
    pub(crate) accumulate: AccumulateFn,
}

impl PhysicsInput {
    pub fn source_handle(&self) -> Option<ParameterHandle> {
        self.source_handle
    }

    /// 0~1 的权重系数
    #[inline]
    pub fn weight_factor(&self) -> f32 {
        self.weight / MAXIMUM_WEIGHT
    }
}

/// 输出：把粒子相对前一粒子的位移写回一个模型参数
#[derive(Clone, Debug)]
pub struct PhysicsOutput {
    pub destination: ParameterId,
    pub(crate) destination_handle: Option<ParameterHandle>,
    pub kind: PhysicsKind,
    /// 组内粒子索引（≥1）
    pub particle_index: usize,
    pub scale: f32,
    /// 权重 (0~100)
    pub weight: f32,
    pub reflect: bool,
    /// 低于参数最小值时出现过的最小缩放值（仅诊断用）
    pub value_below_minimum: f32,
    /// 高于参数最大值时出现过的最大缩放值（仅诊断用）
    pub value_exceeded_maximum: f32,
    pub(crate) strategy: OutputStrategy,
}

impl PhysicsOutput {
    pub fn destination_handle(&self) -> Option<ParameterHandle> {
        self.destination_handle
    }

    /// 0~1 的权重系数
    #[inline]
    pub fn weight_factor(&self) -> f32 {
        self.weight / MAXIMUM_WEIGHT
    }

    /// 粒子索引在组内是否有效（需要有前一个粒子）
    #[inline]
    pub fn is_index_valid(&self, particle_count: usize) -> bool {
        self.particle_index >= 1 && self.particle_index < particle_count
    }

    /// 原始输出值 → 参数值
    ///
    /// 乘以缩放、限制到参数范围（越界值记入诊断字段），再按权重与当前值混合。
    pub fn update_parameter_value(&mut self, raw: f32, range: &ValueRange, current: f32) -> f32 {
        let mut value = raw * (self.strategy.scale)(self.scale);
        let lower = range.minimum.min(range.maximum);
        let upper = range.minimum.max(range.maximum);

        if value < lower {
            if value < self.value_below_minimum {
                self.value_below_minimum = value;
            }
            value = lower;
        } else if value > upper {
            if value > self.value_exceeded_maximum {
                self.value_exceeded_maximum = value;
            }
            value = upper;
        }

        let weight = self.weight_factor();
        if weight >= 1.0 {
            value
        } else {
            current * (1.0 - weight) + value * weight
        }
    }

    pub(crate) fn reset_telemetry(&mut self) {
        self.value_below_minimum = 0.0;
        self.value_exceeded_maximum = 0.0;
    }
}

// ============================================================================
// 组 / 骨架
// ============================================================================

/// 物理组：一条独立模拟的粒子链及其输入输出
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PhysicsGroup {
    /// 定义中的 Id
    pub id: String,
    /// 字典中的显示名
    pub name: Option<String>,
    pub normalization: Normalization,

    pub base_input_index: usize,
    pub input_count: usize,
    pub base_output_index: usize,
    pub output_count: usize,
    pub base_particle_index: usize,
    pub particle_count: usize,
}

impl PhysicsGroup {
    #[inline]
    pub fn input_range(&self) -> Range<usize> {
        self.base_input_index..self.base_input_index + self.input_count
    }

    #[inline]
    pub fn output_range(&self) -> Range<usize> {
        self.base_output_index..self.base_output_index + self.output_count
    }

    #[inline]
    pub fn particle_range(&self) -> Range<usize> {
        self.base_particle_index..self.base_particle_index + self.particle_count
    }

    /// 日志用的名字
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// 一个模型的完整物理骨架
#[derive(Clone, Debug)]
pub struct PhysicsRig {
    pub(crate) groups: Vec<PhysicsGroup>,
    pub(crate) inputs: Vec<PhysicsInput>,
    pub(crate) outputs: Vec<PhysicsOutput>,
    pub(crate) particles: Vec<PhysicsParticle>,
    pub(crate) gravity: Vec2,
    pub(crate) wind: Vec2,
    pub(crate) fps: Option<f32>,
}

impl PhysicsRig {
    pub fn groups(&self) -> &[PhysicsGroup] {
        &self.groups
    }

    pub fn inputs(&self) -> &[PhysicsInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[PhysicsOutput] {
        &self.outputs
    }

    pub fn particles(&self) -> &[PhysicsParticle] {
        &self.particles
    }

    /// 某组的粒子链
    pub fn group_particles(&self, group: &PhysicsGroup) -> &[PhysicsParticle] {
        &self.particles[group.particle_range()]
    }

    /// 定义中的重力
    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    /// 定义中的风力
    pub fn wind(&self) -> Vec2 {
        self.wind
    }

    /// 固定模拟频率，未设置或非正值时为 None
    pub fn tick_rate(&self) -> Option<f32> {
        self.fps.filter(|fps| *fps > 0.0)
    }

    /// 初始化所有链条
    ///
    /// 粒子 0 静止在原点，粒子 i 静止在粒子 i-1 下方 radius_i 处；
    /// 速度、力清零，上次重力方向恢复为竖直向下。
    pub fn initialize(&mut self) {
        for group in &self.groups {
            let strand = &mut self.particles[group.particle_range()];
            let mut rest = Vec2::ZERO;
            for (i, particle) in strand.iter_mut().enumerate() {
                if i > 0 {
                    rest += Vec2::new(0.0, particle.radius);
                }
                particle.rest_at(rest);
            }
        }
    }

    /// 检查平铺区间是否首尾相接
    pub(crate) fn ranges_are_contiguous(&self) -> bool {
        let mut next = (0, 0, 0);
        for group in &self.groups {
            if (group.base_input_index, group.base_output_index, group.base_particle_index) != next {
                return false;
            }
            next = (
                group.input_range().end,
                group.output_range().end,
                group.particle_range().end,
            );
        }
        next == (self.inputs.len(), self.outputs.len(), self.particles.len())
    }
}
