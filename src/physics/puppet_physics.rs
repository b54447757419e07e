//! 摆链物理引擎
//!
//! 固定步长累加器 + 时间插值：每帧累加渲染帧时间，按固定步长推进零到多次，
//! 最后用剩余时间比例混合最近两步的输出，写回模型参数。
//! 流程：每帧 advance [绑定参数 → (待稳态则先稳态) → 多次 (采样输入 → 积分 → 提取输出) → 插值写回]
//!
//! 单个实例不可并发或重入调用；多个模型各自持有独立实例。

use std::collections::HashMap;

use glam::Vec2;

use crate::model::{ParameterHandle, ParameterId, ParameterModel};
use crate::{PhysicsError, Result};

use super::config::{get_config, PhysicsConfig};
use super::integrator::{update_particles, update_particles_for_stabilization, StrandDrive};
use super::math::normalize_gravity;
use super::normalize::ValueRange;
use super::rig::PhysicsRig;

/// 外力选项
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsOptions {
    /// 重力方向（单位向量）
    pub gravity: Vec2,
    pub wind: Vec2,
}

/// 一个参数的缓存（按标识符索引）
#[derive(Clone, Copy, Debug)]
struct ParameterCache {
    handle: ParameterHandle,
    /// 输入快照：每步向模型实时值插值
    input: f32,
    /// 本步参与计算的值，输出会写入这里
    value: f32,
}

#[derive(Clone, Copy, Debug)]
enum StepMode {
    /// 固定步长积分（步长秒）
    Tick(f32),
    /// 稳态求解
    Stabilize,
}

/// 摆链物理引擎
///
/// 首次 `advance` / `stabilize` 时把参数标识符解析为模型句柄并缓存，
/// 之后始终通过这些句柄读写。一个实例只服务于一个模型；
/// 换用另一个模型前必须先调用 `unbind()`，否则会沿用旧模型的句柄。
#[derive(Clone, Debug)]
pub struct PuppetPhysics {
    rig: PhysicsRig,
    options: PhysicsOptions,
    config: PhysicsConfig,

    /// 最近一步的原始输出（与 rig.outputs 一一对应）
    current_outputs: Vec<f32>,
    /// 上一步的原始输出
    previous_outputs: Vec<f32>,

    parameters: HashMap<ParameterId, ParameterCache>,
    bound: bool,
    pending_stabilization: bool,

    /// 尚未消耗的累计时间（秒）
    remaining_time: f32,
}

impl PuppetPhysics {
    /// 创建物理引擎（拍下当前全局配置）
    ///
    /// 新实例处于待稳态状态，首次 `advance` 会先求稳态，链条不会"掉落到位"。
    pub fn new(rig: PhysicsRig) -> Self {
        let config = get_config();
        let output_count = rig.outputs.len();
        let options = PhysicsOptions {
            gravity: rig.gravity,
            wind: rig.wind,
        };

        if config.debug_log {
            log::debug!(
                "[Physics] 物理引擎创建: {} 组, FPS={:?}, 空气阻力={}",
                rig.groups.len(),
                rig.tick_rate(),
                config.air_resistance
            );
        }

        Self {
            rig,
            options,
            config,
            current_outputs: vec![0.0; output_count],
            previous_outputs: vec![0.0; output_count],
            parameters: HashMap::new(),
            bound: false,
            pending_stabilization: true,
            remaining_time: 0.0,
        }
    }

    pub fn rig(&self) -> &PhysicsRig {
        &self.rig
    }

    pub fn options(&self) -> PhysicsOptions {
        self.options
    }

    /// 替换外力选项（重力归一化）
    pub fn set_options(&mut self, options: PhysicsOptions) {
        self.set_external_forces(options.gravity, options.wind);
    }

    /// 设置外力
    pub fn set_external_forces(&mut self, gravity: Vec2, wind: Vec2) {
        self.options = PhysicsOptions {
            gravity: normalize_gravity(gravity),
            wind,
        };
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// 替换本实例的配置快照
    pub fn set_config_snapshot(&mut self, config: PhysicsConfig) {
        self.config = config;
    }

    pub fn remaining_time(&self) -> f32 {
        self.remaining_time
    }

    /// 最近一步的原始输出值（与 `rig().outputs()` 对应）
    pub fn current_outputs(&self) -> &[f32] {
        &self.current_outputs
    }

    pub fn previous_outputs(&self) -> &[f32] {
        &self.previous_outputs
    }

    pub fn is_stabilization_pending(&self) -> bool {
        self.pending_stabilization
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// 丢弃已解析的参数句柄和参数缓存，下次 `advance` / `stabilize` 重新绑定
    ///
    /// 重新绑定后会先求稳态，链条状态以新模型的参数为准。
    pub fn unbind(&mut self) {
        for input in &mut self.rig.inputs {
            input.source_handle = None;
        }
        for output in &mut self.rig.outputs {
            output.destination_handle = None;
        }
        self.parameters.clear();
        self.bound = false;
        self.pending_stabilization = true;
    }

    /// 清空输出的越界诊断值
    pub fn reset_output_telemetry(&mut self) {
        for output in &mut self.rig.outputs {
            output.reset_telemetry();
        }
    }

    /// 重置：粒子回到静止位置、动态状态清零、累计时间清零
    ///
    /// 稳态求解需要模型参数，推迟到下一次 `advance`（或显式 `stabilize`）执行。
    pub fn reset(&mut self) {
        self.rig.initialize();
        self.remaining_time = 0.0;
        self.pending_stabilization = true;
        if self.config.debug_log {
            log::debug!("[Physics] 重置，等待稳态求解");
        }
    }

    /// 稳态求解：按模型当前参数把所有链条直接放到平衡位置，并写回输出参数
    pub fn stabilize<M: ParameterModel + ?Sized>(&mut self, model: &mut M) -> Result<()> {
        self.bind(model)?;

        for cache in self.parameters.values_mut() {
            let live = model.parameter_value(cache.handle);
            cache.input = live;
            cache.value = live;
        }

        self.evaluate(model, StepMode::Stabilize);
        self.previous_outputs.copy_from_slice(&self.current_outputs);

        for group in &self.rig.groups {
            for output in &self.rig.outputs[group.output_range()] {
                if !output.is_index_valid(group.particle_count) {
                    continue;
                }
                let (Some(handle), Some(cache)) = (
                    output.destination_handle,
                    self.parameters.get(&output.destination),
                ) else {
                    continue;
                };
                model.set_parameter_value(handle, cache.value);
            }
        }

        self.pending_stabilization = false;
        Ok(())
    }

    /// 推进一帧，返回本帧执行的固定步数
    ///
    /// 帧时间非正时什么都不做。累计时间超过最大追帧时间时直接清零。
    pub fn advance<M: ParameterModel + ?Sized>(
        &mut self,
        model: &mut M,
        delta_time: f32,
    ) -> Result<u32> {
        if delta_time <= 0.0 || delta_time.is_nan() {
            return Ok(0);
        }

        self.bind(model)?;
        if self.pending_stabilization {
            if self.config.debug_log {
                log::debug!("[Physics] 执行待处理的稳态求解");
            }
            self.stabilize(model)?;
        }

        self.remaining_time += delta_time;
        if self.remaining_time > self.config.max_delta_time {
            if self.config.debug_log {
                log::debug!(
                    "[Physics] 累计时间 {:.3}s 超过上限 {:.3}s，丢弃",
                    self.remaining_time,
                    self.config.max_delta_time
                );
            }
            self.remaining_time = 0.0;
        }

        let tick = match self.rig.tick_rate() {
            Some(fps) => 1.0 / fps,
            None => delta_time,
        };

        // 步数预先算出并受追帧上限约束，逐步相减的舍入误差不会让循环失控
        let ticks = tick_count(self.remaining_time, tick, self.config.max_delta_time);
        for _ in 0..ticks {
            self.previous_outputs.copy_from_slice(&self.current_outputs);

            // 输入快照向实时值靠拢 tick / remaining，而不是简单平均
            let input_weight = if self.remaining_time > tick {
                tick / self.remaining_time
            } else {
                1.0
            };
            for cache in self.parameters.values_mut() {
                let live = model.parameter_value(cache.handle);
                let sampled = cache.input * (1.0 - input_weight) + live * input_weight;
                cache.input = sampled;
                cache.value = sampled;
            }

            self.evaluate(model, StepMode::Tick(tick));
            self.remaining_time -= tick;
        }
        self.remaining_time = self.remaining_time.max(0.0);

        let alpha = (self.remaining_time / tick).min(1.0);
        self.interpolate(model, alpha);
        Ok(ticks)
    }

    /// 解析所有输入输出引用的参数句柄（只做一次）
    fn bind<M: ParameterModel + ?Sized>(&mut self, model: &M) -> Result<()> {
        if self.bound {
            return Ok(());
        }

        let references = self
            .rig
            .inputs
            .iter_mut()
            .map(|input| (&input.source, &mut input.source_handle))
            .chain(
                self.rig
                    .outputs
                    .iter_mut()
                    .map(|output| (&output.destination, &mut output.destination_handle)),
            );

        for (id, slot) in references {
            let handle = model
                .resolve_parameter(id)
                .ok_or_else(|| PhysicsError::UnknownParameter(id.clone()))?;
            *slot = Some(handle);
            self.parameters.entry(id.clone()).or_insert_with(|| {
                let value = model.parameter_value(handle);
                ParameterCache {
                    handle,
                    input: value,
                    value,
                }
            });
        }

        self.bound = true;
        log::debug!("[Physics] 参数绑定完成: {} 个参数", self.parameters.len());
        if self.config.debug_log {
            for input in &self.rig.inputs {
                log::debug!(
                    "[Physics] 输入 '{}' ({}) → {:?}",
                    input.source,
                    input.kind.tag(),
                    input.source_handle()
                );
            }
            for output in &self.rig.outputs {
                log::debug!(
                    "[Physics] 输出 '{}' ({}) 粒子 {} → {:?}",
                    output.destination,
                    output.kind.tag(),
                    output.particle_index,
                    output.destination_handle()
                );
            }
        }
        Ok(())
    }

    /// 对所有组执行一步（积分或稳态），输出写入参数缓存
    fn evaluate<M: ParameterModel + ?Sized>(&mut self, model: &M, mode: StepMode) {
        let Self {
            rig,
            options,
            config,
            current_outputs,
            parameters,
            ..
        } = self;
        let PhysicsRig {
            groups,
            inputs,
            outputs,
            particles,
            ..
        } = rig;

        for group in groups.iter() {
            let strand = &mut particles[group.particle_range()];
            if strand.is_empty() {
                continue;
            }

            let mut drive = StrandDrive::default();
            for input in &inputs[group.input_range()] {
                let Some(handle) = input.source_handle else {
                    continue;
                };
                let value = parameters
                    .get(&input.source)
                    .map_or_else(|| model.parameter_value(handle), |cache| cache.value);
                (input.accumulate)(
                    &mut drive,
                    value,
                    &parameter_range(model, handle),
                    &group.normalization,
                    input.reflect,
                    input.weight_factor(),
                );
            }
            let drive = drive.rotated();

            let threshold = config.movement_threshold * group.normalization.position.maximum;
            match mode {
                StepMode::Tick(delta_time) => update_particles(
                    strand,
                    drive,
                    options.wind,
                    threshold,
                    delta_time,
                    config.air_resistance,
                ),
                StepMode::Stabilize => {
                    update_particles_for_stabilization(strand, drive, options.wind, threshold)
                }
            }

            for (slot, output) in outputs[group.output_range()].iter_mut().enumerate() {
                if !output.is_index_valid(strand.len()) {
                    continue;
                }
                let Some(handle) = output.destination_handle else {
                    continue;
                };

                let index = output.particle_index;
                let translation = strand[index].position - strand[index - 1].position;
                let raw =
                    (output.strategy.value)(translation, strand, index, output.reflect, options.gravity);
                current_outputs[group.base_output_index + slot] = raw;

                if let Some(cache) = parameters.get_mut(&output.destination) {
                    cache.value =
                        output.update_parameter_value(raw, &parameter_range(model, handle), cache.value);
                }
            }
        }
    }

    /// 按 alpha 混合上一步与本步输出，写回模型
    fn interpolate<M: ParameterModel + ?Sized>(&mut self, model: &mut M, alpha: f32) {
        let Self {
            rig,
            current_outputs,
            previous_outputs,
            ..
        } = self;

        for group in &rig.groups {
            for (slot, output) in rig.outputs[group.output_range()].iter_mut().enumerate() {
                if !output.is_index_valid(group.particle_count) {
                    continue;
                }
                let Some(handle) = output.destination_handle else {
                    continue;
                };

                let i = group.base_output_index + slot;
                let blended = previous_outputs[i] * (1.0 - alpha) + current_outputs[i] * alpha;
                let current = model.parameter_value(handle);
                let value = output.update_parameter_value(blended, &parameter_range(model, handle), current);
                model.set_parameter_value(handle, value);
            }
        }
    }
}

/// 本帧可执行的固定步数：floor(remaining / tick)，且不超过 floor(max_delta_time / tick)
fn tick_count(remaining_time: f32, tick: f32, max_delta_time: f32) -> u32 {
    let available = (remaining_time / tick).floor() as u32;
    let limit = (max_delta_time / tick).floor() as u32;
    available.min(limit)
}

fn parameter_range<M: ParameterModel + ?Sized>(model: &M, handle: ParameterHandle) -> ValueRange {
    ValueRange::new(
        model.parameter_minimum(handle),
        model.parameter_maximum(handle),
        model.parameter_default(handle),
    )
}
