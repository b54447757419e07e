//! 摆链物理系统
//!
//! 核心设计：
//! - PhysicsRig: 平铺存储的组/输入/输出/粒子，由 RigBuilder 构建
//! - 策略表: 构建时按 X / Y / Angle 选定的函数指针
//! - PuppetPhysics: 固定步长累加器 + 插值写回

pub mod config;
mod math;
mod normalize;
mod rig;
mod strategy;
mod integrator;
mod builder;
mod json;
mod puppet_physics;
pub mod batch;

pub use config::{get_config, reset_config, set_config, PhysicsConfig};
pub use math::{direction_to_radian, radian_to_direction};
pub use normalize::{normalize_parameter_value, ValueRange};
pub use rig::{
    Normalization, PhysicsGroup, PhysicsInput, PhysicsKind, PhysicsOutput, PhysicsParticle,
    PhysicsRig,
};
pub use integrator::{update_particles, update_particles_for_stabilization, StrandDrive};
pub use builder::{
    GroupDefinition, InputDefinition, OutputDefinition, ParticleDefinition, RigBuilder,
    RigDefinition,
};
pub use json::{parse_rig_definition, parse_rig_definition_bytes};
pub use puppet_physics::{PhysicsOptions, PuppetPhysics};
pub use batch::{advance_all, PhysicsInstance};
