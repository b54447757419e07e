//! 粒子链积分器
//!
//! 对一条链推进一个固定步长：粒子 0 是锚点，直接放到驱动平移处；
//! 其余粒子依次受重力方向、风力、速度延续驱动，并用刚性约束保持链长。
//! 临时向量全部是栈上值，不共享可变状态。

use glam::Vec2;

use super::config::DELAY_FRAME_RATE;
use super::math::{direction_to_radian, radian_to_direction, rotate_sequential};
use super::rig::{PhysicsParticle, REST_DIRECTION};

/// 一条链本步的驱动量
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StrandDrive {
    /// 累加后的平移（归一化单位）
    pub translation: Vec2,
    /// 累加后的总角度（度）
    pub angle: f32,
}

impl StrandDrive {
    /// 链条局部坐标系中的重力方向（由 -总角度 得到）
    #[inline]
    pub fn gravity_direction(&self) -> Vec2 {
        radian_to_direction((-self.angle).to_radians()).normalize_or_zero()
    }

    /// 把平移旋转到链条局部坐标系（旋转 -总角度）
    #[inline]
    pub fn rotated(self) -> Self {
        Self {
            translation: rotate_sequential(self.translation, (-self.angle).to_radians()),
            angle: self.angle,
        }
    }
}

/// 推进一条链一个步长
///
/// - `threshold`：|x| 低于此值吸附为 0
/// - `delta_time`：步长（秒）
/// - `air_resistance`：重力方向变化带来的链段旋转除以此值
pub fn update_particles(
    strand: &mut [PhysicsParticle],
    drive: StrandDrive,
    wind: Vec2,
    threshold: f32,
    delta_time: f32,
    air_resistance: f32,
) {
    let Some(anchor) = strand.first_mut() else {
        return;
    };
    anchor.position = drive.translation;

    let gravity = drive.gravity_direction();

    for i in 1..strand.len() {
        let previous = strand[i - 1].position;
        let particle = &mut strand[i];

        particle.last_position = particle.position;
        particle.force = gravity * particle.acceleration + wind;

        let delay = particle.delay * delta_time * DELAY_FRAME_RATE;

        // 重力方向变化时链段随之旋转，但被空气阻力削弱 → 摆动而非瞬间对齐
        let radian = direction_to_radian(particle.last_gravity, gravity) / air_resistance;
        let direction = rotate_sequential(particle.position - previous, radian);

        let moved = previous + direction + particle.velocity * delay + particle.force * delay * delay;

        // 刚性约束：链段长度恒为 radius
        let link = (moved - previous)
            .try_normalize()
            .or_else(|| direction.try_normalize())
            .unwrap_or(REST_DIRECTION);
        let mut position = previous + link * particle.radius;

        if position.x.abs() < threshold {
            position.x = 0.0;
        }
        particle.position = position;

        if delay != 0.0 {
            particle.velocity = (particle.position - particle.last_position) / delay * particle.mobility;
        }

        particle.force = Vec2::ZERO;
        particle.last_gravity = gravity;
    }
}

/// 稳态求解：不带惯性，直接把每个粒子放到外力方向上的平衡位置
///
/// 结果只取决于驱动量与外力，重复调用不会再改变位置。
pub fn update_particles_for_stabilization(
    strand: &mut [PhysicsParticle],
    drive: StrandDrive,
    wind: Vec2,
    threshold: f32,
) {
    let Some(anchor) = strand.first_mut() else {
        return;
    };
    anchor.position = drive.translation;

    let gravity = drive.gravity_direction();

    for i in 1..strand.len() {
        let previous = strand[i - 1].position;
        let particle = &mut strand[i];

        particle.last_position = particle.position;
        particle.force = gravity * particle.acceleration + wind;
        particle.velocity = Vec2::ZERO;

        let direction = particle.force.try_normalize().unwrap_or(gravity);
        let mut position = previous + direction * particle.radius;

        if position.x.abs() < threshold {
            position.x = 0.0;
        }
        particle.position = position;

        particle.force = Vec2::ZERO;
        particle.last_gravity = gravity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn strand(specs: &[(f32, f32, f32, f32)]) -> Vec<PhysicsParticle> {
        let mut rest = Vec2::ZERO;
        specs
            .iter()
            .enumerate()
            .map(|(i, &(mobility, delay, acceleration, radius))| {
                let mut particle = PhysicsParticle::new(mobility, delay, acceleration, radius);
                if i > 0 {
                    rest.y += radius;
                }
                particle.initial_position = rest;
                particle.position = rest;
                particle.last_position = rest;
                particle
            })
            .collect()
    }

    fn hair() -> Vec<PhysicsParticle> {
        strand(&[
            (1.0, 1.0, 1.0, 0.0),
            (0.95, 0.9, 1.5, 3.0),
            (0.9, 0.8, 2.0, 4.5),
            (0.85, 0.7, 2.5, 2.0),
        ])
    }

    fn assert_links_rigid(strand: &[PhysicsParticle]) {
        for pair in strand.windows(2) {
            let length = (pair[1].position - pair[0].position).length();
            assert_abs_diff_eq!(length, pair[1].radius, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_gravity_direction_follows_negative_angle() {
        let down = StrandDrive::default().gravity_direction();
        assert_abs_diff_eq!(down.x, 0.0);
        assert_abs_diff_eq!(down.y, 1.0);

        let tilted = StrandDrive { translation: Vec2::ZERO, angle: 90.0 }.gravity_direction();
        assert_abs_diff_eq!(tilted.x, -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(tilted.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_anchor_follows_drive() {
        let mut chain = hair();
        let drive = StrandDrive { translation: Vec2::new(2.0, -1.0), angle: 0.0 };
        update_particles(&mut chain, drive, Vec2::ZERO, 0.001, 1.0 / 60.0, 5.0);
        assert_eq!(chain[0].position, Vec2::new(2.0, -1.0));
    }

    #[test]
    fn test_rest_chain_stays_at_rest() {
        let mut chain = hair();
        let before: Vec<Vec2> = chain.iter().map(|p| p.position).collect();
        for _ in 0..20 {
            update_particles(&mut chain, StrandDrive::default(), Vec2::ZERO, 0.001, 1.0 / 30.0, 5.0);
        }
        for (particle, rest) in chain.iter().zip(before) {
            assert_abs_diff_eq!(particle.position.x, rest.x, epsilon = 1e-5);
            assert_abs_diff_eq!(particle.position.y, rest.y, epsilon = 1e-4);
            assert_abs_diff_eq!(particle.velocity.length(), 0.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_links_stay_rigid_under_motion() {
        let mut chain = hair();
        for step in 0..240 {
            let t = step as f32 / 60.0;
            let drive = StrandDrive {
                translation: Vec2::new((t * 3.0).sin() * 4.0, (t * 2.0).cos()),
                angle: (t * 5.0).sin() * 25.0,
            };
            update_particles(&mut chain, drive, Vec2::new(0.3, 0.0), 0.0, 1.0 / 60.0, 5.0);
            assert_links_rigid(&chain);
        }
    }

    #[test]
    fn test_velocity_damped_by_mobility() {
        let mut chain = strand(&[(1.0, 1.0, 1.0, 0.0), (0.0, 1.0, 1.0, 1.0)]);
        let drive = StrandDrive { translation: Vec2::new(0.5, 0.0), angle: 0.0 };
        update_particles(&mut chain, drive, Vec2::ZERO, 0.0, 1.0 / 30.0, 5.0);
        assert_eq!(chain[1].velocity, Vec2::ZERO);
        assert_eq!(chain[1].force, Vec2::ZERO);
    }

    #[test]
    fn test_zero_delay_keeps_velocity() {
        let mut chain = strand(&[(1.0, 1.0, 1.0, 0.0), (1.0, 0.0, 1.0, 1.0)]);
        chain[1].velocity = Vec2::new(0.25, 0.0);
        update_particles(&mut chain, StrandDrive::default(), Vec2::ZERO, 0.0, 1.0 / 30.0, 5.0);
        assert_eq!(chain[1].velocity, Vec2::new(0.25, 0.0));
        assert_links_rigid(&chain);
    }

    #[test]
    fn test_small_x_snaps_to_zero() {
        let mut chain = strand(&[(1.0, 1.0, 1.0, 0.0), (1.0, 1.0, 1.0, 1.0)]);
        let drive = StrandDrive { translation: Vec2::new(0.004, 0.0), angle: 0.0 };
        update_particles_for_stabilization(&mut chain, drive, Vec2::ZERO, 0.01);
        assert_eq!(chain[0].position.x, 0.004);
        assert_eq!(chain[1].position.x, 0.0);
    }

    #[test]
    fn test_stabilization_reaches_equilibrium() {
        let mut chain = hair();
        let drive = StrandDrive { translation: Vec2::new(1.0, 0.0), angle: 30.0 };
        let wind = Vec2::new(0.5, 0.0);

        update_particles_for_stabilization(&mut chain, drive, wind, 0.001);
        let first: Vec<Vec2> = chain.iter().map(|p| p.position).collect();
        assert_links_rigid(&chain);

        update_particles_for_stabilization(&mut chain, drive, wind, 0.001);
        for (particle, previous) in chain.iter().zip(first) {
            assert_eq!(particle.position, previous);
            assert_eq!(particle.velocity, Vec2::ZERO);
        }

        // 每段都沿 重力*加速度 + 风 的方向
        let gravity = drive.gravity_direction();
        for pair in chain.windows(2) {
            let expected = (gravity * pair[1].acceleration + wind).normalize();
            let actual = (pair[1].position - pair[0].position).normalize();
            assert_abs_diff_eq!(actual.x, expected.x, epsilon = 1e-4);
            assert_abs_diff_eq!(actual.y, expected.y, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_empty_and_single_strand() {
        let mut empty: Vec<PhysicsParticle> = Vec::new();
        update_particles(&mut empty, StrandDrive::default(), Vec2::ZERO, 0.0, 0.1, 5.0);
        update_particles_for_stabilization(&mut empty, StrandDrive::default(), Vec2::ZERO, 0.0);

        let mut single = strand(&[(1.0, 1.0, 1.0, 0.0)]);
        let drive = StrandDrive { translation: Vec2::new(1.0, 2.0), angle: 10.0 };
        update_particles(&mut single, drive, Vec2::ZERO, 0.0, 0.1, 5.0);
        assert_eq!(single[0].position, Vec2::new(1.0, 2.0));
    }
}
