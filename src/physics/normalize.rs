//! 参数归一化
//!
//! 把模型参数的语义范围映射到物理组的工作范围（位置或角度）。

/// (最小值, 最大值, 默认值) 三元组
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ValueRange {
    pub minimum: f32,
    pub maximum: f32,
    pub default: f32,
}

impl ValueRange {
    pub const fn new(minimum: f32, maximum: f32, default: f32) -> Self {
        Self { minimum, maximum, default }
    }

    /// 把值限制在 [min, max] 内（容忍 min > max 的反向定义）
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        let lower = self.minimum.min(self.maximum);
        let upper = self.minimum.max(self.maximum);
        value.max(lower).min(upper)
    }
}

/// 归一化参数值
///
/// - value ≥ default：default→max 线性映射到 n_default→n_max
/// - value < default：default→min 线性映射到 n_default→n_min
/// - 对应半边区间退化（max == default 或 min == default）时贡献为 0
///
/// 权重由调用方乘入；`reflect` 时取反。
pub fn normalize_parameter_value(
    value: f32,
    parameter: &ValueRange,
    normalization: &ValueRange,
    reflect: bool,
) -> f32 {
    let value = parameter.clamp(value);
    let offset = value - parameter.default;

    let result = if value >= parameter.default {
        let length = parameter.maximum - parameter.default;
        if length == 0.0 {
            0.0
        } else {
            normalization.default + offset * (normalization.maximum - normalization.default) / length
        }
    } else {
        let length = parameter.minimum - parameter.default;
        if length == 0.0 {
            0.0
        } else {
            normalization.default + offset * (normalization.minimum - normalization.default) / length
        }
    };

    if reflect {
        -result
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const PARAM: ValueRange = ValueRange::new(-30.0, 30.0, 0.0);
    const NORM: ValueRange = ValueRange::new(-10.0, 10.0, 0.0);

    #[test]
    fn test_default_maps_to_normalized_default() {
        let shifted = ValueRange::new(-10.0, 10.0, 2.0);
        assert_eq!(normalize_parameter_value(0.0, &PARAM, &NORM, false), 0.0);
        assert_eq!(normalize_parameter_value(0.0, &PARAM, &shifted, false), 2.0);
    }

    #[test]
    fn test_upper_and_lower_halves() {
        assert_relative_eq!(normalize_parameter_value(15.0, &PARAM, &NORM, false), 5.0);
        assert_relative_eq!(normalize_parameter_value(30.0, &PARAM, &NORM, false), 10.0);
        assert_relative_eq!(normalize_parameter_value(-15.0, &PARAM, &NORM, false), -5.0);
        assert_relative_eq!(normalize_parameter_value(-30.0, &PARAM, &NORM, false), -10.0);
    }

    #[test]
    fn test_asymmetric_ranges() {
        let param = ValueRange::new(0.0, 1.0, 0.25);
        let norm = ValueRange::new(-4.0, 8.0, 0.0);
        // 上半区 0.25→1.0 映射 0→8
        assert_relative_eq!(normalize_parameter_value(0.625, &param, &norm, false), 4.0);
        // 下半区 0.25→0.0 映射 0→-4
        assert_relative_eq!(normalize_parameter_value(0.125, &param, &norm, false), -2.0);
    }

    #[test]
    fn test_reflect_negates() {
        assert_relative_eq!(normalize_parameter_value(15.0, &PARAM, &NORM, true), -5.0);
        assert_relative_eq!(normalize_parameter_value(-30.0, &PARAM, &NORM, true), 10.0);
    }

    #[test]
    fn test_out_of_range_value_is_clamped() {
        assert_relative_eq!(normalize_parameter_value(90.0, &PARAM, &NORM, false), 10.0);
        assert_relative_eq!(normalize_parameter_value(-90.0, &PARAM, &NORM, false), -10.0);
    }

    #[test]
    fn test_degenerate_ranges_yield_zero() {
        let no_upper = ValueRange::new(-1.0, 0.0, 0.0);
        let no_lower = ValueRange::new(0.0, 1.0, 0.0);
        assert_eq!(normalize_parameter_value(0.0, &no_upper, &NORM, false), 0.0);
        assert_eq!(normalize_parameter_value(0.5, &no_upper, &NORM, false), 0.0);
        assert_eq!(normalize_parameter_value(-0.5, &no_lower, &NORM, false), 0.0);

        let flat = ValueRange::new(3.0, 3.0, 3.0);
        let result = normalize_parameter_value(3.0, &flat, &NORM, false);
        assert_eq!(result, 0.0);
        assert!(result.is_finite());
    }
}
