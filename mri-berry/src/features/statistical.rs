//! 一阶强度统计特征.
//!
//! 与 numpy/scipy 的缺省行为一致: 总体标准差, 线性插值分位数, 有偏偏度,
//! 以及 Fisher 定义的峰度 (超额峰度).

use ordered_float::OrderedFloat;

use super::{FeatureMap, VolumeExtractor};
use crate::MriScan;

/// 输出特征名, 顺序固定.
pub const KEYS: [&str; 10] = [
    "max_intensity",
    "min_intensity",
    "mean_intensity",
    "median_intensity",
    "10_perc_intensity",
    "90_perc_intensity",
    "std_intensity",
    "range_intensity",
    "skewness",
    "kurtosis",
];

/// 一组强度值的十个统计量. 空输入的全部统计量均为 NaN.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntensityStats {
    /// 最大值.
    pub max: f64,
    /// 最小值.
    pub min: f64,
    /// 均值.
    pub mean: f64,
    /// 中位数.
    pub median: f64,
    /// 第 10 百分位数.
    pub p10: f64,
    /// 第 90 百分位数.
    pub p90: f64,
    /// 总体标准差.
    pub std: f64,
    /// `max - min`.
    pub range: f64,
    /// 有偏偏度. 常数输入为 NaN.
    pub skewness: f64,
    /// 超额峰度. 常数输入为 NaN.
    pub kurtosis: f64,
}

/// 有序数组的线性插值分位数, `p` 以百分比表示. 位置为 `(n - 1) * p / 100`.
///
/// 空数组返回 NaN.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    let pos = (n - 1) as f64 * p / 100.0;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// 中心矩 `(m2, m3, m4)`.
fn central_moments(values: &[f64], mean: f64) -> (f64, f64, f64) {
    let n = values.len() as f64;
    let (s2, s3, s4) = values.iter().fold((0.0, 0.0, 0.0), |(s2, s3, s4), v| {
        let d = v - mean;
        let d2 = d * d;
        (s2 + d2, s3 + d2 * d, s4 + d2 * d2)
    });
    (s2 / n, s3 / n, s4 / n)
}

impl IntensityStats {
    /// 全为 NaN 的统计量.
    pub const NAN: Self = Self {
        max: f64::NAN,
        min: f64::NAN,
        mean: f64::NAN,
        median: f64::NAN,
        p10: f64::NAN,
        p90: f64::NAN,
        std: f64::NAN,
        range: f64::NAN,
        skewness: f64::NAN,
        kurtosis: f64::NAN,
    };

    /// 计算 `values` 的统计量. 各统计量互相独立, 一个未定义不影响其它.
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::NAN;
        }

        let mut sorted: Vec<OrderedFloat<f64>> = values.iter().copied().map(OrderedFloat).collect();
        sorted.sort_unstable();
        let sorted: Vec<f64> = sorted.into_iter().map(|v| v.0).collect();

        let n = values.len() as f64;
        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        let mean = values.iter().sum::<f64>() / n;
        let (m2, m3, m4) = central_moments(values, mean);

        // 与 scipy 相同, 方差在浮点精度内为零时视为常数数组.
        let constant = m2 <= (f64::EPSILON * mean).powi(2);
        let (skewness, kurtosis) = if constant {
            (f64::NAN, f64::NAN)
        } else {
            (m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0)
        };

        Self {
            max,
            min,
            mean,
            median: percentile(&sorted, 50.0),
            p10: percentile(&sorted, 10.0),
            p90: percentile(&sorted, 90.0),
            std: m2.sqrt(),
            range: max - min,
            skewness,
            kurtosis,
        }
    }

    /// 按 [`KEYS`] 的顺序给出取值.
    pub fn values(&self) -> [f64; 10] {
        [
            self.max,
            self.min,
            self.mean,
            self.median,
            self.p10,
            self.p90,
            self.std,
            self.range,
            self.skewness,
            self.kurtosis,
        ]
    }

    /// 转换为不带前缀的特征映射.
    pub fn to_features(&self) -> FeatureMap {
        KEYS.into_iter().zip(self.values()).collect()
    }
}

/// 从单个序列中所有严格为正的体素计算一阶统计特征, 键带有序列名前缀.
#[derive(Clone, Debug)]
pub struct StatisticalExtractor {
    prefix: String,
}

impl StatisticalExtractor {
    /// `prefix` 一般为序列名, 例如 `t1ce`.
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl VolumeExtractor for StatisticalExtractor {
    type Input = MriScan;

    fn name(&self) -> &str {
        &self.prefix
    }

    fn extract(&self, scan: &MriScan) -> FeatureMap {
        IntensityStats::of(&scan.positive_values())
            .to_features()
            .prefixed(&self.prefix)
    }

    fn missing(&self) -> FeatureMap {
        IntensityStats::NAN.to_features().prefixed(&self.prefix)
    }
}
