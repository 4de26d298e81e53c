//! 全脑空间特征: 体数据尺寸和脑部质心.

use ndarray::ArrayView3;
use num::Zero;

use super::{FeatureMap, VolumeExtractor, NAN3};
use crate::consts::PLANES;
use crate::{MriScan, NiftiHeaderAttr, Spacing};

/// 满足 `pred` 的体素的平均坐标 (体素单位). 不存在这样的体素时返回 NaN.
pub(crate) fn mean_coordinate<T, F>(data: ArrayView3<'_, T>, pred: F) -> [f64; 3]
where
    F: Fn(&T) -> bool,
{
    let (mut n, mut acc) = (0usize, [0.0f64; 3]);
    for ((z, h, w), v) in data.indexed_iter() {
        if pred(v) {
            n += 1;
            acc[0] += z as f64;
            acc[1] += h as f64;
            acc[2] += w as f64;
        }
    }
    if n == 0 {
        return NAN3;
    }
    acc.map(|s| s / n as f64)
}

/// 所有非零体素的平均坐标, 乘以体素尺寸得到物理坐标.
///
/// 全零体数据返回 NaN.
pub fn brain_centre_of_mass<T: Zero>(data: ArrayView3<'_, T>, spacing: Spacing) -> [f64; 3] {
    spacing.scale(mean_coordinate(data, |v| !v.is_zero()))
}

/// 计算 `{plane}_dim` 和 `{plane}_brain_centre_mass`. 一般以 T1ce 序列为输入.
#[derive(Copy, Clone, Debug, Default)]
pub struct SpatialExtractor;

impl SpatialExtractor {
    fn features(dims: [f64; 3], centre: [f64; 3]) -> FeatureMap {
        let mut ans = FeatureMap::with_capacity(6);
        for (plane, d) in PLANES.iter().zip(dims) {
            ans.insert(format!("{plane}_dim"), d);
        }
        for (plane, c) in PLANES.iter().zip(centre) {
            ans.insert(format!("{plane}_brain_centre_mass"), c);
        }
        ans
    }

    /// 脑部质心. 输入缺失时为 NaN.
    pub fn centre_of_mass(scan: Option<&MriScan>) -> [f64; 3] {
        scan.map_or(NAN3, |s| brain_centre_of_mass(s.data(), s.spacing()))
    }
}

impl VolumeExtractor for SpatialExtractor {
    type Input = MriScan;

    fn name(&self) -> &str {
        "spatial"
    }

    fn extract(&self, scan: &MriScan) -> FeatureMap {
        let (z, h, w) = scan.shape();
        let centre = brain_centre_of_mass(scan.data(), scan.spacing());
        Self::features([z as f64, h as f64, w as f64], centre)
    }

    fn missing(&self) -> FeatureMap {
        Self::features(NAN3, NAN3)
    }
}
