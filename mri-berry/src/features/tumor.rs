//! 肿瘤形态特征: 各标签质心, 肿瘤位置, 含肿瘤切片数, 病灶体积.

use ndarray::{ArrayView3, Axis};

use super::spatial::mean_coordinate;
use super::{FeatureMap, VolumeExtractor, NAN3};
use crate::config::LabelMap;
use crate::consts::label::BACKGROUND;
use crate::consts::{PLANES, WHOLE};
use crate::{MriLabel, NiftiHeaderAttr, Spacing};

/// 两点之间的欧氏距离. 任一分量为 NaN 时结果为 NaN.
#[inline]
fn euclidean(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// 标签 `label` 的物理质心. 背景标签代表全部非背景体素. 标签不存在时为 NaN.
pub fn label_centre_of_mass(data: ArrayView3<'_, u8>, label: u8, spacing: Spacing) -> [f64; 3] {
    let c = if label == BACKGROUND {
        mean_coordinate(data, |p| *p != BACKGROUND)
    } else {
        mean_coordinate(data, |p| *p == label)
    };
    spacing.scale(c)
}

/// 在 (axial, coronal, sagittal) 三个方向上, 分别统计含有非背景体素的切片个数.
///
/// 逐切片比较背景体素个数与切片总体素数, 不依赖标签值的符号.
pub fn tumoral_slices(data: ArrayView3<'_, u8>) -> [usize; 3] {
    [0, 1, 2].map(|axis| {
        data.axis_iter(Axis(axis))
            .filter(|sli| sli.iter().filter(|p| **p == BACKGROUND).count() != sli.len())
            .count()
    })
}

/// 从分割标注提取肿瘤特征.
///
/// 需要事先计算好的脑部质心 (物理坐标), 以计算 `{label}_tumor_location`.
/// 脑部质心为 NaN 时, 肿瘤位置也为 NaN.
#[derive(Clone, Debug)]
pub struct TumorExtractor<'a> {
    labels: &'a LabelMap,
    brain_centre: [f64; 3],
}

impl<'a> TumorExtractor<'a> {
    /// 构建提取器.
    pub fn new(labels: &'a LabelMap, brain_centre: [f64; 3]) -> Self {
        Self {
            labels,
            brain_centre,
        }
    }

    /// 标签在特征键中的名称. 背景替换为 `whole`.
    fn key_name(id: u8, name: &str) -> String {
        if id == BACKGROUND {
            WHOLE.to_string()
        } else {
            name.to_lowercase()
        }
    }

    /// 按固定顺序写出全部特征. `None` 表示分割缺失.
    fn features(&self, label: Option<&MriLabel>) -> FeatureMap {
        let spacing = label.map(|l| l.spacing());
        let voxel = spacing.map_or(f64::NAN, |s| s.voxel_volume());

        let centres: Vec<(String, [f64; 3])> = self
            .labels
            .iter()
            .map(|(id, name)| {
                let c = match (label, spacing) {
                    (Some(l), Some(s)) => label_centre_of_mass(l.data(), id, s),
                    _ => NAN3,
                };
                (Self::key_name(id, name), c)
            })
            .collect();

        let mut ans = FeatureMap::with_capacity(self.labels.len() * 5 + 4);
        for (name, c) in centres.iter() {
            for (plane, v) in PLANES.iter().zip(c) {
                ans.insert(format!("{plane}_{name}_center_mass"), *v);
            }
        }
        for (name, c) in centres.iter() {
            ans.insert(
                format!("{name}_tumor_location"),
                euclidean(&self.brain_centre, c),
            );
        }

        let hist = label.map(|l| l.histogram());
        for (id, name) in self.labels.iter().filter(|(id, _)| *id != BACKGROUND) {
            let v = hist.map_or(f64::NAN, |h| (h[id as usize] as f64 * voxel).trunc());
            ans.insert(format!("lesion_size_{}", name.to_lowercase()), v);
        }
        ans.insert(
            "lesion_size",
            label.map_or(f64::NAN, |l| l.foreground_count() as f64 * voxel),
        );

        let slices = label.map(|l| tumoral_slices(l.data()));
        for (i, plane) in PLANES.iter().enumerate() {
            ans.insert(
                format!("{plane}_tumoral_slice"),
                slices.map_or(f64::NAN, |s| s[i] as f64),
            );
        }
        ans
    }
}

impl VolumeExtractor for TumorExtractor<'_> {
    type Input = MriLabel;

    fn name(&self) -> &str {
        "tumor"
    }

    fn extract(&self, label: &MriLabel) -> FeatureMap {
        self.features(Some(label))
    }

    fn missing(&self) -> FeatureMap {
        self.features(None)
    }
}
