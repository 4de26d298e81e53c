//! 基于灰度共生矩阵 (GLCM) 的二阶纹理特征.
//!
//! 体数据先以自身的 min-max 归一化到 8-bit, 然后对每个 axial 切片计算
//! 距离为 1, 角度为 0°, 45°, 90°, 135° 的对称归一化 GLCM, 求六种纹理属性在四个角度上的均值.
//! 最后对所有切片求均值和 (总体) 标准差.

use ndarray::{Array3, ArrayView2, ArrayView3, Axis};

use super::{FeatureMap, VolumeExtractor};
use crate::data::bbox::crop_to_nonzero;
use crate::{IntensityWindow, MriScan};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 灰度级数.
pub const LEVELS: usize = 256;

/// 0°, 45°, 90°, 135° 对应的 (行, 列) 偏移.
const OFFSETS: [(isize, isize); 4] = [(0, 1), (1, 1), (1, 0), (1, -1)];

/// 纹理属性.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TextureProp {
    /// `Σ P(i, j) (i - j)^2`.
    Contrast,
    /// `Σ P(i, j) |i - j|`.
    Dissimilarity,
    /// `Σ P(i, j) / (1 + (i - j)^2)`.
    Homogeneity,
    /// 角二阶矩, `Σ P(i, j)^2`.
    Asm,
    /// `sqrt(ASM)`.
    Energy,
    /// 灰度线性相关性.
    Correlation,
}

impl TextureProp {
    /// 全部属性, 按输出顺序.
    pub const ALL: [Self; 6] = [
        Self::Contrast,
        Self::Dissimilarity,
        Self::Homogeneity,
        Self::Asm,
        Self::Energy,
        Self::Correlation,
    ];

    /// 特征键中使用的名称.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Contrast => "contrast",
            Self::Dissimilarity => "dissimilarity",
            Self::Homogeneity => "homogeneity",
            Self::Asm => "ASM",
            Self::Energy => "energy",
            Self::Correlation => "correlation",
        }
    }
}

/// 单个切片在四个角度上的对称归一化 GLCM, 形状为 `(4, 256, 256)`.
#[derive(Clone, Debug)]
pub struct Glcm {
    p: Array3<f64>,
}

impl Glcm {
    /// 计算 8-bit 切片的 GLCM. 没有任何像素对的角度保持全零.
    pub fn of_slice(slice: ArrayView2<'_, u8>) -> Self {
        let (h, w) = slice.dim();
        let mut p = Array3::<f64>::zeros((OFFSETS.len(), LEVELS, LEVELS));

        for (a, (dr, dc)) in OFFSETS.iter().enumerate() {
            for r in 0..h {
                let Some(r2) = r.checked_add_signed(*dr).filter(|v| *v < h) else {
                    continue;
                };
                for c in 0..w {
                    let Some(c2) = c.checked_add_signed(*dc).filter(|v| *v < w) else {
                        continue;
                    };
                    let i = slice[(r, c)] as usize;
                    let j = slice[(r2, c2)] as usize;
                    // symmetric
                    p[(a, i, j)] += 1.0;
                    p[(a, j, i)] += 1.0;
                }
            }

            let mut m = p.index_axis_mut(Axis(0), a);
            let sum = m.sum();
            if sum > 0.0 {
                m /= sum;
            }
        }
        Self { p }
    }

    /// 第 `angle` 个角度的矩阵.
    #[inline]
    pub fn matrix(&self, angle: usize) -> ArrayView2<'_, f64> {
        self.p.index_axis(Axis(0), angle)
    }

    /// 单个角度上的六种属性, 按 [`TextureProp::ALL`] 的顺序.
    fn angle_props(m: ArrayView2<'_, f64>) -> [f64; 6] {
        let (mut mean_i, mut mean_j) = (0.0, 0.0);
        let (mut contrast, mut dissim, mut homog, mut asm) = (0.0, 0.0, 0.0, 0.0);
        for ((i, j), v) in m.indexed_iter() {
            if *v == 0.0 {
                continue;
            }
            let d = i as f64 - j as f64;
            mean_i += i as f64 * v;
            mean_j += j as f64 * v;
            contrast += v * d * d;
            dissim += v * d.abs();
            homog += v / (1.0 + d * d);
            asm += v * v;
        }

        let (mut var_i, mut var_j, mut cov) = (0.0, 0.0, 0.0);
        for ((i, j), v) in m.indexed_iter() {
            if *v == 0.0 {
                continue;
            }
            let di = i as f64 - mean_i;
            let dj = j as f64 - mean_j;
            var_i += v * di * di;
            var_j += v * dj * dj;
            cov += v * di * dj;
        }
        let (std_i, std_j) = (var_i.sqrt(), var_j.sqrt());
        let correlation = if std_i < 1e-15 || std_j < 1e-15 {
            1.0
        } else {
            cov / (std_i * std_j)
        };

        [contrast, dissim, homog, asm, asm.sqrt(), correlation]
    }

    /// 六种属性在四个角度上的均值, 按 [`TextureProp::ALL`] 的顺序.
    pub fn props(&self) -> [f64; 6] {
        let mut ans = [0.0; 6];
        for a in 0..OFFSETS.len() {
            for (acc, v) in ans.iter_mut().zip(Self::angle_props(self.matrix(a))) {
                *acc += v;
            }
        }
        ans.map(|v| v / OFFSETS.len() as f64)
    }

    /// 单个属性在四个角度上的均值.
    #[inline]
    pub fn prop(&self, prop: TextureProp) -> f64 {
        let idx = TextureProp::ALL.iter().position(|p| *p == prop).unwrap_or(0);
        self.props()[idx]
    }
}

/// 以体数据自身的 min-max 窗口量化到 8-bit. 没有有限值时返回 `None`.
pub fn quantize(data: ArrayView3<'_, f32>) -> Option<Array3<u8>> {
    let window = IntensityWindow::from_min_max(data.iter())?;
    Some(data.mapv(|v| window.eval(v).unwrap_or(0)))
}

/// 计算单个序列的纹理特征, 键为 `{prefix}_mean_<prop>` 和 `{prefix}_std_<prop>`.
#[derive(Clone, Debug)]
pub struct TextureExtractor {
    prefix: String,
    crop: bool,
}

impl TextureExtractor {
    /// `crop` 为真时, 先裁剪到非零体素的包围盒.
    pub fn new<S: Into<String>>(prefix: S, crop: bool) -> Self {
        Self {
            prefix: prefix.into(),
            crop,
        }
    }

    fn prepare(&self, scan: &MriScan) -> Option<Array3<u8>> {
        let data = scan.data();
        let data = if self.crop {
            crop_to_nonzero(data)
        } else {
            data
        };
        quantize(data)
    }

    /// 每个属性在所有切片上的均值与总体标准差.
    fn summarise(&self, per_slice: &[[f64; 6]]) -> FeatureMap {
        let n = per_slice.len() as f64;
        let mut ans = FeatureMap::with_capacity(12);
        for (k, prop) in TextureProp::ALL.iter().enumerate() {
            let (mean, std) = if per_slice.is_empty() {
                (f64::NAN, f64::NAN)
            } else {
                let mean = per_slice.iter().map(|s| s[k]).sum::<f64>() / n;
                let var = per_slice.iter().map(|s| (s[k] - mean).powi(2)).sum::<f64>() / n;
                (mean, var.sqrt())
            };
            ans.insert(format!("{}_mean_{}", self.prefix, prop.name()), mean);
            ans.insert(format!("{}_std_{}", self.prefix, prop.name()), std);
        }
        ans
    }

    /// 借助 `rayon`, 逐切片并行计算. 结果与 [`VolumeExtractor::extract`] 相同.
    #[cfg(feature = "rayon")]
    pub fn par_extract(&self, scan: &MriScan) -> FeatureMap {
        let Some(q) = self.prepare(scan) else {
            return self.missing();
        };
        let per_slice: Vec<[f64; 6]> = q
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|s| Glcm::of_slice(s).props())
            .collect();
        self.summarise(&per_slice)
    }
}

impl VolumeExtractor for TextureExtractor {
    type Input = MriScan;

    fn name(&self) -> &str {
        &self.prefix
    }

    fn extract(&self, scan: &MriScan) -> FeatureMap {
        let Some(q) = self.prepare(scan) else {
            return self.missing();
        };
        let per_slice: Vec<[f64; 6]> = q
            .axis_iter(Axis(0))
            .map(|s| Glcm::of_slice(s).props())
            .collect();
        self.summarise(&per_slice)
    }

    fn missing(&self) -> FeatureMap {
        self.summarise(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_util::f64_eq;
    use crate::Spacing;
    use ndarray::{arr2, Array3};

    fn two_rows() -> Array3<f32> {
        let mut data = Array3::<f32>::zeros((1, 2, 2));
        data[(0, 1, 0)] = 255.0;
        data[(0, 1, 1)] = 255.0;
        data
    }

    #[test]
    fn test_glcm_two_rows() {
        let q = quantize(two_rows().view()).unwrap();
        let g = Glcm::of_slice(q.index_axis(Axis(0), 0));

        // 0°: 只有同值对.
        assert_eq!(g.matrix(0)[(0, 0)], 0.5);
        assert_eq!(g.matrix(0)[(255, 255)], 0.5);
        // 90°: 全部为 (0, 255) 对.
        assert_eq!(g.matrix(2)[(0, 255)], 0.5);
        assert_eq!(g.matrix(2)[(255, 0)], 0.5);

        let [contrast, dissim, homog, asm, energy, corr] = g.props();
        assert!(f64_eq(contrast, 3.0 * 65025.0 / 4.0));
        assert!(f64_eq(dissim, 3.0 * 255.0 / 4.0));
        assert!(f64_eq(homog, (1.0 + 3.0 / 65026.0) / 4.0));
        assert!(f64_eq(asm, 0.5));
        assert!(f64_eq(energy, f64::sqrt(0.5)));
        assert!(f64_eq(corr, -0.5));
        assert!(f64_eq(g.prop(TextureProp::Correlation), -0.5));
    }

    #[test]
    fn test_glcm_constant_slice() {
        let g = Glcm::of_slice(arr2(&[[7u8, 7, 7], [7, 7, 7]]).view());
        let [contrast, _, homog, asm, _, corr] = g.props();
        assert_eq!(contrast, 0.0);
        assert!(f64_eq(homog, 1.0));
        assert!(f64_eq(asm, 1.0));
        assert_eq!(corr, 1.0);
    }

    #[test]
    fn test_glcm_single_pixel_stays_zero() {
        let g = Glcm::of_slice(arr2(&[[3u8]]).view());
        assert_eq!(g.matrix(0).sum(), 0.0);
        let [contrast, _, homog, asm, _, corr] = g.props();
        assert_eq!((contrast, homog, asm), (0.0, 0.0, 0.0));
        assert_eq!(corr, 1.0);
    }

    #[test]
    fn test_quantize_flat() {
        let q = quantize(Array3::<f32>::from_elem((2, 2, 2), 4.0).view()).unwrap();
        assert!(q.iter().all(|v| *v == 0));
    }

    #[test]
    fn test_crop_removes_padding() {
        let mut padded = Array3::<f32>::zeros((3, 4, 4));
        padded[(1, 1, 1)] = 10.0;
        padded[(1, 1, 2)] = 10.0;
        padded[(1, 2, 1)] = 20.0;
        padded[(1, 2, 2)] = 20.0;
        let padded = MriScan::from_array(padded, Spacing::default());
        let tight = MriScan::from_array(two_rows(), Spacing::default());

        let cropped = TextureExtractor::new("t2", true).extract(&padded);
        let reference = TextureExtractor::new("t2", false).extract(&tight);
        assert_eq!(cropped.len(), 12);
        for ((k1, v1), (k2, v2)) in cropped.iter().zip(reference.iter()) {
            assert_eq!(k1, k2);
            assert!(f64_eq(v1, v2), "{k1}: {v1} vs {v2}");
        }
        assert_eq!(cropped.get("t2_std_contrast"), Some(0.0));

        let uncropped = TextureExtractor::new("t2", false).extract(&padded);
        assert_eq!(uncropped.get("t2_std_contrast").map(|v| v > 0.0), Some(true));
    }

    #[test]
    fn test_texture_missing() {
        let f = TextureExtractor::new("t1", true).extract_or_missing(None);
        assert_eq!(f.len(), 12);
        assert_eq!(f.nan_count(), 12);
        assert!(f.get("t1_mean_ASM").is_some());
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_extract_matches() {
        let mut data = Array3::<f32>::zeros((4, 6, 5));
        for ((z, h, w), v) in data.indexed_iter_mut() {
            *v = ((z * 31 + h * 7 + w * 3) % 17) as f32;
        }
        let scan = MriScan::from_array(data, Spacing::default());
        let ex = TextureExtractor::new("flair", false);
        assert_eq!(ex.extract(&scan), ex.par_extract(&scan));
    }
}
