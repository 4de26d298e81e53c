//! 精确欧氏距离变换与有向 Hausdorff 距离.
//!
//! 距离变换按轴分离, 每条 lane 上使用下包络抛物线算法
//! (Felzenszwalb & Huttenlocher, "Distance Transforms of Sampled Functions"),
//! 复杂度与体素个数成线性关系.

use ndarray::{Array3, ArrayView3, ArrayViewMut1, Axis, Zip};

/// 复用的一维工作区.
#[derive(Default)]
struct Envelope {
    f: Vec<f64>,
    v: Vec<usize>,
    z: Vec<f64>,
}

impl Envelope {
    /// 原位计算一条 lane 的一维平方距离变换. `w` 为该轴单位步长的平方距离.
    fn transform(&mut self, mut lane: ArrayViewMut1<'_, f64>, w: f64) {
        self.f.clear();
        self.f.extend(lane.iter().copied());
        self.v.clear();
        self.z.clear();

        let f = &self.f;
        let intersect = |p: usize, q: usize| {
            let (pf, qf) = (p as f64, q as f64);
            ((f[q] + w * qf * qf) - (f[p] + w * pf * pf)) / (2.0 * w * (qf - pf))
        };

        for q in 0..f.len() {
            if !f[q].is_finite() {
                continue;
            }
            while let (Some(&p), Some(&zp)) = (self.v.last(), self.z.last()) {
                if intersect(p, q) <= zp {
                    self.v.pop();
                    self.z.pop();
                } else {
                    break;
                }
            }
            let s = self.v.last().map_or(f64::NEG_INFINITY, |&p| intersect(p, q));
            self.v.push(q);
            self.z.push(s);
        }

        // 整条 lane 都没有有限值, 保持原样 (inf).
        if self.v.is_empty() {
            return;
        }

        let mut k = 0;
        for (q, out) in lane.iter_mut().enumerate() {
            while k + 1 < self.v.len() && self.z[k + 1] < q as f64 {
                k += 1;
            }
            let d = q as f64 - self.v[k] as f64;
            *out = w * d * d + f[self.v[k]];
        }
    }
}

/// 每个体素到最近非零体素的平方欧氏距离. `sampling` 为三个轴上的体素尺寸.
///
/// 没有任何非零体素时, 所有值均为 `inf`.
pub fn squared_edt(mask: ArrayView3<'_, u8>, sampling: [f64; 3]) -> Array3<f64> {
    let mut dt = mask.mapv(|v| if v != 0 { 0.0 } else { f64::INFINITY });
    for (axis, s) in sampling.iter().enumerate() {
        sweep(&mut dt, Axis(axis), s * s);
    }
    dt
}

/// 沿 `axis` 对所有 lane 做一维变换.
#[cfg(not(feature = "rayon"))]
fn sweep(dt: &mut Array3<f64>, axis: Axis, w: f64) {
    let mut env = Envelope::default();
    for lane in dt.lanes_mut(axis) {
        env.transform(lane, w);
    }
}

/// 借助 `rayon`, 沿 `axis` 并行地对所有 lane 做一维变换.
#[cfg(feature = "rayon")]
fn sweep(dt: &mut Array3<f64>, axis: Axis, w: f64) {
    Zip::from(dt.lanes_mut(axis)).par_for_each(|lane| Envelope::default().transform(lane, w));
}

/// 从 `from` 的每个非零体素到 `to` 最近非零体素的距离的最大值, 以体素为单位.
///
/// 任一集合为空时返回 NaN. 两者形状必须一致, 否则 panic.
pub fn directed_hausdorff(from: ArrayView3<'_, u8>, to: ArrayView3<'_, u8>) -> f64 {
    assert_eq!(from.dim(), to.dim(), "体数据形状不一致");
    if !from.iter().any(|v| *v != 0) || !to.iter().any(|v| *v != 0) {
        return f64::NAN;
    }

    let dt = squared_edt(to, [1.0; 3]);
    let max_sq = Zip::from(&from)
        .and(&dt)
        .fold(0.0f64, |acc, m, d| if *m != 0 { acc.max(*d) } else { acc });
    max_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_util::f64_eq;

    /// 穷举所有点对.
    fn brute_force(from: &Array3<u8>, to: &Array3<u8>) -> f64 {
        let a: Vec<_> = from.indexed_iter().filter(|(_, v)| **v != 0).map(|(p, _)| p).collect();
        let b: Vec<_> = to.indexed_iter().filter(|(_, v)| **v != 0).map(|(p, _)| p).collect();
        if a.is_empty() || b.is_empty() {
            return f64::NAN;
        }
        a.iter()
            .map(|(z0, h0, w0)| {
                b.iter()
                    .map(|(z1, h1, w1)| {
                        let d = [z0.abs_diff(*z1), h0.abs_diff(*h1), w0.abs_diff(*w1)];
                        d.iter().map(|x| (*x * *x) as f64).sum::<f64>()
                    })
                    .fold(f64::INFINITY, f64::min)
            })
            .fold(0.0, f64::max)
            .sqrt()
    }

    /// 简单的线性同余伪随机体数据.
    fn pseudo_random(shape: (usize, usize, usize), seed: u64, density: u64) -> Array3<u8> {
        let mut s = seed;
        Array3::from_shape_fn(shape, |_| {
            s = s.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((s >> 33) % 100 < density) as u8
        })
    }

    #[test]
    fn test_edt_single_point() {
        let mut m = Array3::<u8>::zeros((3, 4, 5));
        m[(1, 1, 1)] = 1;
        let dt = squared_edt(m.view(), [1.0; 3]);
        assert_eq!(dt[(1, 1, 1)], 0.0);
        assert_eq!(dt[(2, 3, 4)], 1.0 + 4.0 + 9.0);
        assert_eq!(dt[(0, 1, 1)], 1.0);

        let dt = squared_edt(m.view(), [2.0, 1.0, 0.5]);
        assert_eq!(dt[(2, 3, 4)], 4.0 + 4.0 + 2.25);
    }

    #[test]
    fn test_edt_empty_mask() {
        let m = Array3::<u8>::zeros((2, 2, 2));
        assert!(squared_edt(m.view(), [1.0; 3]).iter().all(|v| v.is_infinite()));
    }

    #[test]
    fn test_hausdorff_matches_brute_force() {
        for seed in 1..6 {
            let a = pseudo_random((5, 7, 6), seed, 8);
            let b = pseudo_random((5, 7, 6), seed * 31 + 7, 5);
            let fast = directed_hausdorff(a.view(), b.view());
            let slow = brute_force(&a, &b);
            assert!(f64_eq(fast, slow), "seed {seed}: {fast} vs {slow}");
        }
    }

    #[test]
    fn test_hausdorff_directed_and_degenerate() {
        let mut a = Array3::<u8>::zeros((1, 1, 10));
        let mut b = Array3::<u8>::zeros((1, 1, 10));
        a[(0, 0, 0)] = 1;
        b[(0, 0, 0)] = 1;
        b[(0, 0, 9)] = 1;
        assert_eq!(directed_hausdorff(a.view(), b.view()), 0.0);
        assert_eq!(directed_hausdorff(b.view(), a.view()), 9.0);

        let empty = Array3::<u8>::zeros((1, 1, 10));
        assert!(directed_hausdorff(empty.view(), b.view()).is_nan());
        assert!(directed_hausdorff(a.view(), empty.view()).is_nan());
    }
}
