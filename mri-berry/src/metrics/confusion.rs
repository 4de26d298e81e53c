//! 只记录错误的体素级混淆矩阵 (误分类矩阵), 及其队列级汇总.
//!
//! `M[i][j]` 为真值标签 `labels[i]` 被预测为 `labels[j]` 的体素个数 (`i != j`).
//! 对角线恒为零: 分类正确的体素不计入.

use ndarray::{Array2, ArrayView2, ArrayView3, Zip};

use crate::{Error, Result};

/// 不在标签列表中的标签值.
const UNTRACKED: usize = usize::MAX;

/// 行归一化为百分比: 每行除以该行之和再乘 100. 行和为零的行保持为零.
pub fn normalize_rows(m: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut ans = m.to_owned();
    for mut row in ans.rows_mut() {
        let sum = row.sum();
        if sum == 0.0 {
            row.fill(0.0);
        } else {
            row.mapv_inplace(|v| v / sum * 100.0);
        }
    }
    ans
}

/// 单个受试者的误分类矩阵.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorMatrix {
    labels: Vec<u8>,
    counts: Array2<u64>,
}

impl ErrorMatrix {
    /// 统计 `gt` 与 `pred` 之间的误分类. 只追踪 `labels` 中出现的标签,
    /// 行列顺序与 `labels` 一致.
    ///
    /// 两者形状不一致时返回 [`Error::ShapeMismatch`].
    pub fn compute(gt: ArrayView3<'_, u8>, pred: ArrayView3<'_, u8>, labels: &[u8]) -> Result<Self> {
        if gt.shape() != pred.shape() {
            return Err(Error::ShapeMismatch {
                gt: gt.shape().to_vec(),
                pred: pred.shape().to_vec(),
            });
        }

        let mut lut = [UNTRACKED; 256];
        for (i, l) in labels.iter().enumerate().rev() {
            lut[*l as usize] = i;
        }

        let n = labels.len();
        let mut counts = Array2::<u64>::zeros((n, n));
        Zip::from(&gt).and(&pred).for_each(|g, p| {
            let (i, j) = (lut[*g as usize], lut[*p as usize]);
            if i != j && i != UNTRACKED && j != UNTRACKED {
                counts[(i, j)] += 1;
            }
        });
        Ok(Self {
            labels: labels.to_vec(),
            counts,
        })
    }

    /// 行列对应的标签.
    #[inline]
    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// 原始计数.
    #[inline]
    pub fn counts(&self) -> ArrayView2<'_, u64> {
        self.counts.view()
    }

    /// 原始计数的浮点形式.
    #[inline]
    pub fn to_f64(&self) -> Array2<f64> {
        self.counts.mapv(|v| v as f64)
    }

    /// 行归一化后的百分比矩阵.
    #[inline]
    pub fn normalized(&self) -> Array2<f64> {
        normalize_rows(self.to_f64().view())
    }

    /// 全部误分类体素个数.
    #[inline]
    pub fn total(&self) -> u64 {
        self.counts.sum()
    }
}

/// 队列级误分类矩阵累加器.
#[derive(Clone, Debug, PartialEq)]
pub struct CohortErrorMatrix {
    labels: Vec<u8>,
    sum: Array2<u64>,
    normalized_sum: Array2<f64>,
    subjects: usize,
}

impl CohortErrorMatrix {
    /// 以 `labels` 为行列的空累加器.
    pub fn new(labels: &[u8]) -> Self {
        let n = labels.len();
        Self {
            labels: labels.to_vec(),
            sum: Array2::zeros((n, n)),
            normalized_sum: Array2::zeros((n, n)),
            subjects: 0,
        }
    }

    fn check_labels(&self, other: &[u8]) -> Result<()> {
        if self.labels == other {
            Ok(())
        } else {
            Err(Error::LabelMismatch {
                expected: self.labels.clone(),
                found: other.to_vec(),
            })
        }
    }

    /// 加入一个受试者. 标签列表不一致时返回错误.
    pub fn add(&mut self, m: &ErrorMatrix) -> Result<()> {
        self.check_labels(&m.labels)?;
        self.sum += &m.counts;
        self.normalized_sum += &m.normalized();
        self.subjects += 1;
        Ok(())
    }

    /// 合并另一个累加器. 可用于并行归约.
    pub fn merge(mut self, other: Self) -> Result<Self> {
        self.check_labels(&other.labels)?;
        self.sum += &other.sum;
        self.normalized_sum += &other.normalized_sum;
        self.subjects += other.subjects;
        Ok(self)
    }

    /// 已加入的受试者个数.
    #[inline]
    pub fn subjects(&self) -> usize {
        self.subjects
    }

    /// 行列对应的标签.
    #[inline]
    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// 所有受试者计数之和.
    pub fn accumulated(&self) -> Array2<f64> {
        self.sum.mapv(|v| v as f64)
    }

    /// 计数之和除以受试者个数, 向零截断. 没有受试者时为全零.
    pub fn averaged(&self) -> Array2<f64> {
        let n = self.subjects.max(1) as u64;
        self.sum.mapv(|v| (v / n) as f64)
    }

    /// 先 (可选) 平均, 再 (可选) 行归一化.
    pub fn finish(&self, averaged: bool, normalized: bool) -> Array2<f64> {
        let m = if averaged {
            self.averaged()
        } else {
            self.accumulated()
        };
        if normalized {
            normalize_rows(m.view())
        } else {
            m
        }
    }

    /// 先逐受试者行归一化, 再求平均. 与 `finish(true, true)` 一般不相等.
    pub fn finish_per_subject_normalized(&self) -> Array2<f64> {
        let n = self.subjects.max(1) as f64;
        self.normalized_sum.mapv(|v| v / n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_util::f64_eq;
    use ndarray::{arr2, Array3};

    fn volume(v: &[u8]) -> Array3<u8> {
        Array3::from_shape_vec((1, 1, v.len()), v.to_vec()).unwrap()
    }

    #[test]
    fn test_mistakes_only() {
        let gt = volume(&[0, 0, 1, 1, 1, 2, 2, 3, 9]);
        let pred = volume(&[0, 1, 1, 2, 2, 0, 2, 3, 1]);
        let m = ErrorMatrix::compute(gt.view(), pred.view(), &[0, 1, 2, 3]).unwrap();
        assert_eq!(
            m.counts(),
            arr2(&[[0u64, 1, 0, 0], [0, 0, 2, 0], [1, 0, 0, 0], [0, 0, 0, 0]])
        );
        assert_eq!(m.total(), 4);
        for i in 0..4 {
            assert_eq!(m.counts()[(i, i)], 0);
        }
    }

    #[test]
    fn test_diagonal_always_zero() {
        let mut s = 17u32;
        let mut next = || {
            s = s.wrapping_mul(1103515245).wrapping_add(12345);
            ((s >> 16) % 4) as u8
        };
        let gt = Array3::from_shape_simple_fn((3, 4, 5), &mut next);
        let pred = Array3::from_shape_simple_fn((3, 4, 5), &mut next);
        let m = ErrorMatrix::compute(gt.view(), pred.view(), &[3, 1, 0, 2]).unwrap();
        assert!(m.counts().diag().iter().all(|v| *v == 0));
        assert!(m.normalized().diag().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_shape_mismatch() {
        let r = ErrorMatrix::compute(volume(&[0, 1]).view(), volume(&[0]).view(), &[0, 1]);
        assert!(matches!(r, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_normalize_rows() {
        let counts = arr2(&[[0.0, 3.0, 1.0], [2.0, 0.0, 0.0], [0.0, 0.0, 0.0]]);
        let once = normalize_rows(counts.view());
        assert_eq!(once, arr2(&[[0.0, 75.0, 25.0], [100.0, 0.0, 0.0], [0.0, 0.0, 0.0]]));
        // 计数矩阵归一化后发生了变化; 对百分比矩阵再次归一化则保持不变.
        assert_ne!(once, counts);
        let twice = normalize_rows(once.view());
        assert!(once.iter().zip(twice.iter()).all(|(a, b)| f64_eq(*a, *b)));
    }

    #[test]
    fn test_cohort_orders_differ() {
        let labels = [0, 1, 2];
        let a = ErrorMatrix::compute(volume(&[0, 0, 0, 1]).view(), volume(&[1, 1, 2, 0]).view(), &labels).unwrap();
        let b = ErrorMatrix::compute(volume(&[0, 1, 1]).view(), volume(&[2, 2, 2]).view(), &labels).unwrap();

        let mut cohort = CohortErrorMatrix::new(&labels);
        cohort.add(&a).unwrap();
        cohort.add(&b).unwrap();
        assert_eq!(cohort.subjects(), 2);

        // sum = [[0, 2, 2], [1, 0, 2], [0, 0, 0]]
        assert_eq!(
            cohort.accumulated(),
            arr2(&[[0.0, 2.0, 2.0], [1.0, 0.0, 2.0], [0.0, 0.0, 0.0]])
        );
        // 整数截断.
        assert_eq!(
            cohort.averaged(),
            arr2(&[[0.0, 1.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 0.0]])
        );
        assert_eq!(
            cohort.finish(true, true),
            arr2(&[[0.0, 50.0, 50.0], [0.0, 0.0, 100.0], [0.0, 0.0, 0.0]])
        );

        // a: [[0, 200/3, 100/3], [100, 0, 0]], b: [[0, 0, 100], [0, 0, 100]].
        let alt = cohort.finish_per_subject_normalized();
        assert!(f64_eq(alt[(0, 1)], 100.0 / 3.0));
        assert!(f64_eq(alt[(0, 2)], 200.0 / 3.0));
        assert!(f64_eq(alt[(1, 0)], 50.0));
        assert_ne!(alt, cohort.finish(true, true));

        let merged = CohortErrorMatrix::new(&labels)
            .merge(cohort.clone())
            .unwrap();
        assert_eq!(merged, cohort);
        assert!(matches!(
            CohortErrorMatrix::new(&[0, 1]).merge(cohort),
            Err(Error::LabelMismatch { expected, found }) if expected == [0, 1] && found == labels
        ));
        assert!(matches!(
            CohortErrorMatrix::new(&[0, 1]).add(&a),
            Err(Error::LabelMismatch { .. })
        ));
    }
}
