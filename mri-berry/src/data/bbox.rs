//! 非零体素的轴对齐包围盒.

use ndarray::{s, ArrayView3};
use num::Zero;

use crate::Idx3d;

/// 3D 轴对齐包围盒. 上下界均为闭区间, 按 (axial, coronal, sagittal) 组织.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BoundingBox {
    lo: Idx3d,
    hi: Idx3d,
}

impl BoundingBox {
    /// 求 `data` 中所有非零体素的最小包围盒.
    ///
    /// 若 `data` 全为零 (或为空), 则返回 `None`.
    pub fn of_nonzero<T: Zero>(data: ArrayView3<'_, T>) -> Option<Self> {
        let mut it = data
            .indexed_iter()
            .filter_map(|(pos, v)| (!v.is_zero()).then_some(pos));
        let first = it.next()?;
        let (lo, hi) = it.fold((first, first), |(lo, hi), (z, h, w)| {
            (
                (lo.0.min(z), lo.1.min(h), lo.2.min(w)),
                (hi.0.max(z), hi.1.max(h), hi.2.max(w)),
            )
        });
        Some(Self { lo, hi })
    }

    /// 下界 (含).
    #[inline]
    pub fn lower(&self) -> Idx3d {
        self.lo
    }

    /// 上界 (含).
    #[inline]
    pub fn upper(&self) -> Idx3d {
        self.hi
    }

    /// 包围盒的形状.
    #[inline]
    pub fn dim(&self) -> Idx3d {
        (
            self.hi.0 - self.lo.0 + 1,
            self.hi.1 - self.lo.1 + 1,
            self.hi.2 - self.lo.2 + 1,
        )
    }

    /// 截取 `data` 中位于包围盒内的部分.
    ///
    /// 包围盒超出 `data` 范围时 panic.
    #[inline]
    pub fn crop<'a, T>(&self, data: ArrayView3<'a, T>) -> ArrayView3<'a, T> {
        let (lo, hi) = (self.lo, self.hi);
        data.slice_move(s![lo.0..=hi.0, lo.1..=hi.1, lo.2..=hi.2])
    }
}

/// 将 `data` 裁剪到非零体素的包围盒. 全零体数据原样返回.
pub fn crop_to_nonzero<T: Zero>(data: ArrayView3<'_, T>) -> ArrayView3<'_, T> {
    match BoundingBox::of_nonzero(data.view()) {
        Some(bbox) => bbox.crop(data),
        None => data,
    }
}
