/// MRI 强度窗口, 由下限和上限组成, 用于将任意强度线性映射到 8-bit 灰度.
///
/// 与 CT 不同, MRI 强度没有绝对物理意义, 因此窗口一般由体数据自身的
/// 最小值和最大值决定 (min-max 归一化). 该窗口是只读的.
/// 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug)]
pub struct IntensityWindow {
    lower: f32,
    upper: f32,
}

impl IntensityWindow {
    /// 构建强度窗.
    ///
    /// `lower` 和 `upper` 必须为有限值且 `lower <= upper`, 否则返回 `None`.
    /// 允许 `lower == upper`, 此时所有强度都映射到 0.
    pub fn new(lower: f32, upper: f32) -> Option<IntensityWindow> {
        (lower.is_finite() && upper.is_finite() && lower <= upper)
            .then_some(Self { lower, upper })
    }

    /// 以 `it` 中所有有限值的最小值和最大值构建强度窗.
    ///
    /// 如果 `it` 中不存在有限值, 则返回 `None`.
    pub fn from_min_max<'a, I: IntoIterator<Item = &'a f32>>(it: I) -> Option<IntensityWindow> {
        use itertools::{Itertools, MinMaxResult};

        match it
            .into_iter()
            .copied()
            .filter(|v| v.is_finite())
            .minmax_by(|a, b| a.total_cmp(b))
        {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(v) => Self::new(v, v),
            MinMaxResult::MinMax(lo, hi) => Self::new(lo, hi),
        }
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f32 {
        self.lower
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f32 {
        self.upper
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.upper - self.lower
    }

    /// 窗口是否退化 (宽度为 0)?
    #[inline]
    pub fn is_flat(&self) -> bool {
        self.width() == 0.0
    }

    /// 求在当前窗口设置下, 强度 `v` 对应的灰度图像素整数值 (0 <= value <= 255).
    /// 窗内的值向零截断.
    ///
    /// 如果 `v` 无意义 (如 inf, NaN), 则返回 `None`. 退化窗口总是给出 `Some(0)`.
    pub fn eval(&self, v: f32) -> Option<u8> {
        if !v.is_finite() {
            return None;
        }
        if self.is_flat() || v <= self.lower {
            Some(u8::MIN)
        } else if v >= self.upper {
            Some(u8::MAX)
        } else {
            // 255, not 256.
            let scaled = (v as f64 - self.lower as f64) / self.width() as f64 * 255.0;
            Some(scaled as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::IntensityWindow;

    #[test]
    fn test_window_invalid_input() {
        assert!(IntensityWindow::new(1.0, 0.0).is_none());
        assert!(IntensityWindow::new(f32::NAN, 1.0).is_none());
        assert!(IntensityWindow::new(0.0, f32::INFINITY).is_none());
        assert!(IntensityWindow::from_min_max([f32::NAN].iter()).is_none());
        assert!(IntensityWindow::from_min_max([].iter()).is_none());
    }

    #[test]
    fn test_window_generic() {
        let w = IntensityWindow::from_min_max([10.0, 50.0, 30.0, f32::NAN].iter()).unwrap();
        assert_eq!(w.lower_bound(), 10.0);
        assert_eq!(w.upper_bound(), 50.0);
        assert_eq!(w.eval(f32::NAN), None);
        assert_eq!(w.eval(10.0), Some(0));
        assert_eq!(w.eval(50.0), Some(255));
        assert_eq!(w.eval(30.0), Some(127));
        assert_eq!(w.eval(20.0), Some(63));
        assert_eq!(w.eval(49.99), Some(254));
        assert_eq!(w.eval(-100.0), Some(0));
    }

    #[test]
    fn test_window_flat() {
        let w = IntensityWindow::from_min_max([3.0, 3.0].iter()).unwrap();
        assert!(w.is_flat());
        assert_eq!(w.eval(3.0), Some(0));
    }
}
