//! 多值标签体数据与二值通道栈之间的转换.

use ndarray::{Array3, Array4, ArrayView3, ArrayView4, Axis};

use crate::config::{LabelSpec, Region};

/// 将标签体数据编码为二值通道栈, 形状为 `(C, z, h, w)`.
///
/// 第 `c` 个通道在标签属于 `specs[c]` 处为 1, 其余为 0. 通道顺序与 `specs` 一致.
/// `skip_background` 为真时去掉单独的背景标签 ([`LabelSpec::is_background`]),
/// 包含背景的组合区域保留. 没有剩余通道时返回 `C = 0` 的空栈.
pub fn one_hot_encode(seg: ArrayView3<'_, u8>, specs: &[LabelSpec], skip_background: bool) -> Array4<u8> {
    let (z, h, w) = seg.dim();
    let kept: Vec<&LabelSpec> = specs
        .iter()
        .filter(|s| !(skip_background && s.is_background()))
        .collect();

    let mut ans = Array4::<u8>::zeros((kept.len(), z, h, w));
    for (spec, mut channel) in kept.into_iter().zip(ans.axis_iter_mut(Axis(0))) {
        let lut = spec.lut();
        channel.zip_mut_with(&seg, |dst, src| *dst = lut[*src as usize]);
    }
    ans
}

/// 按区域编码, 同时返回与通道一一对应的区域名.
pub fn one_hot_regions(
    seg: ArrayView3<'_, u8>,
    regions: &[Region],
    skip_background: bool,
) -> (Vec<String>, Array4<u8>) {
    let kept: Vec<&Region> = regions
        .iter()
        .filter(|r| !(skip_background && r.spec.is_background()))
        .collect();
    let specs: Vec<LabelSpec> = kept.iter().map(|r| r.spec.clone()).collect();
    let names = kept.into_iter().map(|r| r.name.clone()).collect();
    (names, one_hot_encode(seg, &specs, false))
}

/// 逐体素取通道最大值 (相同时取靠前者) 对应的标签, 是 [`one_hot_encode`] 的逆操作.
///
/// `labels[c]` 为第 `c` 个通道对应的标签. 长度不一致或通道为空时 panic.
pub fn argmax_decode(stack: ArrayView4<'_, u8>, labels: &[u8]) -> Array3<u8> {
    let (c, z, h, w) = stack.dim();
    assert!(c > 0 && c == labels.len(), "通道个数与标签个数不一致");

    let mut ans = Array3::<u8>::from_elem((z, h, w), labels[0]);
    let mut best = stack.index_axis(Axis(0), 0).to_owned();
    for (k, channel) in stack.axis_iter(Axis(0)).enumerate().skip(1) {
        ndarray::Zip::from(&mut ans)
            .and(&mut best)
            .and(&channel)
            .for_each(|dst, b, v| {
                if *v > *b {
                    *b = *v;
                    *dst = labels[k];
                }
            });
    }
    ans
}
