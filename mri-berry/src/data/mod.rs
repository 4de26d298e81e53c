use std::ops::Index;
use std::path::Path;

use log::warn;
use ndarray::{Array3, ArrayD, ArrayView, Ix3};
use nifti::{InMemNiftiVolume, IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::consts::label::BACKGROUND;
use crate::{Idx3d, Result};

pub mod bbox;
pub mod window;

pub use bbox::BoundingBox;
pub use window::IntensityWindow;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 单个体素在 (axial, coronal, sagittal) 三个方向上的物理尺寸, 一般以毫米为单位.
///
/// 与体数据的轴序一致. 缺省值为各向同性的 `(1, 1, 1)`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Spacing(pub [f64; 3]);

impl Default for Spacing {
    #[inline]
    fn default() -> Self {
        Self([1.0; 3])
    }
}

impl Spacing {
    /// 直接构建. 不做任何检查.
    #[inline]
    pub const fn new(axial: f64, coronal: f64, sagittal: f64) -> Self {
        Self([axial, coronal, sagittal])
    }

    /// 从可能不合法的原始值构建.
    ///
    /// 非有限或非正的分量会被替换为 `1.0`, 并打印警告.
    pub fn sanitized(raw: [f64; 3]) -> Self {
        let mut ans = raw;
        for v in ans.iter_mut() {
            if !(v.is_finite() && *v > 0.0) {
                warn!("Invalid voxel spacing {raw:?}, falling back to 1.0 on that axis");
                *v = 1.0;
            }
        }
        Self(ans)
    }

    /// 获取三个方向的分量.
    #[inline]
    pub fn as_array(&self) -> [f64; 3] {
        self.0
    }

    /// 单个体素的物理体积.
    #[inline]
    pub fn voxel_volume(&self) -> f64 {
        self.0.iter().product()
    }

    /// 将体素坐标逐分量乘以体素尺寸, 得到物理坐标.
    #[inline]
    pub fn scale(&self, [a, c, s]: [f64; 3]) -> [f64; 3] {
        let [pa, pc, ps] = self.0;
        [a * pa, c * pc, s * ps]
    }
}

/// 将 (W, H, z) 转换成 (z, H, W). 以后均按照该模式访问.
///
/// 三个分量依次对应 axial, coronal, sagittal 方向.
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    // [W, H, z]. 体素个数数组.
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 为内存中构建的体数据生成一个最小化的 header.
fn synthetic_header((z, h, w): Idx3d, spacing: Spacing) -> BoxedHeader {
    let mut header = Box::<NiftiHeader>::default();
    header.dim = [3, w as u16, h as u16, z as u16, 1, 1, 1, 1];
    let [sz, sh, sw] = spacing.as_array();
    let [_, pw, ph, pz, ..] = &mut header.pixdim;
    (*pw, *ph, *pz) = (sw as f32, sh as f32, sz as f32);
    header
}

/// 读取 nifti 文件, 返回 header 和尚未转换的体数据.
fn read_raw(path: &Path) -> Result<(BoxedHeader, InMemNiftiVolume)> {
    let obj = ReaderOptions::new().read_file(path)?;
    let header = Box::new(obj.header().clone());
    Ok((header, obj.into_volume()))
}

/// [W, H, z] -> [z, H, W], 并保证标准内存布局.
fn to_standard_3d<T: Clone>(data: ArrayD<T>) -> Result<Array3<T>> {
    // hint: 原第一维向下增长, 原第二维向右增长.
    let data = data
        .permuted_axes([2, 1, 0].as_slice())
        .into_dimensionality::<Ix3>()?;

    // The nature of nifti data field layout.
    let data = if data.is_standard_layout() {
        data
    } else {
        data.as_standard_layout().to_owned()
    };
    debug_assert!(data.is_standard_layout());
    Ok(data)
}

/// 3D 脑部 MRI nii 文件 header 的共用属性和部分通用操作.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取数据形状大小, 即 (axial, coronal, sagittal) 三个方向的体素个数.
    #[inline]
    fn shape(&self) -> Idx3d {
        get_shape_from_header(self.header())
    }

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (z, h, w) = self.shape();
        z * h * w
    }

    /// 获取单个体素分辨率. 三个分量分别代表 axial (相邻切片方向),
    /// coronal (自然图像的垂直方向), sagittal (自然图像的水平方向).
    ///
    /// 非法分量 (非有限, 非正) 以 `1.0` 代替.
    #[inline]
    fn spacing(&self) -> Spacing {
        let [_, w, h, z, ..] = self.header().pixdim;
        Spacing::sanitized([z as f64, h as f64, w as f64])
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel(&self) -> f64 {
        self.spacing().voxel_volume()
    }
}

/// nii 格式 3D MRI 序列 (如 T1, T1ce, T2, FLAIR), 包括 header 和强度值. 强度以 `f32` 保存.
#[derive(Debug, Clone)]
pub struct MriScan {
    header: BoxedHeader,
    data: Array3<f32>,
}

impl NiftiHeaderAttr for MriScan {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for MriScan {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl MriScan {
    /// 打开 nii 文件格式的 3D MRI 序列. `path` 为 nii 文件的本地路径
    /// (`.nii` 或 `.nii.gz`). 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (header, volume) = read_raw(path.as_ref())?;
        let data = to_standard_3d(volume.into_ndarray::<f32>()?)?;
        Ok(Self { header, data })
    }

    /// 根据内存中的数据直接创建 `MriScan`.
    ///
    /// `data` 按照 (axial, coronal, sagittal) 组织.
    /// 任一维度超出 `u16` 表示范围时程序 panic.
    pub fn from_array(data: Array3<f32>, spacing: Spacing) -> Self {
        let (z, h, w) = data.dim();
        assert!(
            [z, h, w].iter().all(|d| *d <= u16::MAX as usize),
            "体数据维度超出 nifti 表示范围"
        );
        let header = synthetic_header((z, h, w), spacing);
        Self { header, data }
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix3> {
        self.data.view()
    }

    /// 收集所有严格为正的强度值, 按行优先存储. 这是一阶统计特征的标准输入.
    pub fn positive_values(&self) -> Vec<f64> {
        self.data
            .iter()
            .filter(|v| **v > 0.0)
            .map(|v| *v as f64)
            .collect()
    }
}

/// nii 格式 3D 分割标注, 包括 header 和标签. 标签值以 `u8` 保存.
#[derive(Debug, Clone)]
pub struct MriLabel {
    header: BoxedHeader,
    data: Array3<u8>,
}

impl NiftiHeaderAttr for MriLabel {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for MriLabel {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl MriLabel {
    /// 打开 nii 文件格式的 3D 分割标注. `path` 为 nii 文件的本地路径. 如果打开成功,
    /// 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (header, volume) = read_raw(path.as_ref())?;
        let data = to_standard_3d(volume.into_ndarray::<u8>()?)?;
        Ok(Self { header, data })
    }

    /// 根据内存中的标签数据直接创建 `MriLabel`.
    ///
    /// `data` 按照 (axial, coronal, sagittal) 组织.
    /// 任一维度超出 `u16` 表示范围时程序 panic.
    pub fn from_array(data: Array3<u8>, spacing: Spacing) -> Self {
        let (z, h, w) = data.dim();
        assert!(
            [z, h, w].iter().all(|d| *d <= u16::MAX as usize),
            "体数据维度超出 nifti 表示范围"
        );
        let header = synthetic_header((z, h, w), spacing);
        Self { header, data }
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u8, Ix3> {
        self.data.view()
    }

    /// 获取 3D 标注中值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, label: u8) -> usize {
        self.data.iter().filter(|p| **p == label).count()
    }

    /// 获取所有非背景体素的个数.
    #[inline]
    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|p| **p != BACKGROUND).count()
    }

    /// 按标签值统计体素个数. 返回值以标签值为下标.
    pub fn histogram(&self) -> [usize; 256] {
        let mut ans = [0; 256];
        for pixel in self.data.iter() {
            ans[*pixel as usize] += 1;
        }
        ans
    }

    /// 按照 `(原标签, 新标签)` 规则批量替换标签. 未出现在规则中的标签保持不变.
    ///
    /// 内部使用 256 项查找表, 每个体素只访问一次, 因此规则之间不会级联.
    /// 同一原标签出现多次时以最后一条为准. 返回总共被改写的体素个数.
    pub fn remap(&mut self, rules: &[(u8, u8)]) -> usize {
        let mut lut: [u8; 256] = std::array::from_fn(|i| i as u8);
        for &(from, to) in rules {
            lut[from as usize] = to;
        }

        let mut cnt = 0usize;
        for p in self.data.iter_mut() {
            let new = lut[*p as usize];
            if new != *p {
                cnt += 1;
                *p = new;
            }
        }
        cnt
    }
}
