use std::ops::{Index, IndexMut};
use std::path::Path;

use ndarray::{Array3, Array4, ArrayView, ArrayViewMut, Axis, Ix3, Ix4};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::error::FieldError;
use crate::Idx3d;

pub mod slice;

pub use slice::{LabelSlice, LabelSliceMut};

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 将 (W, H, z) 转换成 (z, H, W). 以后均按照该模式访问.
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    // [W, H, z]. 体素个数数组.
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 根据 (z, H, W) 形状和体素分辨率拼装一个最小可用的 header.
/// 仅供 `fake_*` 构造器使用.
fn fake_header(shape: Idx3d, pix_dim_zhw: [f32; 3]) -> BoxedHeader {
    let (z, h, w) = shape;
    let mut header = Box::<NiftiHeader>::default();
    header.dim = [3, w as u16, h as u16, z as u16, 1, 1, 1, 1];
    let [pz, ph, pw] = pix_dim_zhw;
    header.pixdim = [1.0, pw, ph, pz, 1.0, 1.0, 1.0, 1.0];
    header.intent_name[..4].copy_from_slice(b"fake");
    header
}

/// 3D CT nii 文件 header 的共用属性和部分通用操作.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取数据形状大小.
    #[inline]
    fn shape(&self) -> Idx3d {
        get_shape_from_header(self.header())
    }

    /// 获取水平切片个数.
    #[inline]
    fn len_z(&self) -> usize {
        self.shape().0
    }

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (z, h, w) = self.shape();
        z * h * w
    }

    /// 检查索引是否合法.
    #[inline]
    fn check(&self, (z0, h0, w0): &Idx3d) -> bool {
        let (z, h, w) = self.shape();
        *z0 < z && *h0 < h && *w0 < w
    }

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    ///
    /// nifti 约定中无效的 0 分辨率会被替换为 1.
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, w, h, z, ..] = self.header().pixdim;
        let fix = |v: f32| if v == 0.0 { 1.0 } else { v as f64 };
        [fix(z), fix(h), fix(w)]
    }

    /// 获取 width 方向 (自然 2D 图像的水平方向) 体素分辨率, 以毫米为单位.
    #[inline]
    fn width_mm(&self) -> f64 {
        self.pix_dim()[2]
    }

    /// 获取 height 方向 (自然 2D 图像的垂直方向) 体素分辨率, 以毫米为单位.
    #[inline]
    fn height_mm(&self) -> f64 {
        self.pix_dim()[1]
    }

    /// 获取空间方向 (相邻 2D 切片的方向) 体素分辨率, 以毫米为单位.
    #[inline]
    fn z_mm(&self) -> f64 {
        self.pix_dim()[0]
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel(&self) -> f64 {
        self.pix_dim().iter().product()
    }

    /// 获取水平切片方向的像素实际面积值, 以平方毫米为单位.
    #[inline]
    fn slice_pixel(&self) -> f64 {
        self.pix_dim().iter().skip(1).product()
    }

    /// 获取图像原点的物理坐标, 按 (x, y, z) 排列.
    #[inline]
    fn origin(&self) -> [f64; 3] {
        let h = self.header();
        [h.quatern_x as f64, h.quatern_y as f64, h.quatern_z as f64]
    }

    /// 将体素索引变换为物理坐标 (x, y, z).
    ///
    /// 本库假设方向矩阵为恒等, 即物理坐标 = 原点 + 分辨率 * 索引.
    #[inline]
    fn index_to_physical(&self, (z, h, w): Idx3d) -> [f64; 3] {
        let [sz, sh, sw] = self.pix_dim();
        let [ox, oy, oz] = self.origin();
        [ox + sw * w as f64, oy + sh * h as f64, oz + sz * z as f64]
    }

    /// 将物理坐标 (x, y, z) 变换为最邻近体素索引. 落在图像外时返回 `None`.
    fn physical_to_nearest_index(&self, p: &[f64; 3]) -> Option<Idx3d> {
        let [sz, sh, sw] = self.pix_dim();
        let [ox, oy, oz] = self.origin();
        let iw = ((p[0] - ox) / sw).round();
        let ih = ((p[1] - oy) / sh).round();
        let iz = ((p[2] - oz) / sz).round();
        if iw < 0.0 || ih < 0.0 || iz < 0.0 {
            return None;
        }
        let pos = (iz as usize, ih as usize, iw as usize);
        self.check(&pos).then_some(pos)
    }
}

/// nii 格式 3D CT 扫描, 包括 header 和 CT 扫描 (HU). HU 值以 `f32` 保存.
#[derive(Debug, Clone)]
pub struct CtScan {
    header: BoxedHeader,
    data: Array3<f32>,
}

impl NiftiHeaderAttr for CtScan {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for CtScan {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl CtScan {
    /// 打开 nii 文件格式的 3D CT 扫描. `path` 为 nii 文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> nifti::Result<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = Box::new(obj.header().clone());

        // [W, H, z] -> [z, H, W].
        // hint: 原第一维向下增长, 原第二维向右增长.
        let data = obj
            .into_volume()
            .into_ndarray::<f32>()?
            .permuted_axes([2, 1, 0].as_slice());

        // The nature of nifti data field layout.
        debug_assert!(data.is_standard_layout());

        // 该操作不会生成 `Err`, 可直接 unwrap.
        let data =
            Array3::<f32>::from_shape_vec(get_shape_from_header(&header), data.into_raw_vec())
                .unwrap();

        Ok(Self { header, data })
    }

    /// 根据裸数据和体素分辨率直接创建 `CtScan` 实体.
    ///
    /// # 参数
    ///
    /// 1. `data` 按照 (z, H, W) 格式存储.
    /// 2. `pix_dim_zhw` 按照 \[z, h, w\] 格式存储, 以毫米为单位.
    ///
    /// # 注意
    ///
    /// 该方法可能会创建不一致的实体, 因此你应仅将其用于实验目的.
    pub fn fake(data: Array3<f32>, pix_dim_zhw: [f32; 3]) -> Self {
        let header = fake_header(data.dim(), pix_dim_zhw);
        Self { header, data }
    }

    /// 以与 `self` 相同的 header 元信息包装一份新的 (z, H, W) 体数据.
    ///
    /// 如果 `data` 形状与 header 不一致, 则程序 panic.
    pub fn replace_data(&self, data: Array3<f32>) -> CtScan {
        assert_eq!(data.dim(), self.shape(), "体数据形状与 header 不一致");
        Self {
            header: self.header.clone(),
            data,
        }
    }

    /// 将扫描写到 `path` 指定的 nii 文件.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> nifti::Result<()> {
        // [z, H, W] -> [W, H, z]. 写出时恢复 nifti 惯用轴序.
        let view = self.data.view().permuted_axes([2, 1, 0]);
        WriterOptions::new(path.as_ref())
            .reference_header(&self.header)
            .write_nifti(&view)?;
        Ok(())
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix3> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut<'_, f32, Ix3> {
        self.data.view_mut()
    }
}

/// nii 格式 3D CT 标注/掩膜, 包括 header 和标签数据. 标签值以 `u8` 保存.
#[derive(Debug, Clone)]
pub struct CtLabel {
    header: BoxedHeader,
    data: Array3<u8>,
}

impl NiftiHeaderAttr for CtLabel {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for CtLabel {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for CtLabel {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl CtLabel {
    /// 打开 nii 文件格式的 3D CT 标注. `path` 为 nii 文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> nifti::Result<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = Box::new(obj.header().clone());

        // [W, H, z] -> [z, H, W].
        let data = obj
            .into_volume()
            .into_ndarray::<u8>()?
            .permuted_axes([2, 1, 0].as_slice());

        // The nature of nifti data field layout.
        debug_assert!(data.is_standard_layout());

        // 该操作不会生成 `Err`, 可直接 unwrap.
        let data =
            Array3::<u8>::from_shape_vec(get_shape_from_header(&header), data.into_raw_vec())
                .unwrap();

        Ok(Self { header, data })
    }

    /// 根据裸标签数据和体素分辨率直接创建 `CtLabel` 实体.
    ///
    /// # 参数
    ///
    /// 1. `data` 按照 (z, H, W) 格式存储.
    /// 2. `pix_dim_zhw` 按照 \[z, h, w\] 格式存储, 以毫米为单位.
    ///
    /// # 注意
    ///
    /// 该方法可能会创建不一致的实体, 因此你应仅将其用于实验目的.
    pub fn fake(data: Array3<u8>, pix_dim_zhw: [f32; 3]) -> Self {
        let header = fake_header(data.dim(), pix_dim_zhw);
        Self { header, data }
    }

    /// 以给定 header 的元信息包装一份 (z, H, W) 标签数据.
    ///
    /// 如果 `data` 形状与 header 不一致, 则程序 panic.
    pub fn with_header(header: &NiftiHeader, data: Array3<u8>) -> Self {
        assert_eq!(
            data.dim(),
            get_shape_from_header(header),
            "标签数据形状与 header 不一致"
        );
        Self {
            header: Box::new(header.clone()),
            data,
        }
    }

    /// 将标注写到 `path` 指定的 nii 文件.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> nifti::Result<()> {
        // [z, H, W] -> [W, H, z].
        let view = self.data.view().permuted_axes([2, 1, 0]);
        WriterOptions::new(path.as_ref())
            .reference_header(&self.header)
            .write_nifti(&view)?;
        Ok(())
    }

    /// 获取 3D 标注 z 空间的第 `z_index` 层不可变切片.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> LabelSlice {
        LabelSlice::new(self.data.index_axis(Axis(0), z_index))
    }

    /// 获取 3D 标注 z 空间的第 `z_index` 层可变切片.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at_mut(&mut self, z_index: usize) -> LabelSliceMut {
        LabelSliceMut::new(self.data.index_axis_mut(Axis(0), z_index))
    }

    /// 获取能按升序迭代 3D 标注水平不可变切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = LabelSlice> {
        self.data.axis_iter(Axis(0)).map(LabelSlice::new)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u8, Ix3> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut<'_, u8, Ix3> {
        self.data.view_mut()
    }

    /// 获取 3D 标注中值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, label: u8) -> usize {
        self.data.iter().filter(|p| **p == label).count()
    }
}

/// nii 格式稠密位移场. 数据以 (分量, z, H, W) 存储,
/// 分量按物理 x/y/z 方向排列, 个数为 2 (平面场) 或 3 (空间场).
#[derive(Debug, Clone)]
pub struct DeformationField {
    header: BoxedHeader,
    data: Array4<f32>,
}

impl NiftiHeaderAttr for DeformationField {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl DeformationField {
    /// 打开 nii 文件格式的稠密位移场.
    ///
    /// 接受 \[W, H, z, c\] 或 \[W, H, z, 1, c\] (nifti 向量惯例, 时间维为 1)
    /// 两种布局, c 必须为 2 或 3.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FieldError> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = Box::new(obj.header().clone());

        let nd = obj.into_volume().into_ndarray::<f32>()?;
        let nd = match nd.ndim() {
            // [W, H, z, 1, c] -> [W, H, z, c]. 丢弃时间维.
            5 => nd.index_axis_move(Axis(3), 0),
            4 => nd,
            _ => return Err(FieldError::BadShape(nd.shape().to_vec())),
        };
        let shape = nd.shape().to_vec();
        let nd = nd
            .into_dimensionality::<Ix4>()
            .map_err(|_| FieldError::BadShape(shape.clone()))?;
        if !(2..=3).contains(&nd.dim().3) {
            return Err(FieldError::BadShape(shape));
        }

        // [W, H, z, c] -> [c, z, H, W].
        let data = nd.permuted_axes([3, 2, 1, 0]);
        let data = data.as_standard_layout().into_owned();

        Ok(Self { header, data })
    }

    /// 根据裸数据直接创建位移场实体.
    ///
    /// # 参数
    ///
    /// 1. `data` 按照 (分量, z, H, W) 格式存储, 分量个数为 2 或 3.
    /// 2. `pix_dim_zhw` 按照 \[z, h, w\] 格式存储, 以毫米为单位.
    /// 3. `origin_xyz` 为图像原点物理坐标.
    ///
    /// # 注意
    ///
    /// 该方法可能会创建不一致的实体, 因此你应仅将其用于实验目的.
    pub fn fake(data: Array4<f32>, pix_dim_zhw: [f32; 3], origin_xyz: [f32; 3]) -> Self {
        let (c, z, h, w) = data.dim();
        assert!((2..=3).contains(&c), "位移分量个数必须为 2 或 3");
        let mut header = fake_header((z, h, w), pix_dim_zhw);
        header.dim = [5, w as u16, h as u16, z as u16, 1, c as u16, 1, 1];
        let [ox, oy, oz] = origin_xyz;
        (header.quatern_x, header.quatern_y, header.quatern_z) = (ox, oy, oz);
        Self { header, data }
    }

    /// 位移分量个数 (2 或 3).
    #[inline]
    pub fn components(&self) -> usize {
        self.data.dim().0
    }

    /// 获取 `pos` 处的位移向量, 不足 3 个分量时高位补 0.
    ///
    /// 当 `pos` 越界时 panic.
    #[inline]
    pub fn displacement(&self, (z, h, w): Idx3d) -> [f64; 3] {
        let mut d = [0.0; 3];
        for (c, slot) in d.iter_mut().enumerate().take(self.components()) {
            *slot = self.data[[c, z, h, w]] as f64;
        }
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn float_eq(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn fake_header_geometry() {
        let scan = CtScan::fake(Array3::zeros((4, 8, 16)), [2.5, 0.7, 0.8]);
        assert_eq!(scan.shape(), (4, 8, 16));
        assert_eq!(scan.len_z(), 4);
        assert_eq!(scan.size(), 4 * 8 * 16);
        // pixdim 以 f32 保存, 期望值同样经过 f32 舍入.
        let [pz, ph, pw] = [2.5f32 as f64, 0.7f32 as f64, 0.8f32 as f64];
        float_eq(scan.z_mm(), pz);
        float_eq(scan.height_mm(), ph);
        float_eq(scan.width_mm(), pw);
        float_eq(scan.voxel(), pz * ph * pw);
        float_eq(scan.slice_pixel(), ph * pw);
    }

    #[test]
    fn physical_round_trip() {
        let mut field = Array4::<f32>::zeros((3, 2, 4, 4));
        field[[0, 0, 0, 0]] = 1.0;
        let field = DeformationField::fake(field, [2.0, 1.0, 1.0], [10.0, -5.0, 0.0]);

        let p = field.index_to_physical((1, 2, 3));
        float_eq(p[0], 10.0 + 3.0);
        float_eq(p[1], -5.0 + 2.0);
        float_eq(p[2], 2.0);
        assert_eq!(field.physical_to_nearest_index(&p), Some((1, 2, 3)));

        // 栅格外没有最邻近体素.
        assert_eq!(field.physical_to_nearest_index(&[9.0, -5.0, 0.0]), None);
        assert_eq!(field.physical_to_nearest_index(&[10.0, -5.0, 9.0]), None);

        // 半体素以内四舍五入到同一索引.
        let q = [p[0] + 0.4, p[1] - 0.4, p[2] + 0.9];
        assert_eq!(field.physical_to_nearest_index(&q), Some((1, 2, 3)));
    }

    #[test]
    fn displacement_pads_missing_components() {
        let mut data = Array4::<f32>::zeros((2, 1, 2, 2));
        data[[0, 0, 1, 1]] = 3.0;
        data[[1, 0, 1, 1]] = -2.0;
        let field = DeformationField::fake(data, [1.0, 1.0, 1.0], [0.0; 3]);
        assert_eq!(field.components(), 2);
        assert_eq!(field.displacement((0, 1, 1)), [3.0, -2.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "体数据形状与 header 不一致")]
    fn replace_data_checks_shape() {
        let scan = CtScan::fake(Array3::zeros((2, 3, 4)), [1.0; 3]);
        let _ = scan.replace_data(Array3::zeros((2, 4, 3)));
    }

    #[test]
    fn label_count_and_slices() {
        let mut data = Array3::<u8>::zeros((2, 3, 3));
        data[(0, 1, 1)] = 2;
        data[(1, 0, 2)] = 2;
        let label = CtLabel::fake(data, [1.0; 3]);
        assert_eq!(label.count(2), 2);
        assert_eq!(label.slice_at(0).count(2), 1);
        assert_eq!(label.slice_iter().map(|s| s.count(2)).sum::<usize>(), 2);
    }
}
