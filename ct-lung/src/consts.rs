//! 通用常量.

/// 分割输出的标签值.
pub mod label {
    /// 背景 (体外空气) 的标签值.
    pub const BACKGROUND: u8 = 0;

    /// 躯干的标签值.
    pub const BODY: u8 = 1;

    /// 肺部 (含主气道) 的标签值.
    pub const LUNG: u8 = 2;

    /// 左右肺分离时, 第二个肺连通域的标签值.
    pub const LUNG_SECOND: u8 = 3;

    /// 像素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, BACKGROUND)
    }

    /// 像素是否是躯干?
    #[inline]
    pub const fn is_body(p: u8) -> bool {
        matches!(p, BODY)
    }

    /// 像素是否是肺部 (任一连通域)?
    #[inline]
    pub const fn is_lung(p: u8) -> bool {
        matches!(p, LUNG | LUNG_SECOND)
    }
}

/// Otsu 阈值选取使用的直方图 bin 个数.
pub const HISTOGRAM_BINS: usize = 200;

/// 肺/气道分离启发式的体积比阈值.
///
/// 气体连通域按体积降序排列后 (最大者为体外背景), 若第三大连通域的实际体积
/// 不小于第二大者的该比例, 则认为左右肺各自成域; 否则第三大者按噪声处理,
/// 双肺合并在第二大连通域中.
///
/// 参考论文: Hu et al., "Automatic Lung Segmentation for Accurate Quantitation
/// of Volumetric X-Ray CT Images", IEEE-TMI 20(6):490-498, 2001.
/// 该常数沿用论文流程的经验值, 本库不另行推导.
pub const LUNG_SPLIT_RATIO: f64 = 0.75;

/// 椒盐修复阶段的最小区域实际面积, 以平方毫米为单位.
/// 实际像素个数阈值由该值除以切片像素面积后四舍五入得到.
pub const SALT_PEPPER_MIN_AREA_MM2: f64 = 25.0;
