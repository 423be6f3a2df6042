//! 运行时错误.

use std::fmt;

/// 标记点文件解析错误.
///
/// 原始流程对残缺行不做校验, 会静默产生部分未初始化的点;
/// 这里将其改为显式错误.
#[derive(Debug)]
pub enum LandmarkError {
    /// 底层 I/O 错误.
    Io(std::io::Error),

    /// 某一行的数值字段无法解析. 参数依次为行号与列号 (均从 1 开始).
    BadNumber(usize, usize),

    /// 某一行的字段个数不符. 参数依次为行号, 期望的坐标维度与实际字段个数
    /// (合法的字段个数为维度本身, 或维度 + 1 个权重列).
    WrongColumnCount(usize, usize, usize),

    /// 文件中不存在任何标记点.
    Empty,
}

impl fmt::Display for LandmarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "landmark file i/o error: {e}"),
            Self::BadNumber(line, col) => {
                write!(f, "line {line}, field {col}: not a number")
            }
            Self::WrongColumnCount(line, dim, found) => write!(
                f,
                "line {line}: expected {dim} coordinates (plus an optional weight), found {found} fields"
            ),
            Self::Empty => write!(f, "no landmark points in file"),
        }
    }
}

impl std::error::Error for LandmarkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LandmarkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// 曲线拟合的运行时错误.
#[derive(Debug, Clone)]
pub enum FitError {
    /// 标记点不足以做实际拟合工作.
    ///
    /// 第一个参数代表目前已有的点, 第二个参数代表实际拟合需要的最少点数.
    TooFewPoints(usize, usize),

    /// 各标记点的维度不一致.
    DimensionMismatch,
}

impl fmt::Display for FitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewPoints(found, need) => {
                write!(f, "need at least {need} points, found {found}")
            }
            Self::DimensionMismatch => write!(f, "landmark dimensions are inconsistent"),
        }
    }
}

impl std::error::Error for FitError {}

/// 形变场读取错误.
#[derive(Debug)]
pub enum FieldError {
    /// 底层 nifti 错误.
    Nifti(nifti::NiftiError),

    /// 数据维度无法解释为稠密向量场.
    BadShape(Vec<usize>),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nifti(e) => write!(f, "nifti error: {e}"),
            Self::BadShape(shape) => {
                write!(f, "cannot interpret volume of shape {shape:?} as a vector field")
            }
        }
    }
}

impl std::error::Error for FieldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Nifti(e) => Some(e),
            _ => None,
        }
    }
}

impl From<nifti::NiftiError> for FieldError {
    fn from(e: nifti::NiftiError) -> Self {
        Self::Nifti(e)
    }
}
