#![warn(missing_docs)]

//! 核心库. 提供肺部 3D CT nii 文件的结构化容器和四条批处理管线的基础算法.
//!
//! 该 crate 目前仅提供 `safe` 接口. 在非期望情况下, 程序会直接 panic,
//! 而不会导致内存错误. As what Rust promises.
//!
//! # 功能
//!
//! ### 肺部初始分割 ✅
//!
//! 掩膜内强度统计, 200-bin 直方图 Otsu 阈值, 6-邻接连通域标记与按体积重标号,
//! 躯干/肺/背景三值重映射, 以及逐切片的闭运算 + 腔体填充 + 椒盐修复.
//!
//! 实现位于 `ct-lung/src/{threshold, components, post_proc}`.
//!
//! ### 标签轮廓提取 ✅
//!
//! 2D / 3D / 逐切片三种模式, 可选全连通邻接.
//!
//! 实现位于 `ct-lung/src/contour.rs`.
//!
//! ### 多层级 B 样条曲线拟合 ✅
//!
//! 有序标记点按累积弦长参数化, 逐层加密控制点逼近残差, 均匀重采样输出.
//!
//! 实现位于 `ct-lung/src/fitting`.
//!
//! ### 形变场标记点对导出 ✅
//!
//! 稠密位移场按栅格序采样, 经掩膜过滤后写出带哨兵行的
//! Fixed/Moving 平行文本文件.
//!
//! 实现位于 `ct-lung/src/{field, landmarks}`.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 3D CT nii 文件基础数据结构.
mod data;

pub use data::{
    CtLabel, CtScan, DeformationField, LabelSlice, LabelSliceMut, NiftiHeaderAttr,
};

pub mod components;
pub mod consts;
pub mod contour;
pub mod error;
pub mod field;
pub mod fitting;
pub mod landmarks;
pub mod post_proc;
pub mod prelude;
pub mod threshold;
