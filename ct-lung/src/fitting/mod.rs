//! 曲线拟合.

mod bspline;

pub use bspline::{fit_bspline_curve, BSplineCurve, FitParams};
