//! 多层级均匀 B 样条曲线逼近.
//!
//! 算法为 multilevel B-spline approximation (Lee, Wolberg, Shin,
//! "Scattered Data Interpolation with Multilevel B-Splines", IEEE-TVCG 1997):
//! 第 0 层以粗控制格点逼近带权标记点, 之后每层将控制格点加密一倍并逼近
//! 上一层的残差. 曲线取各层之和, 层数越多对标记点的复现越精确.
//!
//! 参数域为闭区间 \[0, 1\], 值域维度任意. 支持首尾相接的闭合曲线.

use ndarray::Array2;

use crate::error::FitError;
use crate::landmarks::LandmarkSet;

/// 拟合参数.
#[derive(Debug, Clone, Copy)]
pub struct FitParams {
    /// 样条阶 (即次数). 3 为三次样条.
    pub order: usize,

    /// 层级个数, 至少为 1.
    pub levels: usize,

    /// 第 0 层的控制点个数, 不得小于 `order + 1`.
    pub control_points: usize,

    /// 曲线是否首尾闭合.
    pub closed: bool,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            order: 3,
            levels: 5,
            control_points: 4,
            closed: false,
        }
    }
}

/// 一条拟合完成的多层级 B 样条曲线.
#[derive(Debug, Clone)]
pub struct BSplineCurve {
    order: usize,
    closed: bool,
    dim: usize,

    /// 每层一张控制格点表, 形状 (控制点数, 值域维度).
    lattices: Vec<Array2<f64>>,
}

/// 均匀 B 样条的非零基函数值. `t` 为 span 内局部参数, 取值 \[0, 1\].
///
/// 返回 `order + 1` 个值, 第 `j` 个对应 span 起点向后第 `j` 个控制点.
fn basis(order: usize, t: f64) -> Vec<f64> {
    let mut b = vec![0.0; order + 1];
    b[0] = 1.0;
    for j in 1..=order {
        let mut saved = 0.0;
        for (r, slot) in b.iter_mut().enumerate().take(j) {
            // 均匀结点下相邻结点距离恒为 1, 分母恒为 j.
            let left = t + (j - 1 - r) as f64;
            let right = (r + 1) as f64 - t;
            let tmp = *slot / j as f64;
            *slot = saved + right * tmp;
            saved = left * tmp;
        }
        b[j] = saved;
    }
    b
}

/// 将全局参数 `u` 定位到 (span 下标, span 内局部参数).
///
/// `u = 1` 落在最后一个 span 的右端点.
#[inline]
fn locate(u: f64, nspans: usize) -> (usize, f64) {
    let x = u * nspans as f64;
    let span = (x.floor().max(0.0) as usize).min(nspans - 1);
    (span, x - span as f64)
}

/// 单层 BA (B-spline approximation) 更新: 每个标记点把局部最优控制点增量
/// 按基函数平方加权累加, 最后归一化.
fn fit_level(
    u: &[f64],
    residual: &[Vec<f64>],
    weights: &[f64],
    ncps: usize,
    order: usize,
    closed: bool,
    dim: usize,
) -> Array2<f64> {
    let nspans = if closed { ncps } else { ncps - order };
    let mut num = Array2::<f64>::zeros((ncps, dim));
    let mut den = vec![0.0f64; ncps];

    for ((&uk, r), &w) in u.iter().zip(residual).zip(weights) {
        let (span, t) = locate(uk, nspans);
        let b = basis(order, t);
        let bsq: f64 = b.iter().map(|x| x * x).sum();
        debug_assert!(bsq > 0.0);

        for (j, &bj) in b.iter().enumerate() {
            let idx = if closed { (span + j) % ncps } else { span + j };
            den[idx] += w * bj * bj;
            for d in 0..dim {
                // phi = bj * r / sum(b^2), 以 w * bj^2 加权.
                num[[idx, d]] += w * bj * bj * (bj * r[d] / bsq);
            }
        }
    }

    let mut lattice = Array2::<f64>::zeros((ncps, dim));
    for (i, &d0) in den.iter().enumerate() {
        if d0 > 0.0 {
            for d in 0..dim {
                lattice[[i, d]] = num[[i, d]] / d0;
            }
        }
    }
    lattice
}

impl BSplineCurve {
    /// 样条阶.
    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// 值域维度.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// 层级个数.
    #[inline]
    pub fn levels(&self) -> usize {
        self.lattices.len()
    }

    /// 曲线是否首尾闭合.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// 单层求值.
    fn eval_level(&self, level: usize, u: f64) -> Vec<f64> {
        let lattice = &self.lattices[level];
        let ncps = lattice.nrows();
        let nspans = if self.closed { ncps } else { ncps - self.order };
        let (span, t) = locate(u, nspans);
        let b = basis(self.order, t);

        let mut acc = vec![0.0; self.dim];
        for (j, &bj) in b.iter().enumerate() {
            let idx = if self.closed {
                (span + j) % ncps
            } else {
                span + j
            };
            for (d, slot) in acc.iter_mut().enumerate() {
                *slot += bj * lattice[[idx, d]];
            }
        }
        acc
    }

    /// 在参数 `u` 处求值. `u` 会被压到闭区间 \[0, 1\].
    pub fn eval(&self, u: f64) -> Vec<f64> {
        let u = u.clamp(0.0, 1.0);
        let mut acc = vec![0.0; self.dim];
        for level in 0..self.levels() {
            for (slot, v) in acc.iter_mut().zip(self.eval_level(level, u)) {
                *slot += v;
            }
        }
        acc
    }

    /// 以参数步长 `spacing` 对曲线均匀采样.
    ///
    /// 采样点个数为 `round(1 / spacing) + 1`, 首点位于 `u = 0`, 末点位于
    /// `u = 1`. 要求 `0 < spacing <= 1`, 否则程序 panic.
    pub fn sample(&self, spacing: f64) -> Vec<Vec<f64>> {
        assert!(spacing > 0.0 && spacing <= 1.0, "非法采样步长");
        let n = (1.0 / spacing).round() as usize + 1;
        (0..n)
            .map(|i| self.eval((i as f64 * spacing).min(1.0)))
            .collect()
    }
}

/// 以 `params` 对有序标记点集做多层级 B 样条曲线拟合.
///
/// 标记点先按累积弦长参数化 (见 [`LandmarkSet::chord_parameters`]),
/// 再逐层逼近. 点数少于 2 或各点维度不一致时返回 `Err`.
pub fn fit_bspline_curve(set: &LandmarkSet, params: &FitParams) -> Result<BSplineCurve, FitError> {
    assert!(params.order >= 1, "样条阶至少为 1");
    assert!(params.levels >= 1, "层级个数至少为 1");
    assert!(
        params.control_points > params.order,
        "控制点个数必须大于样条阶"
    );

    if set.len() < 2 {
        return Err(FitError::TooFewPoints(set.len(), 2));
    }
    let dim = set.dim();
    if set.points.iter().any(|p| p.len() != dim) {
        return Err(FitError::DimensionMismatch);
    }

    let u = set.chord_parameters();
    let mut residual = set.points.clone();
    let mut curve = BSplineCurve {
        order: params.order,
        closed: params.closed,
        dim,
        lattices: Vec::with_capacity(params.levels),
    };

    let mut ncps = params.control_points;
    for level in 0..params.levels {
        curve.lattices.push(fit_level(
            &u,
            &residual,
            &set.weights,
            ncps,
            params.order,
            params.closed,
            dim,
        ));

        if level + 1 < params.levels {
            for (&uk, r) in u.iter().zip(residual.iter_mut()) {
                for (slot, v) in r.iter_mut().zip(curve.eval_level(level, uk)) {
                    *slot -= v;
                }
            }
            // 控制格点加密一倍.
            ncps = if params.closed {
                ncps * 2
            } else {
                ncps * 2 - params.order
            };
        }
    }
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(points: Vec<Vec<f64>>) -> LandmarkSet {
        let weights = vec![1.0; points.len()];
        LandmarkSet { points, weights }
    }

    fn dist(a: &[f64], b: &[f64]) -> f64 {
        crate::landmarks::euclid(a, b)
    }

    #[test]
    fn basis_is_a_partition_of_unity() {
        for order in 1..=4 {
            for i in 0..=10 {
                let t = i as f64 / 10.0;
                let b = basis(order, t);
                assert_eq!(b.len(), order + 1);
                let sum: f64 = b.iter().sum();
                assert!((sum - 1.0).abs() < 1e-12, "order {order}, t {t}: {sum}");
                assert!(b.iter().all(|&v| v >= -1e-12));
            }
        }
    }

    #[test]
    fn cubic_basis_at_knot() {
        let b = basis(3, 0.0);
        assert!((b[0] - 1.0 / 6.0).abs() < 1e-12);
        assert!((b[1] - 4.0 / 6.0).abs() < 1e-12);
        assert!((b[2] - 1.0 / 6.0).abs() < 1e-12);
        assert!(b[3].abs() < 1e-12);
    }

    #[test]
    fn isolated_landmarks_are_reproduced() {
        // 最细层 16 个 span, 三个标记点彼此相距超过 order 个 span,
        // 残差在最细层被精确消去.
        let s = set(vec![vec![0.0, 0.0], vec![1.0, 2.0], vec![2.0, 0.0]]);
        let curve = fit_bspline_curve(&s, &FitParams::default()).unwrap();
        let t = s.chord_parameters();
        for (uk, p) in t.iter().zip(&s.points) {
            let v = curve.eval(*uk);
            assert!(dist(&v, p) < 1e-9, "u = {uk}: {v:?} vs {p:?}");
        }
    }

    #[test]
    fn sample_count_follows_spacing() {
        let s = set(vec![vec![0.0], vec![1.0]]);
        let curve = fit_bspline_curve(&s, &FitParams::default()).unwrap();
        assert_eq!(curve.sample(0.01).len(), 101);
        assert_eq!(curve.sample(0.001).len(), 1001);
        assert_eq!(curve.sample(1.0).len(), 2);
    }

    #[test]
    fn square_polyline_stays_bounded() {
        let s = set(vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 1.0],
        ]);
        // 多层细化在拐角附近会轻微过冲, 因此默认参数只要求落在点集附近.
        let curve = fit_bspline_curve(&s, &FitParams::default()).unwrap();
        for p in curve.sample(0.01) {
            assert!(p.iter().all(|&c| (-0.5..=1.5).contains(&c)), "{p:?}");
        }

        // 单层粗拟合不产生过冲, 严格落在点集坐标范围内, 且采样序列连续.
        let coarse = FitParams {
            levels: 1,
            ..Default::default()
        };
        let curve = fit_bspline_curve(&s, &coarse).unwrap();
        let samples = curve.sample(0.01);
        assert!(samples
            .iter()
            .all(|p| p.iter().all(|&c| (0.0..=1.0).contains(&c))));
        for win in samples.windows(2) {
            assert!(dist(&win[0], &win[1]) < 0.2);
        }
    }

    #[test]
    fn closed_curve_is_periodic() {
        let s = set(vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 1.0],
            vec![0.0, 0.0],
        ]);
        let params = FitParams {
            closed: true,
            ..Default::default()
        };
        let curve = fit_bspline_curve(&s, &params).unwrap();
        assert!(curve.is_closed());
        let a = curve.eval(0.0);
        let b = curve.eval(1.0);
        assert!(dist(&a, &b) < 1e-12, "{a:?} vs {b:?}");
    }

    #[test]
    fn too_few_points_is_rejected() {
        let s = set(vec![vec![1.0, 2.0]]);
        assert!(matches!(
            fit_bspline_curve(&s, &FitParams::default()),
            Err(FitError::TooFewPoints(1, 2))
        ));
    }

    #[test]
    fn mixed_dimensions_are_rejected() {
        let s = set(vec![vec![0.0, 0.0], vec![1.0]]);
        assert!(matches!(
            fit_bspline_curve(&s, &FitParams::default()),
            Err(FitError::DimensionMismatch)
        ));
    }
}
