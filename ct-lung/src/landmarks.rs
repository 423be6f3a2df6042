//! 标记点文件读取与弦长参数化.
//!
//! 标记点文件为纯文本, 每行一个点, 字段以逗号或空白分隔.
//! 每行允许 `dim` 个坐标字段, 或 `dim + 1` 个字段 (末列为权重).
//! 空行与行尾多余的分隔符被忽略.

use std::fs;
use std::path::Path;

use itertools::Itertools;
use num::Float;

use crate::error::LandmarkError;

/// 欧氏距离. 两个点的维度必须一致, 否则程序 panic.
#[inline]
pub fn euclid<T: Float>(a: &[T], b: &[T]) -> T {
    assert_eq!(a.len(), b.len(), "点的维度不一致");
    a.iter()
        .zip(b)
        .map(|(&x, &y)| (x - y) * (x - y))
        .fold(T::zero(), |acc, d| acc + d)
        .sqrt()
}

/// 一组有序的带权标记点.
#[derive(Debug, Clone)]
pub struct LandmarkSet {
    /// 按文件行序排列的点坐标, 各点维度一致.
    pub points: Vec<Vec<f64>>,

    /// 与 `points` 平行的权重, 缺省为 1.
    pub weights: Vec<f64>,
}

impl LandmarkSet {
    /// 点的个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 是否不含任何点.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 点的坐标维度.
    ///
    /// 对空集合返回 0.
    #[inline]
    pub fn dim(&self) -> usize {
        self.points.first().map_or(0, Vec::len)
    }

    /// 按累积弦长将各点参数化到闭区间 \[0, 1\].
    ///
    /// 首点参数恒为 0, 末点恒为 1. 当所有点重合 (总弦长为 0) 时退化为均匀参数.
    /// 点数不足 2 时程序 panic.
    pub fn chord_parameters(&self) -> Vec<f64> {
        assert!(self.len() >= 2, "弦长参数化至少需要 2 个点");
        let mut acc = Vec::with_capacity(self.len());
        acc.push(0.0);
        for (a, b) in self.points.iter().tuple_windows() {
            let d = euclid(a.as_slice(), b.as_slice());
            acc.push(acc.last().unwrap() + d);
        }
        let total = *acc.last().unwrap();
        if total == 0.0 {
            let n = self.len() - 1;
            return (0..=n).map(|i| i as f64 / n as f64).collect();
        }
        acc.iter_mut().for_each(|t| *t /= total);
        // 消除浮点累积误差, 保证末点参数精确为 1.
        *acc.last_mut().unwrap() = 1.0;
        acc
    }
}

/// 将一行切分为字段. 逗号与空白都是合法分隔符, 连续分隔符不产生空字段.
#[inline]
fn split_fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|tok| !tok.is_empty())
}

/// 从文本文件读取 `dim` 维标记点集.
///
/// 行号从 1 开始计数; 不含任何点的文件产生 [`LandmarkError::Empty`].
pub fn read_landmarks<P: AsRef<Path>>(path: P, dim: usize) -> Result<LandmarkSet, LandmarkError> {
    let text = fs::read_to_string(path)?;
    let mut points = Vec::new();
    let mut weights = Vec::new();

    for (lineno, line) in text.lines().enumerate() {
        let lineno = lineno + 1;
        let fields: Vec<&str> = split_fields(line).collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != dim && fields.len() != dim + 1 {
            return Err(LandmarkError::WrongColumnCount(lineno, dim, fields.len()));
        }

        let mut values = Vec::with_capacity(fields.len());
        for (col, tok) in fields.iter().enumerate() {
            let v: f64 = tok
                .parse()
                .map_err(|_| LandmarkError::BadNumber(lineno, col + 1))?;
            values.push(v);
        }
        let weight = if values.len() == dim + 1 {
            values.pop().unwrap()
        } else {
            1.0
        };
        points.push(values);
        weights.push(weight);
    }

    if points.is_empty() {
        return Err(LandmarkError::Empty);
    }
    Ok(LandmarkSet { points, weights })
}
