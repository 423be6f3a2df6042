//! 2D / 3D 连通域标记与按体积重标号.

use std::cmp::Reverse;
use std::collections::VecDeque;

use ndarray::{Array2, Array3, ArrayView2, ArrayView3};

use crate::{Idx2d, Idx3d};

/// 平面邻接规则.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity2d {
    /// 上下左右 4-邻接.
    #[default]
    Four,

    /// 含对角的 8-邻接.
    Eight,
}

/// 空间邻接规则.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity3d {
    /// 面相邻的 6-邻接.
    #[default]
    Six,

    /// 含棱与角的 26-邻接.
    TwentySix,
}

/// 获得平面索引 `pos` 的 4-邻域索引. 允许 wrap 下溢, 由调用方负责越界检查.
#[inline]
fn neighbour4((h, w): Idx2d) -> [Idx2d; 4] {
    [
        (h.wrapping_sub(1), w),
        (h + 1, w),
        (h, w.wrapping_sub(1)),
        (h, w + 1),
    ]
}

/// 对二值切片 `mask` 做连通域标记. 前景为非零像素.
///
/// 返回 (标号图, 连通域个数). 标号图中背景为 0, 各连通域从 1 开始编号,
/// 编号顺序由行优先扫描的首像素决定.
pub fn label_components_2d(mask: ArrayView2<'_, u8>, conn: Connectivity2d) -> (Array2<u32>, usize) {
    let (h_len, w_len) = mask.dim();
    let mut labels = Array2::<u32>::zeros((h_len, w_len));
    let mut next = 0u32;
    let mut q: VecDeque<Idx2d> = VecDeque::with_capacity(16);

    for seed in mask
        .indexed_iter()
        .filter_map(|(pos, &pix)| (pix != 0).then_some(pos))
    {
        if labels[seed] != 0 {
            continue;
        }
        next += 1;
        labels[seed] = next;
        q.push_back(seed);
        while let Some(cur) = q.pop_front() {
            let mut visit = |p: Idx2d| {
                if p.0 < h_len && p.1 < w_len && mask[p] != 0 && labels[p] == 0 {
                    labels[p] = next;
                    q.push_back(p);
                }
            };
            neighbour4(cur).into_iter().for_each(&mut visit);
            if conn == Connectivity2d::Eight {
                let (h, w) = cur;
                [
                    (h.wrapping_sub(1), w.wrapping_sub(1)),
                    (h.wrapping_sub(1), w + 1),
                    (h + 1, w.wrapping_sub(1)),
                    (h + 1, w + 1),
                ]
                .into_iter()
                .for_each(&mut visit);
            }
        }
    }
    (labels, next as usize)
}

/// 对二值体数据 `mask` 做连通域标记. 前景为非零体素, 布局为 (z, H, W).
///
/// 返回 (标号图, 连通域个数). 标号规则与 [`label_components_2d`] 相同.
pub fn label_components_3d(mask: ArrayView3<'_, u8>, conn: Connectivity3d) -> (Array3<u32>, usize) {
    let (z_len, h_len, w_len) = mask.dim();
    let mut labels = Array3::<u32>::zeros((z_len, h_len, w_len));
    let mut next = 0u32;
    let mut q: VecDeque<Idx3d> = VecDeque::with_capacity(64);

    for seed in mask
        .indexed_iter()
        .filter_map(|(pos, &pix)| (pix != 0).then_some(pos))
    {
        if labels[seed] != 0 {
            continue;
        }
        next += 1;
        labels[seed] = next;
        q.push_back(seed);
        while let Some((z, h, w)) = q.pop_front() {
            let mut visit = |p: Idx3d| {
                if p.0 < z_len && p.1 < h_len && p.2 < w_len && mask[p] != 0 && labels[p] == 0 {
                    labels[p] = next;
                    q.push_back(p);
                }
            };
            match conn {
                Connectivity3d::Six => {
                    [
                        (z.wrapping_sub(1), h, w),
                        (z + 1, h, w),
                        (z, h.wrapping_sub(1), w),
                        (z, h + 1, w),
                        (z, h, w.wrapping_sub(1)),
                        (z, h, w + 1),
                    ]
                    .into_iter()
                    .for_each(&mut visit);
                }
                Connectivity3d::TwentySix => {
                    for dz in -1i64..=1 {
                        for dh in -1i64..=1 {
                            for dw in -1i64..=1 {
                                if (dz, dh, dw) == (0, 0, 0) {
                                    continue;
                                }
                                visit((
                                    z.wrapping_add_signed(dz as isize),
                                    h.wrapping_add_signed(dh as isize),
                                    w.wrapping_add_signed(dw as isize),
                                ));
                            }
                        }
                    }
                }
            }
        }
    }
    (labels, next as usize)
}

/// 以体素个数统计各连通域大小并做重标号, 使标号 1 对应最大连通域, 依此类推.
///
/// 等大的连通域以原标号升序决胜, 因此操作是确定且幂等的.
/// 返回重标号后各连通域的体素个数 (降序).
fn relabel<D: ndarray::Dimension>(labels: &mut ndarray::Array<u32, D>, count: usize) -> Vec<usize> {
    let mut sizes = vec![0usize; count + 1];
    for &p in labels.iter().filter(|&&p| p != 0) {
        sizes[p as usize] += 1;
    }

    let mut order: Vec<usize> = (1..=count).collect();
    order.sort_by_key(|&i| (Reverse(sizes[i]), i));

    // old -> new 置换表.
    let mut remap = vec![0u32; count + 1];
    for (rank, &old) in order.iter().enumerate() {
        remap[old] = rank as u32 + 1;
    }
    for p in labels.iter_mut() {
        *p = remap[*p as usize];
    }
    order.into_iter().map(|old| sizes[old]).collect()
}

/// 按大小降序重标号的平面版本. `count` 为 [`label_components_2d`] 返回的连通域个数.
#[inline]
pub fn relabel_by_size_2d(labels: &mut Array2<u32>, count: usize) -> Vec<usize> {
    relabel(labels, count)
}

/// 按大小降序重标号的空间版本. `count` 为 [`label_components_3d`] 返回的连通域个数.
#[inline]
pub fn relabel_by_size_3d(labels: &mut Array3<u32>, count: usize) -> Vec<usize> {
    relabel(labels, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn two_components_four_conn() {
        let mask = array![[1u8, 1, 0], [0, 0, 0], [0, 0, 1]];
        let (labels, n) = label_components_2d(mask.view(), Connectivity2d::Four);
        assert_eq!(n, 2);
        assert_eq!(labels[(0, 0)], labels[(0, 1)]);
        assert_ne!(labels[(0, 0)], labels[(2, 2)]);
        assert_eq!(labels[(1, 1)], 0);
    }

    #[test]
    fn diagonal_merges_under_eight_conn() {
        let mask = array![[1u8, 0], [0, 1]];
        let (_, n4) = label_components_2d(mask.view(), Connectivity2d::Four);
        let (_, n8) = label_components_2d(mask.view(), Connectivity2d::Eight);
        assert_eq!(n4, 2);
        assert_eq!(n8, 1);
    }

    #[test]
    fn relabel_orders_by_size() {
        // 行优先扫描先遇到小连通域, 初始标号为 1.
        let mask = array![[1u8, 0, 0], [0, 0, 0], [1, 1, 1]];
        let (mut labels, n) = label_components_2d(mask.view(), Connectivity2d::Four);
        assert_eq!(labels[(0, 0)], 1);

        let sizes = relabel_by_size_2d(&mut labels, n);
        assert_eq!(sizes, vec![3, 1]);
        assert_eq!(labels[(2, 0)], 1);
        assert_eq!(labels[(0, 0)], 2);

        // 幂等性.
        let again = relabel_by_size_2d(&mut labels, n);
        assert_eq!(again, sizes);
        assert_eq!(labels[(2, 0)], 1);
    }

    #[test]
    fn corner_voxels_need_26_conn() {
        let mut mask = ndarray::Array3::<u8>::zeros((2, 2, 2));
        mask[(0, 0, 0)] = 1;
        mask[(1, 1, 1)] = 1;
        let (_, n6) = label_components_3d(mask.view(), Connectivity3d::Six);
        let (_, n26) = label_components_3d(mask.view(), Connectivity3d::TwentySix);
        assert_eq!(n6, 2);
        assert_eq!(n26, 1);
    }

    #[test]
    fn slab_is_single_six_component() {
        let mask = ndarray::Array3::<u8>::ones((3, 4, 5));
        let (mut labels, n) = label_components_3d(mask.view(), Connectivity3d::Six);
        assert_eq!(n, 1);
        let sizes = relabel_by_size_3d(&mut labels, n);
        assert_eq!(sizes, vec![60]);
        assert!(labels.iter().all(|&p| p == 1));
    }
}
