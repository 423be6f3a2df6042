//! 二值切片上的形态学修复原语.
//!
//! 所有函数都在 0/1 二值 `Array2<u8>` 上原地工作,
//! 前景为 1. 调用方负责先把感兴趣标签二值化
//! (见 [`crate::LabelSlice::binary_mask`]).

use ndarray::Array2;

use crate::components::{label_components_2d, relabel_by_size_2d, Connectivity2d};

/// 以半径 1 菱形 (即 4-邻域加中心) 为结构元做膨胀.
fn dilate_diamond(buf: &Array2<u8>) -> Array2<u8> {
    let (h_len, w_len) = buf.dim();
    Array2::from_shape_fn((h_len, w_len), |(h, w)| {
        let hit = buf[(h, w)] != 0
            || (h > 0 && buf[(h - 1, w)] != 0)
            || (h + 1 < h_len && buf[(h + 1, w)] != 0)
            || (w > 0 && buf[(h, w - 1)] != 0)
            || (w + 1 < w_len && buf[(h, w + 1)] != 0);
        u8::from(hit)
    })
}

/// 以半径 1 菱形为结构元做腐蚀. 图像边界外视作前景,
/// 使贴边的前景不会被图像边缘本身腐蚀掉.
fn erode_diamond(buf: &Array2<u8>) -> Array2<u8> {
    let (h_len, w_len) = buf.dim();
    Array2::from_shape_fn((h_len, w_len), |(h, w)| {
        let hold = buf[(h, w)] != 0
            && (h == 0 || buf[(h - 1, w)] != 0)
            && (h + 1 >= h_len || buf[(h + 1, w)] != 0)
            && (w == 0 || buf[(h, w - 1)] != 0)
            && (w + 1 >= w_len || buf[(h, w + 1)] != 0);
        u8::from(hold)
    })
}

/// 半径 1 菱形结构元的闭运算 (先膨胀后腐蚀), 弥合前景上的细缝.
pub fn close_diamond(buf: &mut Array2<u8>) {
    *buf = erode_diamond(&dilate_diamond(buf));
}

/// 填充前景内部的腔体: 所有不接触图像边缘的背景 4-连通域都被置为前景.
///
/// 返回被填充的像素个数.
pub fn fill_cavities(buf: &mut Array2<u8>) -> usize {
    let bg = buf.map(|&p| u8::from(p == 0));
    let (labels, count) = label_components_2d(bg.view(), Connectivity2d::Four);

    // 接触边缘的背景连通域是外部背景, 不予填充.
    let mut open = vec![false; count + 1];
    let (h_len, w_len) = buf.dim();
    for (pos, &l) in labels.indexed_iter() {
        let (h, w) = pos;
        if l != 0 && (h == 0 || h + 1 == h_len || w == 0 || w + 1 == w_len) {
            open[l as usize] = true;
        }
    }

    let mut filled = 0usize;
    for (p, &l) in buf.iter_mut().zip(labels.iter()) {
        if l != 0 && !open[l as usize] {
            *p = 1;
            filled += 1;
        }
    }
    filled
}

/// 椒盐修复: 移除像素数少于 `min_px` 的前景 4-连通域 ("盐"),
/// 并填充像素数少于 `min_px` 且不接触图像边缘的背景 4-连通域 ("椒").
///
/// 返回被修改的像素个数.
pub fn repair_salt_and_pepper(buf: &mut Array2<u8>, min_px: usize) -> usize {
    let mut changed = 0usize;

    // 盐: 细小前景.
    let (mut labels, count) = label_components_2d(buf.view(), Connectivity2d::Four);
    let sizes = relabel_by_size_2d(&mut labels, count);
    for (p, &l) in buf.iter_mut().zip(labels.iter()) {
        if l != 0 && sizes[l as usize - 1] < min_px {
            *p = 0;
            changed += 1;
        }
    }

    // 椒: 细小孔洞. 接触边缘的背景属于外部, 保持不动.
    let bg = buf.map(|&p| u8::from(p == 0));
    let (labels, count) = label_components_2d(bg.view(), Connectivity2d::Four);
    let mut keep = vec![false; count + 1];
    let mut px = vec![0usize; count + 1];
    let (h_len, w_len) = buf.dim();
    for ((h, w), &l) in labels.indexed_iter() {
        if l == 0 {
            continue;
        }
        px[l as usize] += 1;
        if h == 0 || h + 1 == h_len || w == 0 || w + 1 == w_len {
            keep[l as usize] = true;
        }
    }
    for (p, &l) in buf.iter_mut().zip(labels.iter()) {
        if l != 0 && !keep[l as usize] && px[l as usize] < min_px {
            *p = 1;
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array2};

    #[test]
    fn closing_seals_thin_slit() {
        // 实心块中间有一条宽 1 的竖缝.
        let mut buf = Array2::<u8>::zeros((7, 7));
        buf.slice_mut(s![1..6, 1..6]).fill(1);
        buf.slice_mut(s![1..6, 3..4]).fill(0);
        close_diamond(&mut buf);
        // 缝的内部被弥合, 缝口与远处背景保持不变.
        assert_eq!(buf[(2, 3)], 1);
        assert_eq!(buf[(3, 3)], 1);
        assert_eq!(buf[(4, 3)], 1);
        assert_eq!(buf[(0, 0)], 0);
        // 原有前景不受损.
        assert_eq!(buf[(1, 1)], 1);
        assert_eq!(buf[(5, 5)], 1);
    }

    #[test]
    fn closing_keeps_border_foreground() {
        let mut buf = Array2::<u8>::zeros((4, 4));
        buf.slice_mut(s![0..2, 0..2]).fill(1);
        close_diamond(&mut buf);
        // 边界外按前景处理, 贴边方块不被腐蚀.
        assert_eq!(buf[(0, 0)], 1);
        assert_eq!(buf[(0, 1)], 1);
    }

    #[test]
    fn cavity_is_filled_but_open_background_is_not() {
        let mut buf = Array2::<u8>::zeros((5, 6));
        buf.slice_mut(s![1..4, 1..5]).fill(1);
        buf[(2, 2)] = 0;
        assert_eq!(fill_cavities(&mut buf), 1);
        assert_eq!(buf[(2, 2)], 1);
        assert_eq!(buf[(0, 0)], 0);
    }

    #[test]
    fn salt_and_pepper_thresholds_on_area() {
        let mut buf = Array2::<u8>::zeros((7, 7));
        buf.slice_mut(s![1..6, 1..6]).fill(1);
        buf[(3, 3)] = 0; // 1 像素孔洞.
        buf[(0, 6)] = 1; // 1 像素孤岛.
        let changed = repair_salt_and_pepper(&mut buf, 3);
        assert_eq!(changed, 2);
        assert_eq!(buf[(3, 3)], 1);
        assert_eq!(buf[(0, 6)], 0);
        // 大前景保持不动.
        assert_eq!(buf[(1, 1)], 1);
    }

    #[test]
    fn large_components_survive_repair() {
        let mut buf = Array2::<u8>::zeros((8, 8));
        buf.slice_mut(s![2..6, 2..6]).fill(1);
        let before = buf.clone();
        assert_eq!(repair_salt_and_pepper(&mut buf, 4), 0);
        assert_eq!(buf, before);
    }
}
