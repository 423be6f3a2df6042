//! 稠密位移场的标记点对导出.
//!
//! 按栅格序遍历位移场体素, 跳过零位移处, 以最邻近规则查询掩膜筛选采样点,
//! 然后写出一对平行文本文件: Moving 文件为体素源点物理坐标,
//! Fixed 文件为源点加位移后的物理坐标. 两个文件首尾各有一行哨兵,
//! 每行格式为 `x y z 序号`, 序号从 1 开始.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::{CtLabel, DeformationField, NiftiHeaderAttr};

/// 文件首尾的哨兵行.
pub const SENTINEL: &str = "0 0 0 0";

/// 掩膜探针的取样位置.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleMode {
    /// 在源点加位移处查询掩膜 (场把目标影像拉回源影像).
    #[default]
    Pull,

    /// 在源点处查询掩膜.
    Push,
}

/// 写出一行标记点. 平面场的第三列恒为 0.
fn write_point<W: Write>(w: &mut W, p: &[f64; 3], planar: bool, idx: u64) -> io::Result<()> {
    if planar {
        writeln!(w, "{} {} 0 {}", p[0], p[1], idx)
    } else {
        writeln!(w, "{} {} {} {}", p[0], p[1], p[2], idx)
    }
}

/// 将位移场导出为 Fixed/Moving 标记点对文件.
///
/// 零位移体素一律跳过. `mask` 给定时, 探针落点处掩膜非零的体素才会被导出;
/// 缺省时仅要求探针落点位于场的栅格内. 探针位置由 `mode` 决定,
/// 而两个输出文件的内容与 `mode` 无关: Moving 恒为源点, Fixed 恒为源点加位移.
///
/// 返回导出的标记点对个数 (不计哨兵行).
pub fn export_landmark_pairs<P: AsRef<Path>>(
    field: &DeformationField,
    mask: Option<&CtLabel>,
    mode: SampleMode,
    fixed_path: P,
    moving_path: P,
) -> io::Result<u64> {
    let mut fixed = BufWriter::new(File::create(fixed_path.as_ref())?);
    let mut moving = BufWriter::new(File::create(moving_path.as_ref())?);
    writeln!(fixed, "{SENTINEL}")?;
    writeln!(moving, "{SENTINEL}")?;

    let planar = field.components() == 2;
    let (z_len, h_len, w_len) = field.shape();
    let mut idx = 0u64;

    for z in 0..z_len {
        for h in 0..h_len {
            for w in 0..w_len {
                let d = field.displacement((z, h, w));
                if d == [0.0; 3] {
                    continue;
                }
                let src = field.index_to_physical((z, h, w));
                let dst = [src[0] + d[0], src[1] + d[1], src[2] + d[2]];

                let probe = match mode {
                    SampleMode::Pull => &dst,
                    SampleMode::Push => &src,
                };
                let hit = match mask {
                    Some(m) => m
                        .physical_to_nearest_index(probe)
                        .is_some_and(|pos| m[pos] != 0),
                    None => field.physical_to_nearest_index(probe).is_some(),
                };
                if !hit {
                    continue;
                }

                idx += 1;
                write_point(&mut moving, &src, planar, idx)?;
                write_point(&mut fixed, &dst, planar, idx)?;
            }
        }
    }

    writeln!(fixed, "{SENTINEL}")?;
    writeln!(moving, "{SENTINEL}")?;
    fixed.flush()?;
    moving.flush()?;
    Ok(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, Array4};

    fn read_lines(p: &Path) -> Vec<String> {
        std::fs::read_to_string(p)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    fn tmp(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(name)
    }

    /// 常位移 (0.5, 0, 0) 的 2x2x2 空间场.
    fn shift_field() -> DeformationField {
        let mut data = Array4::<f32>::zeros((3, 2, 2, 2));
        data.index_axis_mut(ndarray::Axis(0), 0).fill(0.5);
        DeformationField::fake(data, [1.0, 1.0, 1.0], [0.0, 0.0, 0.0])
    }

    #[test]
    fn pull_mode_filters_by_probe_position() {
        let field = shift_field();
        let fx = tmp("fld_pull_fixed.txt");
        let mv = tmp("fld_pull_moving.txt");
        let n = export_landmark_pairs(&field, None, SampleMode::Pull, &fx, &mv).unwrap();

        // x = 1 的体素探针落点 x = 1.5, 最邻近体素越界, 被滤除.
        assert_eq!(n, 4);
        let fixed = read_lines(&fx);
        let moving = read_lines(&mv);
        assert_eq!(fixed.len(), n as usize + 2);
        assert_eq!(moving.len(), n as usize + 2);
        assert_eq!(fixed.first().unwrap(), SENTINEL);
        assert_eq!(fixed.last().unwrap(), SENTINEL);
        assert_eq!(moving.first().unwrap(), SENTINEL);
        assert_eq!(moving.last().unwrap(), SENTINEL);

        // Moving 为源点, Fixed 为源点加位移, 序号平行.
        assert_eq!(moving[1], "0 0 0 1");
        assert_eq!(fixed[1], "0.5 0 0 1");
        assert!(moving.last().unwrap() == SENTINEL);
    }

    #[test]
    fn zero_displacement_is_skipped() {
        let mut data = Array4::<f32>::zeros((3, 2, 2, 2));
        data[[0, 1, 1, 1]] = 0.5;
        let field = DeformationField::fake(data, [1.0, 1.0, 1.0], [0.0, 0.0, 0.0]);

        let fx = tmp("fld_zero_fixed.txt");
        let mv = tmp("fld_zero_moving.txt");
        let n = export_landmark_pairs(&field, None, SampleMode::Push, &fx, &mv).unwrap();
        assert_eq!(n, 1);
        assert_eq!(read_lines(&mv)[1], "1 1 1 1");
    }

    #[test]
    fn push_mode_probes_at_source() {
        let field = shift_field();
        let fx = tmp("fld_push_fixed.txt");
        let mv = tmp("fld_push_moving.txt");
        let n = export_landmark_pairs(&field, None, SampleMode::Push, &fx, &mv).unwrap();
        // 源点必然在栅格内, 全部体素导出.
        assert_eq!(n, 8);
    }

    #[test]
    fn mask_restricts_exported_pairs() {
        let field = shift_field();
        let mut mask = Array3::<u8>::zeros((2, 2, 2));
        mask[(0, 0, 0)] = 1;
        let mask = CtLabel::fake(mask, [1.0, 1.0, 1.0]);

        let fx = tmp("fld_mask_fixed.txt");
        let mv = tmp("fld_mask_moving.txt");
        let n = export_landmark_pairs(&field, Some(&mask), SampleMode::Push, &fx, &mv).unwrap();
        assert_eq!(n, 1);
        assert_eq!(read_lines(&mv)[1], "0 0 0 1");
    }

    #[test]
    fn planar_field_writes_zero_third_column() {
        let mut data = Array4::<f32>::zeros((2, 1, 2, 2));
        data.index_axis_mut(ndarray::Axis(0), 1).fill(0.25);
        let field = DeformationField::fake(data, [1.0, 1.0, 1.0], [0.0, 0.0, 0.0]);

        let fx = tmp("fld_2d_fixed.txt");
        let mv = tmp("fld_2d_moving.txt");
        let n = export_landmark_pairs(&field, None, SampleMode::Push, &fx, &mv).unwrap();
        assert_eq!(n, 4);
        let fixed = read_lines(&fx);
        // y 方向平移 0.25, 第三列恒为 0.
        assert_eq!(fixed[1], "0 0.25 0 1");
        assert_eq!(fixed[2], "1 0.25 0 2");
    }
}
