//! 标签图轮廓提取入口.
//!
//! 用法: `extract_contours <dim> <input> <output> [fullyConnected]`.
//! `dim` 为 2, 3 或 X, 其中 X 表示对 3D 体数据逐切片独立提取.

use ct_lung::prelude::*;
use std::process::exit;

fn main() {
    tools::init_logger();
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        println!(
            "Usage: {} imageDimension inputImage outputImage [fullyConnected]",
            args[0]
        );
        exit(1);
    }
    let fully = tools::parse_opt(&args, 4, 0.0f32) != 0.0;

    let scan = CtScan::open(&args[2]).expect("Reading input image error");
    log::info!("input shape: {:?}, fully connected: {fully}", scan.shape());

    let out = if args[1].starts_with('X') {
        label_contours_slicewise(scan.data(), fully)
    } else {
        match args[1].parse::<u32>() {
            Ok(2) => {
                assert_eq!(scan.len_z(), 1, "2D 模式要求单切片体数据");
                label_contours_slicewise(scan.data(), fully)
            }
            Ok(3) => label_contours_3d(scan.data(), fully),
            _ => {
                eprintln!("Unsupported dimension");
                exit(1);
            }
        }
    };

    scan.replace_data(out)
        .save(&args[3])
        .expect("Writing output image error");
}
