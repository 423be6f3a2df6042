//! 肺部初始分割入口.
//!
//! 用法: `extract_lungs <input> <output> [mask]`.
//! 输出为四值标注: 0 背景, 1 躯干, 2 (与可能的 3) 肺部.

use ct_lung::prelude::*;
use std::process::exit;

fn main() {
    tools::init_logger();
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        println!(
            "Usage: {} inputImageFile outputImageFile [maskImage]",
            args[0]
        );
        exit(0);
    }

    let scan = CtScan::open(&args[1]).expect("Reading input image error");
    let mask = args
        .get(3)
        .map(|p| CtLabel::open(p).expect("Reading mask image error"));

    // 分割输出需要可复现, 固定为串行执行.
    let label = extract_lungs(&scan, mask.as_ref(), Parallelism::Sequential);
    log::info!(
        "body: {} voxels, lung: {} voxels",
        label.count(BODY),
        label.count(LUNG) + label.count(LUNG_SECOND)
    );

    label.save(&args[2]).expect("Writing label image error");
}
