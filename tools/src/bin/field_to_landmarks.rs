//! 稠密位移场标记点对导出入口.
//!
//! 用法: `field_to_landmarks <deformationField> <outputPrefix>
//! [type: pull=0, push=1] [maskImage]`.
//!
//! 输出 `<outputPrefix>Fixed.txt` 与 `<outputPrefix>Moving.txt` 两个平行文件.

use ct_lung::prelude::*;
use std::process::exit;

fn main() {
    tools::init_logger();
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        println!(
            "Usage: {} deformationField outputPrefix [type: pull=0, push=1] [maskImage]",
            args[0]
        );
        exit(1);
    }

    let field = DeformationField::open(&args[1]).expect("Reading deformation field error");
    let mode = if tools::parse_opt(&args, 3, 0u8) != 0 {
        SampleMode::Push
    } else {
        SampleMode::Pull
    };
    let mask = args
        .get(4)
        .map(|p| CtLabel::open(p).expect("Reading mask image error"));

    let fixed = format!("{}Fixed.txt", args[2]);
    let moving = format!("{}Moving.txt", args[2]);
    let n = export_landmark_pairs(&field, mask.as_ref(), mode, &fixed, &moving)
        .expect("Writing landmark files error");
    log::info!("exported {n} landmark pairs");
}
