//! 多层级 B 样条曲线拟合入口.
//!
//! 用法: `fit_bspline_curve <pointDim> <landmarksFile> [order] [nlevels]
//! [numberOfControlPoints] [sampleSpacing] [closed]`.
//!
//! 采样点以逗号分隔逐行打印到 stdout, 因此这里不初始化 logger.

use ct_lung::prelude::*;
use std::process::exit;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        println!(
            "Usage: {} pointDimension inputLandmarksFile [order=3] [nlevels=5] \
             [numberOfControlPoints=order+1] [sampleSpacing=0.001] [closed?=0]",
            args[0]
        );
        println!("  Note: 1. Points are assumed to be parametrically ordered.");
        println!("        2. The last column (pointDimension+1) is used for weights.");
        exit(1);
    }

    let dim = match args[1].parse::<u32>() {
        Ok(1) | Ok(2) => 2,
        Ok(3) => 3,
        Ok(4) => 4,
        _ => {
            eprintln!("Unsupported dimension");
            exit(1);
        }
    };

    let order = tools::parse_opt(&args, 3, 3usize);
    let params = FitParams {
        order,
        levels: tools::parse_opt(&args, 4, 5),
        control_points: tools::parse_opt(&args, 5, order + 1),
        closed: tools::parse_opt(&args, 7, 0u8) != 0,
    };
    let spacing = tools::parse_opt(&args, 6, 0.001f64);

    let set = read_landmarks(&args[2], dim).expect("Reading landmarks error");
    let curve = fit_bspline_curve(&set, &params).expect("Curve fitting error");

    for p in curve.sample(spacing) {
        let line: Vec<String> = p.iter().map(f64::to_string).collect();
        println!("{}", line.join(","));
    }
}
