//! 四条命令行管线共享的通用组件.

use std::fmt::Display;
use std::str::FromStr;

/// 初始化全局 logger. 所有日志走 stderr, 不污染管线的 stdout 输出.
pub fn init_logger() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .expect("Logger init error");
}

/// 解析第 `idx` 个命令行参数. 参数缺省时返回 `default`,
/// 存在但无法解析时打印错误并以失败状态退出进程.
pub fn parse_opt<T: FromStr>(args: &[String], idx: usize, default: T) -> T
where
    T::Err: Display,
{
    match args.get(idx) {
        None => default,
        Some(tok) => tok.parse().unwrap_or_else(|e| {
            eprintln!("Invalid argument {idx} ({tok}): {e}");
            std::process::exit(1)
        }),
    }
}
