//! 批处理流程依赖的通用组件.

use std::io;

pub mod loader;

pub use loader::{Error, ModelSpec, RunConfig};

const SEP: &str = "--------------------------------------------------------";

/// 向 `w` 写入简单分隔线.
#[inline]
pub fn sep_to<W: io::Write>(mut w: W) -> io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 缺失值显示为 `/`.
#[inline]
pub fn f64_to_display(f: f64) -> String {
    if f.is_nan() {
        "/".to_string()
    } else {
        format!("{f:.6}")
    }
}
