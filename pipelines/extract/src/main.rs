//! 对整个数据集提取特征, 评估各模型的预测, 并打印报告.
//!
//! 运行配置见 `utils::loader`: `$EXTRACT_CONFIG` 指向 JSON 配置文件,
//! 数据集根目录取自配置, `$BRATS_DIR` 或 `$HOME/dataset/brats`.

mod result;
mod runner;

use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = simple_logger::init_with_level(log::Level::Info) {
        eprintln!("{e}");
    }

    let res = match runner::run() {
        Ok(res) => res,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    match res.analyze() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
