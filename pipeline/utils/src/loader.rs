//! 对 `knee-berry::dataset` 的更一层封装. 提供更直接的研究目录解析.

use std::env;
use std::path::PathBuf;

/// 获取膝关节研究数据基本路径.
///
/// 1. 若环境变量 `$KNEE_DATA_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/knee`.
pub fn knee_dir_from_env_or_home() -> PathBuf {
    if let Ok(d) = env::var("KNEE_DATA_DIR") {
        PathBuf::from(d)
    } else {
        knee_berry::dataset::home_dataset_dir_with(["knee"]).unwrap()
    }
}

/// 获取膝关节研究结果基本路径.
///
/// 1. 若环境变量 `$KNEE_RESULTS_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/knee/results`.
pub fn results_dir_from_env_or_home() -> PathBuf {
    if let Ok(d) = env::var("KNEE_RESULTS_DIR") {
        PathBuf::from(d)
    } else {
        knee_berry::dataset::home_dataset_dir_with(["knee", "results"]).unwrap()
    }
}
