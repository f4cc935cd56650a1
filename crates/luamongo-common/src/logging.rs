//! 日志初始化
//!
//! 宿主进程加载绑定时调用一次即可；`RUST_LOG` 环境变量优先于配置中的级别。

use crate::config::LogConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init_logging() {
    init_logging_with(&LogConfig::default());
}

pub fn init_logging_with(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    // 重复初始化时保留已有的订阅者
    if config.json {
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true))
            .with(filter)
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .with(filter)
            .try_init();
    }
}
