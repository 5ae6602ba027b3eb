//! 日志初始化（供二进制程序使用）

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "stride_render=info";

/// 安装 fmt 订阅者，过滤规则取自 `RUST_LOG`；重复调用无副作用
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
