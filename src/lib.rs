//! zsearch - 外部搜索引擎驱动库
//!
//! 模块结构：
//! - kernel::services::ports: 数据契约（SearchRequest, SearchEvent, ResultNode, Settings）
//! - kernel::services::adapters: 查询编译、事件解析、结果树构建、进程编排、异步任务
//! - kernel::services::bus: 回调投递到宿主线程的队列

pub mod kernel;
