//! 编排层
//!
//! ## 职责
//!
//! 1. **app**: 应用入口，处理控制命令，管理并发防护与取消信号
//! 2. **answer_orchestrator**: 把题目集合变成 LLM 请求并拼装结果
//! 3. **retry**: 统一的模型回退与退避状态机
//! 4. **cancel**: 操作级取消信号
//!
//! ## 设计特点
//!
//! - **单任务协作调度**: 网络调用与定时等待是让出点，
//!   编排逻辑自身不会与自己交错执行
//! - **向下委托**: 流程细节委托给 workflow 层，
//!   单题的匹配与应用委托给 services 层

pub mod answer_orchestrator;
pub mod app;
pub mod cancel;
pub mod retry;

pub use answer_orchestrator::AnswerOrchestrator;
pub use app::{App, ControlCommand};
pub use cancel::{CancelHandle, CancelToken};
pub use retry::{call_with_fallback, ErrorKind, RetryPolicy, RetryState};
