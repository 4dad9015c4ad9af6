//! 状态通道 - 业务能力层
//!
//! 编排器只写、UI 只读的进度通知通道。
//! 最后一条状态独立于是否有 UI 订阅而保留，
//! 弹窗重新打开后可以直接读到当前进度。

use tokio::sync::watch;

/// 进度通知接收端（从核心的角度看是只写的）
pub trait StatusSink: Send + Sync {
    /// 上报一条人类可读的进度描述
    fn update(&self, status: &str);
}

/// 基于 watch 通道的状态实现
///
/// UI 可以通过 `subscribe` 订阅变化，也可以随时 `last` 轮询。
pub struct StatusChannel {
    tx: watch::Sender<String>,
    // 自持一个接收端，保证没有订阅者时写入也不丢失
    rx: watch::Receiver<String>,
}

impl StatusChannel {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel("就绪".to_string());
        Self { tx, rx }
    }

    /// 订阅状态变化
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }

    /// 读取最后一次写入的状态
    pub fn last(&self) -> String {
        self.rx.borrow().clone()
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for StatusChannel {
    fn update(&self, status: &str) {
        // 发送失败只可能发生在通道关闭时，忽略即可
        let _ = self.tx.send(status.to_string());
    }
}
