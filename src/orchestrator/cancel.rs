//! 操作级取消信号
//!
//! 宿主持有 `CancelHandle`，核心在每次网络调用前和每次
//! 定时等待前检查 `CancelToken`，使用户的"停止"或页面跳转
//! 可以在块与块之间中断一次分块运行。

use std::time::Duration;

use tokio::sync::watch;

use crate::error::{AppError, BusinessError, Result};

/// 取消信号的发起端（宿主侧）
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// 派生一个操作内使用的令牌
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    /// 发出取消信号
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// 复位信号，供下一次操作使用
    pub fn reset(&self) {
        self.tx.send_replace(false);
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// 取消信号的消费端（操作内）
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// 若已取消则返回错误，用于网络调用前的检查点
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(AppError::Business(BusinessError::Cancelled))
        } else {
            Ok(())
        }
    }

    /// 可被取消打断的等待
    pub async fn wait(&self, duration: Duration) -> Result<()> {
        self.ensure_active()?;
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancelled() => Err(AppError::Business(BusinessError::Cancelled)),
        }
    }

    /// 等待直到取消发生；发送端已销毁时永远挂起，让计时分支胜出
    async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
        std::future::pending::<()>().await;
    }
}
