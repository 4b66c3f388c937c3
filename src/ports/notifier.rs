use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 通知ポート
///
/// 利用者へのメール配信を抽象化する。リマインダースケジューラーからのみ使用される。
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 返却期限のリマインダーを送信する
    async fn send_reminder(&self, to_email: &str, subject: &str, body: &str) -> Result<()>;
}
