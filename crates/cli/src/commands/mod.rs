//! Command implementations.

pub mod cart;
pub mod checkout;

use pinbazaar_storefront::notify::{Notice, NoticeLevel};
use tokio::sync::broadcast;

/// Print notices until every publisher is gone.
pub async fn print_notices(mut notices: broadcast::Receiver<Notice>) {
    loop {
        match notices.recv().await {
            Ok(notice) => print_notice(&notice),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Notice printer fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_notice(notice: &Notice) {
    let marker = match notice.level {
        NoticeLevel::Success => "✓",
        NoticeLevel::Info => "i",
        NoticeLevel::Error => "✗",
    };
    println!("{marker} {}", notice.message);
}
