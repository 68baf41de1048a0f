use std::{sync::Arc, time::Duration};

use tokio::sync::Mutex;

use crate::management::TokenManager;

use super::StopSignal;

/// Hands a credential from whoever authorized to the polling worker.
pub type CredentialSlot = Arc<Mutex<Option<TokenManager>>>;

/// Waits until a credential shows up in `slot` and takes it.
///
/// Checks every `interval`; returns `None` as soon as `stop` is observed.
pub async fn wait_for_credential(
    slot: &CredentialSlot,
    stop: &StopSignal,
    interval: Duration,
) -> Option<TokenManager> {
    loop {
        if stop.is_stopped() {
            return None;
        }

        let mut lock = slot.lock().await;
        if let Some(tokens) = lock.take() {
            return Some(tokens);
        }
        drop(lock);

        tokio::time::sleep(interval).await;
    }
}
