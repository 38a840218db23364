use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use async_trait::async_trait;
use tracing::info;

/// A verification message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationEmail {
    pub to: String,
    pub name: Option<String>,
    pub link: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, email: &VerificationEmail) -> anyhow::Result<()>;
}

/// Writes the message to the structured log instead of delivering it.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification(&self, email: &VerificationEmail) -> anyhow::Result<()> {
        info!(
            to = %email.to,
            name = email.name.as_deref().unwrap_or(""),
            link = %email.link,
            "verification email"
        );
        Ok(())
    }
}

/// Keeps sent messages in memory; can be switched to fail every send.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<VerificationEmail>>,
    failing: AtomicBool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<VerificationEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<VerificationEmail> {
        self.sent().pop()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send_verification(&self, email: &VerificationEmail) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("smtp relay unavailable");
        }
        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("mailer lock poisoned"))?
            .push(email.clone());
        Ok(())
    }
}
