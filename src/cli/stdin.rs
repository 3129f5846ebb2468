//! Stdin lifecycle for watch and serve modes
//!
//! When another process drives us through a pipe, closing that pipe is the
//! signal to stop. Stdin is drained so the writer never blocks.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdinEvent {
    /// Input reached end-of-file
    Closed,
    /// Ctrl-C arrived first
    Interrupted,
}

impl StdinEvent {
    pub fn exit_code(self) -> i32 {
        match self {
            StdinEvent::Closed => 0,
            StdinEvent::Interrupted => 1,
        }
    }
}

/// Drain `reader` until it closes or `interrupt` completes
pub async fn watch<R, I>(mut reader: R, interrupt: I) -> StdinEvent
where
    R: AsyncRead + Unpin,
    I: Future<Output = ()>,
{
    tokio::pin!(interrupt);
    let mut buf = [0u8; 4096];
    loop {
        tokio::select! {
            read = reader.read(&mut buf) => match read {
                Ok(0) | Err(_) => return StdinEvent::Closed,
                Ok(_) => continue,
            },
            _ = &mut interrupt => return StdinEvent::Interrupted,
        }
    }
}

/// Completes on Ctrl-C; never, if the handler cannot be installed
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Exit the process when stdin closes (status 0) or on Ctrl-C (status 1)
pub fn spawn_lifecycle() -> tokio::task::JoinHandle<()> {
    tokio::spawn(async {
        let event = watch(tokio::io::stdin(), ctrl_c()).await;
        debug!("stdin lifecycle ended: {:?}", event);
        std::process::exit(event.exit_code());
    })
}
