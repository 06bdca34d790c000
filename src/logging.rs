use std::{fs, path::Path};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::error::Result;

/// Logi idą do pliku, bo terminal należy do interfejsu.
/// Guard musi żyć do końca sesji, inaczej bufor nie zostanie opróżniony.
pub fn init<P: AsRef<Path>>(log_dir: P) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir.as_ref())?;
    let appender = tracing_appender::rolling::daily(log_dir.as_ref(), "atlas.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}
