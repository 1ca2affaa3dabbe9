/// Logging initialization.
///
/// Installs a `tracing_subscriber::fmt` subscriber writing to stderr. `RUST_LOG` wins when
/// set; otherwise the core logs at debug and everything else at info.
///
/// Safe to call more than once: a second call is a no-op because `try_init` refuses to
/// replace an installed subscriber. Hosts that bring their own subscriber simply skip this.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "charmchat_core=debug,info".into()),
        )
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_is_idempotent() {
        super::init_logging();
        super::init_logging();
        tracing::info!("logging initialized twice without panicking");
    }
}
