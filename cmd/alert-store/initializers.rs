use std::io::IsTerminal;

use alert_store_common::{KeySchemaError, keys};
use tracing::{Level, info};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter::Directive, fmt, layer::SubscriberExt,
};

use crate::cli::{LogColor, Options};

pub fn init_tracing(opts: &Options) {
    let log_filter = EnvFilter::builder()
        .with_default_directive(Directive::from(opts.log_level))
        .from_env_lossy();

    let use_color = match opts.log_color {
        LogColor::Always => true,
        LogColor::Never => false,
        LogColor::Auto => std::io::stdout().is_terminal(),
    };

    let include_target = matches!(opts.log_level, Level::DEBUG | Level::TRACE);

    let fmt_layer = fmt::layer()
        .with_target(include_target)
        .with_ansi(use_color)
        .with_filter(log_filter);

    let subscriber = Registry::default().with(fmt_layer);
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Tracing subscriber was already initialized");
    }
}

/// Refuses to start when the key schema is inconsistent or a permitted
/// metric has no key builder.
pub fn validate_metrics(opts: &Options) -> Result<(), KeySchemaError> {
    keys::validate_permitted_metrics(&opts.permitted_metrics)?;
    if !opts.permitted_metrics.is_empty() {
        info!(
            metrics = %opts.permitted_metrics.join(","),
            "Permitted metrics have registered keys"
        );
    }
    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(error = %error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn unknown_permitted_metric_stops_startup() {
        let parsed = Options::try_parse_from([
            "alert-store",
            "--metrics.permitted",
            "missed_blocks,made_up_metric",
        ]);
        assert!(parsed.is_ok());
        let Ok(options) = parsed else { return };

        assert_eq!(
            validate_metrics(&options),
            Err(KeySchemaError::UnknownMetric("made_up_metric".to_owned()))
        );
    }

    #[test]
    fn registered_metrics_pass_validation() {
        let parsed = Options::try_parse_from([
            "alert-store",
            "--metrics.permitted",
            "slashed,github_release",
        ]);
        assert!(parsed.is_ok());
        let Ok(options) = parsed else { return };

        assert_eq!(validate_metrics(&options), Ok(()));
    }
}
