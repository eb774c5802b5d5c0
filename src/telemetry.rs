//! Telemetry helpers for hosts embedding `chart-snapshot`.
//!
//! Tracing setup stays explicit and opt-in. Hosts either call
//! `init_default_tracing` or install their own `tracing` subscriber. Events
//! carry the module path as target, so filters like
//! `RUST_LOG=chart_snapshot::service=info,chart_snapshot::shim=debug` work.
//!
//! | Target | Level | Fields |
//! |---|---|---|
//! | `chart_snapshot::service` | info | `service` (always `echarts`), `requires`, `provider`, `font` |
//! | `chart_snapshot::service` | debug | `width`, `height`, `provider` |
//! | `chart_snapshot::service::session` | debug/warn | `completion`, `elapsed_ms`, `timeout_ms`, `bytes`, `mime`, `error` |
//! | `chart_snapshot::shim` | debug/warn | `install_id`, `decoder`, `depth` |
//! | `chart_snapshot::engine` | trace/debug | `generation`, `passes`, `has_content`, `animate`, `duration_ms` |
//! | `chart_snapshot::engine::animation` | trace/warn | `generation`, `frame`, `error` |
//! | `chart_snapshot::render::raster` | trace | `family`, `error` |

/// Initializes a default `tracing` subscriber when the `telemetry` feature is enabled.
///
/// Returns `true` when initialization succeeds.
/// Returns `false` when no initialization is performed (feature disabled) or if a
/// global subscriber was already set by the host application.
#[must_use]
pub fn init_default_tracing() -> bool {
    #[cfg(feature = "telemetry")]
    {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_target(true)
            .compact();

        return builder.try_init().is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        false
    }
}
