//! Logging for the `lux` driver.
//!
//! `LUX_LOG` selects the filter in `RUST_LOG` syntax (and `RUST_LOG` itself
//! works as a fallback); unset, only warnings and errors come through.
//! `LUX_LOG_FORMAT=tree` switches to hierarchical output, which is the
//! readable choice when digging through nested solver and lowering spans.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the subscriber for this process.
///
/// Re-entrant: if a subscriber is already set (tests, embedding hosts), the
/// first one stays and this call is a no-op.
pub fn init() {
    let filter = ["LUX_LOG", "RUST_LOG"]
        .into_iter()
        .find_map(|var| EnvFilter::try_from_env(var).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    let tree = matches!(
        std::env::var("LUX_LOG_FORMAT").as_deref(),
        Ok("tree")
    );

    let base = tracing_subscriber::registry().with(filter);
    let installed = if tree {
        // A two-space indent keeps per-pass spans distinguishable without
        // pushing kernel-level trace lines off the right edge.
        base.with(
            tracing_tree::HierarchicalLayer::new(2)
                .with_targets(true)
                .with_writer(std::io::stderr),
        )
        .try_init()
    } else {
        base.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    // An Err here means a subscriber already won the race; keep it.
    let _ = installed;
}
