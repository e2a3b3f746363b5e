use tracing::Span;
use tracing_subscriber::{EnvFilter, Registry, prelude::*, reload};

const DEFAULT_DIRECTIVES: &str = "info";
const DEBUG_DIRECTIVES: &str = "debug";

/// Handle on the installed subscriber; switches verbosity once debug mode is known.
#[derive(Clone)]
pub struct Telemetry {
    filter: reload::Handle<EnvFilter, Registry>,
}

impl Telemetry {
    /// Swap the default filter for debug verbosity. `RUST_LOG` still wins when set.
    pub fn set_debug_mode(&self, debug: bool) -> Result<(), reload::Error> {
        self.filter.reload(env_filter(debug))
    }
}

fn env_filter(debug: bool) -> EnvFilter {
    let default = if debug { DEBUG_DIRECTIVES } else { DEFAULT_DIRECTIVES };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize tracing
pub fn init() -> anyhow::Result<Telemetry> {
    let logger = tracing_subscriber::fmt::layer().compact();
    let (env_filter, filter) = reload::Layer::new(env_filter(false));

    Registry::default().with(env_filter).with(logger).try_init()?;
    Ok(Telemetry { filter })
}

/// A named logger, handed explicitly to the components that log under it.
pub fn logger(name: &str) -> Span {
    tracing::info_span!("logger", name = %name)
}

#[cfg(test)]
impl Telemetry {
    /// A handle whose filter is not installed anywhere.
    pub(crate) fn detached() -> Self {
        let (_layer, filter) = reload::Layer::<EnvFilter, Registry>::new(env_filter(false));
        Self { filter }
    }
}
