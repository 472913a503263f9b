use once_cell::sync::OnceCell;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

/// Target used by the HTTP access log middleware.
pub const ACCESS_TARGET: &str = "http.access";

static ACCESS_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Rolling file sink for access log lines. Read from `CODEREVIEW_ACCESS_LOG_*`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessLogRoll {
    pub dir: String,
    pub prefix: String,
    pub rotation: Rotation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    Minutely,
    Hourly,
    Daily,
}

impl Rotation {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hourly" => Rotation::Hourly,
            "minutely" => Rotation::Minutely,
            _ => Rotation::Daily,
        }
    }
}

impl AccessLogRoll {
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup("CODEREVIEW_ACCESS_LOG_ROLL").as_deref() != Some("1") {
            return None;
        }
        let dir = lookup("CODEREVIEW_ACCESS_LOG_DIR").unwrap_or_else(|| "logs".to_string());
        let prefix =
            lookup("CODEREVIEW_ACCESS_LOG_PREFIX").unwrap_or_else(|| "http-access".to_string());
        let rotation = lookup("CODEREVIEW_ACCESS_LOG_ROTATION")
            .map(|raw| Rotation::parse(&raw))
            .unwrap_or(Rotation::Daily);
        Some(Self {
            dir,
            prefix,
            rotation,
        })
    }
}

/// Install the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    install_console(filter, AccessLogRoll::from_env());
}

fn install_console(filter: EnvFilter, roll: Option<AccessLogRoll>) {
    let fmt_layer = fmt::layer();
    let registry = tracing_subscriber::registry().with(fmt_layer.with_filter(filter));
    let Some(roll) = roll else {
        let _ = registry.try_init();
        return;
    };
    if std::fs::create_dir_all(&roll.dir).is_err() {
        tracing::warn!(directory = %roll.dir, "failed to create access log directory");
    }
    let writer = match roll.rotation {
        Rotation::Hourly => tracing_appender::rolling::hourly(&roll.dir, &roll.prefix),
        Rotation::Minutely => tracing_appender::rolling::minutely(&roll.dir, &roll.prefix),
        Rotation::Daily => tracing_appender::rolling::daily(&roll.dir, &roll.prefix),
    };
    let (nb, guard) = tracing_appender::non_blocking(writer);
    let _ = ACCESS_GUARD.set(guard);
    let targets = Targets::new().with_target(ACCESS_TARGET, tracing::Level::INFO);
    let access_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(nb)
        .with_filter(targets);
    let _ = registry.with(access_layer).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn roll_disabled_unless_flagged() {
        assert_eq!(AccessLogRoll::from_lookup(lookup(&[])), None);
        assert_eq!(
            AccessLogRoll::from_lookup(lookup(&[("CODEREVIEW_ACCESS_LOG_ROLL", "yes")])),
            None
        );
    }

    #[test]
    fn roll_defaults_and_overrides() {
        let roll = AccessLogRoll::from_lookup(lookup(&[("CODEREVIEW_ACCESS_LOG_ROLL", "1")]))
            .expect("roll enabled");
        assert_eq!(roll.dir, "logs");
        assert_eq!(roll.prefix, "http-access");
        assert_eq!(roll.rotation, Rotation::Daily);

        let roll = AccessLogRoll::from_lookup(lookup(&[
            ("CODEREVIEW_ACCESS_LOG_ROLL", "1"),
            ("CODEREVIEW_ACCESS_LOG_DIR", "/var/log/review"),
            ("CODEREVIEW_ACCESS_LOG_ROTATION", "Hourly"),
        ]))
        .expect("roll enabled");
        assert_eq!(roll.dir, "/var/log/review");
        assert_eq!(roll.rotation, Rotation::Hourly);
    }
}
