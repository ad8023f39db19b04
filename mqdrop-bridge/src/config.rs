//! Configuration for the bridge service.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mqdrop_core::delivery::DEFAULT_CHUNK_SIZE;
use mqdrop_core::wire::MAX_FRAME_PAYLOAD;
use mqdrop_core::{
    Credentials, DeliverySettings, Disposition, Endpoint, HeaderError, HeaderFields,
    MessageSettings, OpenOptions, PayloadMetadata, PollerConfig, build_header,
};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Watched directory and poll timing.
    pub watch: WatchConfig,
    /// Queue manager connection and message settings.
    pub queue: QueueConfig,
    /// `IF_COBA` header values.
    pub header: HeaderFields,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Directory watching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    pub directory: PathBuf,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Files younger than this are left alone.
    #[serde(default = "default_min_file_age_ms")]
    pub min_file_age_ms: u64,
    #[serde(default)]
    pub on_success: OnSuccess,
    /// Destination for `on_success = "archive"`.
    #[serde(default)]
    pub archive_dir: String,
}

/// What to do with a delivered file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnSuccess {
    #[default]
    Keep,
    Delete,
    Archive,
}

/// Queue manager connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub channel: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub queue_manager: String,
    /// Target queue.
    pub queue: String,
    #[serde(default = "default_ccsid")]
    pub ccsid: i32,
    #[serde(default = "default_encoding")]
    pub encoding: i32,
    #[serde(default = "default_persistent")]
    pub persistent: bool,
    /// Payload bytes per data frame.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// How long to wait for the queue manager to answer a request.
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive. `RUST_LOG` overrides it.
    pub level: String,
    /// Optional log file path. If empty, logs to stderr.
    pub file: String,
}

/// Why a configuration was rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("watch.archive_dir is required when on_success = \"archive\"")]
    MissingArchiveDir,

    #[error("queue.chunk_size {size} exceeds the frame limit of {max} bytes")]
    ChunkTooLarge { size: usize, max: usize },

    #[error("[header] {0}")]
    Header(#[from] HeaderError),
}

// ── Defaults ─────────────────────────────────────────────────────

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_min_file_age_ms() -> u64 {
    1000
}

fn default_port() -> u16 {
    1414
}

fn default_ccsid() -> i32 {
    1208
}

fn default_encoding() -> i32 {
    273
}

fn default_persistent() -> bool {
    true
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_reply_timeout_ms() -> u64 {
    30_000
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: String::new(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

const TEMPLATE_PREAMBLE: &str = "\
# mqdrop-bridge configuration
#
# watch.on_success: keep | delete | archive (archive needs watch.archive_dir)
# Optional [header] keys: direction, owner, user_reference, delivery_mode,
#   del_not_request, del_not_receiver_dn, compression, nr_indicator,
#   duplicate_check_override
# RUST_LOG overrides logging.level.

";

impl BridgeConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that would otherwise fail on the first delivery.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.directory.as_os_str().is_empty() {
            return Err(ConfigError::Empty("watch.directory"));
        }
        if self.watch.poll_interval_ms == 0 {
            return Err(ConfigError::Zero("watch.poll_interval_ms"));
        }
        if self.watch.on_success == OnSuccess::Archive && self.watch.archive_dir.trim().is_empty()
        {
            return Err(ConfigError::MissingArchiveDir);
        }

        let q = &self.queue;
        for (name, value) in [
            ("queue.host", &q.host),
            ("queue.channel", &q.channel),
            ("queue.queue_manager", &q.queue_manager),
            ("queue.queue", &q.queue),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty(name));
            }
        }
        if q.port == 0 {
            return Err(ConfigError::Zero("queue.port"));
        }
        if q.chunk_size == 0 {
            return Err(ConfigError::Zero("queue.chunk_size"));
        }
        if q.chunk_size > MAX_FRAME_PAYLOAD {
            return Err(ConfigError::ChunkTooLarge {
                size: q.chunk_size,
                max: MAX_FRAME_PAYLOAD,
            });
        }
        if q.connect_timeout_ms == 0 {
            return Err(ConfigError::Zero("queue.connect_timeout_ms"));
        }
        if q.reply_timeout_ms == 0 {
            return Err(ConfigError::Zero("queue.reply_timeout_ms"));
        }

        // Only the configured fields can be missing; the file name is
        // derived at send time.
        let sample = PayloadMetadata {
            file_name: "sample".into(),
            length: 0,
        };
        build_header(&self.header, &sample)?;
        Ok(())
    }

    /// A complete example configuration.
    pub fn template() -> Self {
        Self {
            watch: WatchConfig {
                directory: PathBuf::from("/data/inbound"),
                poll_interval_ms: default_poll_interval_ms(),
                min_file_age_ms: default_min_file_age_ms(),
                on_success: OnSuccess::Keep,
                archive_dir: String::new(),
            },
            queue: QueueConfig {
                host: "mq.example.org".into(),
                port: default_port(),
                channel: "DEV.APP.SVRCONN".into(),
                user: "app".into(),
                password: String::new(),
                queue_manager: "QM1".into(),
                queue: "IF.COBA.IN".into(),
                ccsid: default_ccsid(),
                encoding: default_encoding(),
                persistent: default_persistent(),
                chunk_size: default_chunk_size(),
                connect_timeout_ms: default_connect_timeout_ms(),
                reply_timeout_ms: default_reply_timeout_ms(),
            },
            header: HeaderFields {
                originator_application: Some("COW01".into()),
                requestor: Some("o=cobadeff,o=swift".into()),
                responder: Some("cn=central,o=swift".into()),
                service: Some("eba.step2!pu1".into()),
                request_type: Some("pacs.008".into()),
                ..HeaderFields::default()
            },
            logging: LoggingConfig::default(),
        }
    }

    /// The template rendered as commented TOML.
    pub fn template_toml() -> Result<String, toml::ser::Error> {
        let body = toml::to_string_pretty(&Self::template())?;
        Ok(format!("{TEMPLATE_PREAMBLE}{body}"))
    }

    // ── Conversions ──────────────────────────────────────────────

    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.queue.host.clone(),
            port: self.queue.port,
            channel: self.queue.channel.clone(),
            queue_manager: self.queue.queue_manager.clone(),
        }
    }

    pub fn delivery_settings(&self) -> DeliverySettings {
        DeliverySettings {
            endpoint: self.endpoint(),
            credentials: Credentials {
                user: self.queue.user.clone(),
                password: self.queue.password.clone(),
            },
            queue: self.queue.queue.clone(),
            open_options: OpenOptions::default(),
            chunk_size: self.queue.chunk_size,
        }
    }

    pub fn message_settings(&self) -> MessageSettings {
        MessageSettings {
            ccsid: self.queue.ccsid,
            encoding: self.queue.encoding,
            persistent: self.queue.persistent,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.queue.connect_timeout_ms)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.queue.reply_timeout_ms)
    }

    pub fn disposition(&self) -> Disposition {
        match self.watch.on_success {
            OnSuccess::Keep => Disposition::Keep,
            OnSuccess::Delete => Disposition::Delete,
            OnSuccess::Archive => Disposition::Archive(PathBuf::from(&self.watch.archive_dir)),
        }
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            directory: self.watch.directory.clone(),
            interval: Duration::from_millis(self.watch.poll_interval_ms),
            min_file_age: Duration::from_millis(self.watch.min_file_age_ms),
            chunk_size: self.queue.chunk_size,
            disposition: self.disposition(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use mqdrop_core::HeaderField;

    use super::*;

    const MINIMAL: &str = r#"
        [watch]
        directory = "/data/inbound"

        [queue]
        host = "mq.local"
        channel = "DEV.APP.SVRCONN"
        queue_manager = "QM1"
        queue = "IF.COBA.IN"

        [header]
        originator_application = "COW01"
        requestor = "o=cobadeff,o=swift"
        responder = "cn=central,o=swift"
        service = "eba.step2!pu1"
        request_type = "pacs.008"
    "#;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = BridgeConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(cfg.watch.poll_interval_ms, 1000);
        assert_eq!(cfg.watch.min_file_age_ms, 1000);
        assert_eq!(cfg.watch.on_success, OnSuccess::Keep);
        assert_eq!(cfg.queue.port, 1414);
        assert_eq!(cfg.queue.ccsid, 1208);
        assert_eq!(cfg.queue.encoding, 273);
        assert_eq!(cfg.queue.chunk_size, 8192);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.disposition(), Disposition::Keep);
        assert_eq!(cfg.endpoint().address(), "mq.local:1414");
    }

    #[test]
    fn template_is_valid_and_roundtrips() {
        let text = BridgeConfig::template_toml().unwrap();
        assert!(text.starts_with("# mqdrop-bridge configuration"));
        let cfg = BridgeConfig::from_toml(&text).unwrap();
        assert_eq!(cfg.queue.queue, "IF.COBA.IN");
        assert_eq!(cfg.header.service.as_deref(), Some("eba.step2!pu1"));
    }

    #[test]
    fn missing_required_key_is_a_parse_error() {
        let text = MINIMAL.replace("queue_manager = \"QM1\"", "");
        assert!(matches!(
            BridgeConfig::from_toml(&text),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_header_field_fails_validation() {
        let text = MINIMAL.replace("service = \"eba.step2!pu1\"", "");
        assert!(matches!(
            BridgeConfig::from_toml(&text),
            Err(ConfigError::Header(HeaderError::MissingField(
                HeaderField::Service
            )))
        ));
    }

    #[test]
    fn blank_values_are_rejected() {
        let text = MINIMAL.replace("host = \"mq.local\"", "host = \"  \"");
        assert!(matches!(
            BridgeConfig::from_toml(&text),
            Err(ConfigError::Empty("queue.host"))
        ));

        let text = MINIMAL.replace("request_type = \"pacs.008\"", "request_type = \"\"");
        assert!(matches!(
            BridgeConfig::from_toml(&text),
            Err(ConfigError::Header(_))
        ));
    }

    #[test]
    fn archive_requires_directory() {
        let text = MINIMAL.replace(
            "directory = \"/data/inbound\"",
            "directory = \"/data/inbound\"\non_success = \"archive\"",
        );
        assert!(matches!(
            BridgeConfig::from_toml(&text),
            Err(ConfigError::MissingArchiveDir)
        ));

        let text = MINIMAL.replace(
            "directory = \"/data/inbound\"",
            "directory = \"/data/inbound\"\non_success = \"archive\"\narchive_dir = \"/data/done\"",
        );
        let cfg = BridgeConfig::from_toml(&text).unwrap();
        assert_eq!(
            cfg.disposition(),
            Disposition::Archive(PathBuf::from("/data/done"))
        );
    }

    #[test]
    fn chunk_size_limits() {
        let text = MINIMAL.replace(
            "queue = \"IF.COBA.IN\"",
            "queue = \"IF.COBA.IN\"\nchunk_size = 0",
        );
        assert!(matches!(
            BridgeConfig::from_toml(&text),
            Err(ConfigError::Zero("queue.chunk_size"))
        ));

        let text = MINIMAL.replace(
            "queue = \"IF.COBA.IN\"",
            "queue = \"IF.COBA.IN\"\nchunk_size = 99999999",
        );
        assert!(matches!(
            BridgeConfig::from_toml(&text),
            Err(ConfigError::ChunkTooLarge { .. })
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = BridgeConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mqdrop.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        let cfg = BridgeConfig::load(&path).unwrap();
        assert_eq!(cfg.poller_config().interval, Duration::from_millis(1000));
        assert_eq!(cfg.delivery_settings().queue, "IF.COBA.IN");
    }
}
