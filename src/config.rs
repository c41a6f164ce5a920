//! Runtime configuration: environment variables with parse-or-default fallbacks,
//! optionally seeded from a local `.env` via `dotenvy`.

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub tenant_header_name: String,
    /// Default source slot used when synthesizing an auto-equip step and the
    /// triggering event is silent on slot positions.
    pub default_equip_source_slot: i16,
    /// Default destination slot for the same case.
    pub default_equip_destination_slot: i16,
    pub http_port: u16,
    pub enable_persistence_mirror: bool,
    pub kafka_brokers: String,
    pub kafka_group_id: String,
    pub kafka_client_id: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            tenant_header_name: "X-Tenant-Id".to_string(),
            default_equip_source_slot: 5,
            default_equip_destination_slot: -1,
            http_port: 8089,
            enable_persistence_mirror: false,
            kafka_brokers: "localhost:9092".to_string(),
            kafka_group_id: "saga-orchestrator".to_string(),
            kafka_client_id: "saga-orchestrator".to_string(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            tenant_header_name: env_or("TENANT_HEADER_NAME", &default.tenant_header_name),
            default_equip_source_slot: env_parse_or(
                "DEFAULT_EQUIP_SOURCE_SLOT",
                default.default_equip_source_slot,
            ),
            default_equip_destination_slot: env_parse_or(
                "DEFAULT_EQUIP_DESTINATION_SLOT",
                default.default_equip_destination_slot,
            ),
            http_port: env_parse_or("HTTP_PORT", default.http_port),
            enable_persistence_mirror: env_parse_or(
                "ENABLE_PERSISTENCE_MIRROR",
                default.enable_persistence_mirror,
            ),
            kafka_brokers: env_or("KAFKA_BROKERS", &default.kafka_brokers),
            kafka_group_id: env_or("KAFKA_GROUP_ID", &default.kafka_group_id),
            kafka_client_id: env_or("KAFKA_CLIENT_ID", &default.kafka_client_id),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
