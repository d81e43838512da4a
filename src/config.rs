use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use crate::interaction::{InteractionConfig, SwapPolicy};
use crate::model::TorqueLimits;
use crate::optimizer::PlacementConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub planner: PlannerConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            planner: PlannerConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;

    fn from_env() -> Self {
        let host_value =
            env_string("STOWPLAN_API_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse STOWPLAN_API_HOST ('{}'): {}. Using {}.",
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string("STOWPLAN_API_PORT") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    eprintln!(
                        "⚠️ STOWPLAN_API_PORT must not be 0. Using {}.",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    eprintln!(
                        "⚠️ Could not parse STOWPLAN_API_PORT ('{}'): {}. Using {}.",
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Configuration for placement search, interaction and balance evaluation.
#[derive(Clone, Debug, Default)]
pub struct PlannerConfig {
    placement: PlacementConfig,
    interaction: InteractionConfig,
}

impl PlannerConfig {
    const SEARCH_STEP_VAR: &'static str = "STOWPLAN_SEARCH_STEP";
    const ALLOW_ROTATION_VAR: &'static str = "STOWPLAN_ALLOW_ROTATION";
    const LATERAL_LIMIT_VAR: &'static str = "STOWPLAN_TORQUE_LIMIT_LATERAL";
    const LONGITUDINAL_LIMIT_VAR: &'static str = "STOWPLAN_TORQUE_LIMIT_LONGITUDINAL";
    const FINE_THRESHOLD_VAR: &'static str = "STOWPLAN_SNAP_FINE_THRESHOLD";
    const MEDIUM_THRESHOLD_VAR: &'static str = "STOWPLAN_SNAP_MEDIUM_THRESHOLD";
    const NOTIFY_INTERVAL_VAR: &'static str = "STOWPLAN_DRAG_NOTIFY_MS";
    const ADJACENCY_OVERLAP_VAR: &'static str = "STOWPLAN_ADJACENCY_OVERLAP";
    const ADJACENCY_GAP_VAR: &'static str = "STOWPLAN_ADJACENCY_GAP";
    const SWAP_POLICY_VAR: &'static str = "STOWPLAN_SWAP_POLICY";
    const GRID_CELL_VAR: &'static str = "STOWPLAN_GRID_CELL_SIZE";
    const USE_INDEX_VAR: &'static str = "STOWPLAN_USE_SPATIAL_INDEX";

    fn from_env() -> Self {
        let search_step = load_f64_with_warning(
            Self::SEARCH_STEP_VAR,
            PlacementConfig::DEFAULT_SEARCH_STEP,
            |value| value > 0.0,
            "must be greater than 0",
            "Warning: Adjusted search step changes which free positions are found",
        );

        let allow_rotation = env_string(Self::ALLOW_ROTATION_VAR)
            .and_then(|raw| parse_bool(&raw, Self::ALLOW_ROTATION_VAR))
            .unwrap_or(PlacementConfig::DEFAULT_ALLOW_ROTATION);

        let torque_limits = TorqueLimits {
            lateral: load_f64_with_warning(
                Self::LATERAL_LIMIT_VAR,
                TorqueLimits::DEFAULT_LATERAL,
                |value| value > 0.0,
                "must be greater than 0",
                "Warning: Adjusted lateral torque limit changes the balance verdict",
            ),
            longitudinal: load_f64_with_warning(
                Self::LONGITUDINAL_LIMIT_VAR,
                TorqueLimits::DEFAULT_LONGITUDINAL,
                |value| value > 0.0,
                "must be greater than 0",
                "Warning: Adjusted longitudinal torque limit changes the balance verdict",
            ),
        };

        let fine_threshold = load_f64_with_warning(
            Self::FINE_THRESHOLD_VAR,
            InteractionConfig::DEFAULT_FINE_THRESHOLD,
            |value| value >= 0.0,
            "must not be negative",
            "Warning: Adjusted snap threshold changes drag precision",
        );

        let medium_threshold = load_f64_with_warning(
            Self::MEDIUM_THRESHOLD_VAR,
            InteractionConfig::DEFAULT_MEDIUM_THRESHOLD,
            |value| value >= fine_threshold,
            "must not be below the fine threshold",
            "Warning: Adjusted snap threshold changes drag precision",
        );

        let notify_ms = load_f64_with_warning(
            Self::NOTIFY_INTERVAL_VAR,
            InteractionConfig::DEFAULT_NOTIFY_INTERVAL.as_millis() as f64,
            |value| (0.0..=10_000.0).contains(&value),
            "must be between 0 and 10000",
            "Warning: Adjusted drag notification interval changes update frequency",
        );

        let adjacency_overlap = load_f64_with_warning(
            Self::ADJACENCY_OVERLAP_VAR,
            InteractionConfig::DEFAULT_ADJACENCY_OVERLAP_THRESHOLD,
            |value| value >= 0.0,
            "must not be negative",
            "Warning: Adjusted adjacency overlap changes which boxes can be swapped",
        );

        let adjacency_gap = load_f64_with_warning(
            Self::ADJACENCY_GAP_VAR,
            InteractionConfig::DEFAULT_ADJACENCY_GAP_THRESHOLD,
            |value| value >= 0.0,
            "must not be negative",
            "Warning: Adjusted adjacency gap changes which boxes can be swapped",
        );

        let swap_policy = env_string(Self::SWAP_POLICY_VAR)
            .and_then(|raw| {
                let parsed = SwapPolicy::parse(&raw);
                if parsed.is_none() {
                    eprintln!(
                        "⚠️ Could not interpret {} ('{}') as swap policy (strict|permissive). Using default value.",
                        Self::SWAP_POLICY_VAR,
                        raw
                    );
                }
                parsed
            })
            .unwrap_or_default();

        let grid_cell_size = load_f64_with_warning(
            Self::GRID_CELL_VAR,
            crate::spatial_grid::DEFAULT_CELL_SIZE,
            |value| value > 0.0,
            "must be greater than 0",
            "Warning: Adjusted grid cell size may slow down collision queries",
        );

        let use_index = env_string(Self::USE_INDEX_VAR)
            .and_then(|raw| parse_bool(&raw, Self::USE_INDEX_VAR))
            .unwrap_or(true);

        let placement = PlacementConfig::builder()
            .search_step(search_step)
            .allow_rotation(allow_rotation)
            .torque_limits(torque_limits)
            .build();

        let interaction = InteractionConfig::builder()
            .thresholds(fine_threshold, medium_threshold)
            .notify_interval(Duration::from_millis(notify_ms as u64))
            .adjacency_overlap_threshold(adjacency_overlap)
            .adjacency_gap_threshold(adjacency_gap)
            .swap_policy(swap_policy)
            .grid_cell_size(grid_cell_size)
            .use_index(use_index)
            .build();

        Self {
            placement,
            interaction,
        }
    }

    /// Returns the configured PlacementConfig.
    pub fn placement_config(&self) -> PlacementConfig {
        self.placement
    }

    /// Returns the configured InteractionConfig.
    pub fn interaction_config(&self) -> InteractionConfig {
        self.interaction
    }

    pub fn torque_limits(&self) -> TorqueLimits {
        self.placement.torque_limits
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            eprintln!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name, err
            );
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            eprintln!(
                "⚠️ Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => {
                if !validator(value) {
                    eprintln!(
                        "⚠️ {} contains invalid value '{}': {}. Using {}.",
                        var_name, raw, invalid_hint, default
                    );
                    default
                } else {
                    let tolerance = (default.abs().max(1.0)) * 1e-9;
                    if (value - default).abs() > tolerance {
                        println!("⚠️ {} ({} = {}).", warning, var_name, value);
                    }
                    value
                }
            }
            Ok(value) => {
                eprintln!(
                    "⚠️ {} must be a finite number, got {}. Using {}.",
                    var_name, value, default
                );
                default
            }
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}
