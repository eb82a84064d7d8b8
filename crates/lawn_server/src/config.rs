use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub const ACTION_CHANNEL_CAPACITY: usize = 256;

/// TCP control-channel port.
pub fn control_port() -> u16 {
    env::var("LAWN_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(12345)
}

/// First UDP port tried when a room needs a datagram endpoint.
pub fn udp_port_base() -> u16 {
    env::var("LAWN_UDP_PORT_BASE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(12347)
}

/// How many ports past the base to try; bounds the number of live rooms.
pub fn udp_port_span() -> u16 {
    env::var("LAWN_UDP_PORT_SPAN")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(100)
}

/// Host advertised to clients in `UDP:<host>:<port>` replies.
pub fn public_host() -> String {
    env::var("LAWN_PUBLIC_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())
}

/// Fixed interval of the authoritative room tick loop.
pub fn tick_interval() -> Duration {
    let millis = env::var("LAWN_TICK_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(50);
    Duration::from_millis(millis)
}

/// Simulated seconds per real second. Leave at 1.0 outside of balancing
/// and test runs.
pub fn time_scale() -> f32 {
    env::var("LAWN_TIME_SCALE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1.0)
}
