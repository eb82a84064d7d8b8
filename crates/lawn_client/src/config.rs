use std::{env, time::Duration};

// Runtime configuration (gameplay tuning lives in lawn_core).

pub fn server_addr() -> String {
    env::var("LAWN_SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:12345".to_string())
}

pub fn room() -> String {
    env::var("LAWN_ROOM").unwrap_or_else(|_| "public".to_string())
}

/// `solo` runs the engine's spawn director locally with no networking.
pub fn solo_mode() -> bool {
    matches!(env::var("LAWN_MODE").as_deref(), Ok("solo"))
}

pub fn solo_seed() -> u64 {
    env::var("LAWN_SOLO_SEED")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        })
}

/// Local mirror tick interval; independent of the server's rate.
pub fn tick_interval() -> Duration {
    let millis = env::var("LAWN_CLIENT_TICK_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(33);
    Duration::from_millis(millis)
}
