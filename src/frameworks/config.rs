use crate::domain::ArenaTuning;
use std::{env, io, net::IpAddr, path::PathBuf};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("ARENA_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5001)
}

pub fn bind_addr() -> IpAddr {
    env::var("ARENA_BIND_ADDR")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

pub fn tuning_path() -> Option<PathBuf> {
    env::var_os("ARENA_TUNING_PATH")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Gameplay tuning: defaults, optionally overridden by a TOML file, then validated.
pub fn load_tuning() -> io::Result<ArenaTuning> {
    let tuning = match tuning_path() {
        Some(path) => {
            let raw = std::fs::read_to_string(&path).map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!("failed to read tuning file {}: {e}", path.display()),
                )
            })?;
            let tuning = parse_tuning(&raw)?;
            tracing::info!(path = %path.display(), "loaded arena tuning");
            tuning
        }
        None => ArenaTuning::default(),
    };

    tuning
        .validate()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("invalid tuning: {e}")))?;
    Ok(tuning)
}

fn parse_tuning(raw: &str) -> io::Result<ArenaTuning> {
    toml::from_str(raw).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("failed to parse tuning file: {e}"),
        )
    })
}

pub const COMMAND_CHANNEL_CAPACITY: usize = 1024;
pub const UPDATE_BROADCAST_CAPACITY: usize = 128;
// Per-viewer outbound queue; a viewer this far behind starts missing messages.
pub const VIEWER_CHANNEL_CAPACITY: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_tuning_file_is_not_toml_then_error_is_invalid_data() {
        let err = parse_tuning("player = [").expect_err("expected parse failure");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn when_tuning_file_overrides_floor_then_other_defaults_remain() {
        let tuning = parse_tuning("min_damage = 10\n").expect("expected tuning");
        assert_eq!(tuning.min_damage, 10);
        assert_eq!(tuning.enemy.hp, ArenaTuning::default().enemy.hp);
    }
}
