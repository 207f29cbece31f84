pub fn get_home_directory() -> String {
    std::env::var("HOME").unwrap_or_else(|_| {
        warn!("HOME is not set, falling back to the working directory");
        ".".to_owned()
    })
}

pub fn get_config_directory() -> String {
    match std::env::var("XDG_CONFIG_HOME") {
        Ok(dir) if !dir.is_empty() => format!("{}/bubble-notifier", dir),
        _ => format!("{}/.config/bubble-notifier", get_home_directory()),
    }
}

pub fn get_local_state_directory() -> String {
    match std::env::var("XDG_STATE_HOME") {
        Ok(dir) if !dir.is_empty() => format!("{}/bubble-notifier", dir),
        _ => format!("{}/.local/state/bubble-notifier", get_home_directory()),
    }
}
