use std::path::Path;

fn detach_child() {
    // Own session, so the command outlives us and ignores our terminal
    unsafe {
        libc::setsid();
    }
}

/// Splits an action hint of the form `cmd,arg1,arg2` into program and arguments.
pub fn parse_action_command(value: &str) -> Option<(String, Vec<String>)> {
    let mut parts = value.split(',').map(str::trim);
    let program = parts.next().filter(|program| !program.is_empty())?;

    Some((program.to_owned(), parts.map(str::to_owned).collect()))
}

/// Launches a command in its own session with stdout and stderr discarded.
/// GLib reaps the child, so nothing is left to wait for.
pub fn launch_detached(program: &str, args: &[String]) -> Result<(), gtk4::glib::Error> {
    let binding = gtk4::glib::environ();
    let envp: Vec<&Path> = binding
        .iter()
        .map(Path::new)
        .collect();

    let argv: Vec<&Path> = std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(Path::new)
        .collect();

    gtk4::glib::spawn_async(
        None::<&str>,
        &argv,
        &envp,
        gtk4::glib::SpawnFlags::SEARCH_PATH_FROM_ENVP
            | gtk4::glib::SpawnFlags::SEARCH_PATH
            | gtk4::glib::SpawnFlags::STDOUT_TO_DEV_NULL
            | gtk4::glib::SpawnFlags::STDERR_TO_DEV_NULL,
        Some(Box::new(detach_child)),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_and_arguments() {
        assert_eq!(
            parse_action_command("xdg-open,/tmp/file.txt"),
            Some(("xdg-open".to_owned(), vec!["/tmp/file.txt".to_owned()]))
        );
    }

    #[test]
    fn command_without_arguments() {
        assert_eq!(parse_action_command("gnome-calendar"), Some(("gnome-calendar".to_owned(), Vec::new())));
    }

    #[test]
    fn empty_command_is_ignored() {
        assert_eq!(parse_action_command(""), None);
        assert_eq!(parse_action_command(",arg"), None);
    }

    fn zombie_children() -> usize {
        let parent = std::process::id().to_string();
        let Ok(entries) = std::fs::read_dir("/proc") else {
            return 0;
        };

        entries
            .filter_map(Result::ok)
            .filter_map(|entry| std::fs::read_to_string(entry.path().join("stat")).ok())
            .filter(|stat| {
                // Fields after the parenthesised command name: state, ppid, ...
                let fields: Vec<&str> = stat.rsplit_once(')')
                    .map(|(_, rest)| rest.split_whitespace().take(2).collect())
                    .unwrap_or_default();
                fields.first() == Some(&"Z") && fields.get(1) == Some(&parent.as_str())
            })
            .count()
    }

    #[test]
    fn launched_commands_are_reaped() {
        let before = zombie_children();

        for _ in 0..3 {
            launch_detached("true", &[]).unwrap();
        }
        std::thread::sleep(std::time::Duration::from_millis(300));

        assert_eq!(zombie_children(), before);
    }

    #[test]
    fn missing_program_is_an_error() {
        assert!(launch_detached("bubble-notifier-no-such-program", &["x".to_owned()]).is_err());
    }
}
