//! X11 owner lookup through `xprop`.
//!
//! The active window stands in for the clipboard owner: its WM_CLASS entries,
//! its title (and the application part after the last '-'), and the file name
//! of the binary behind `_NET_WM_PID`.

use std::fs;
use std::process::Command;

use tracing::debug;

use super::{push_name, OwnerNames};

pub fn active_window_names() -> OwnerNames {
    let mut names = OwnerNames::new();

    let Some(root) = xprop(&["-root", "_NET_ACTIVE_WINDOW"]) else {
        return names;
    };
    let Some(window_id) = parse_window_id(&root) else {
        debug!("No active window reported by the window manager");
        return names;
    };

    let Some(props) = xprop(&["-id", &window_id, "WM_CLASS", "WM_NAME", "_NET_WM_PID"]) else {
        return names;
    };

    for class in parse_class(&props) {
        push_name(&mut names, class);
    }

    if let Some(title) = property(&props, "WM_NAME").map(unquote) {
        if let Some(app) = title.rsplit('-').next() {
            push_name(&mut names, app);
        }
        push_name(&mut names, title);
    }

    if let Some(binary) = property(&props, "_NET_WM_PID")
        .and_then(|pid| pid.trim().parse::<u32>().ok())
        .and_then(binary_name)
    {
        push_name(&mut names, binary);
    }

    names
}

fn xprop(args: &[&str]) -> Option<String> {
    match Command::new("xprop").args(args).output() {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(output) => {
            debug!(
                component = "owner",
                operation = "xprop",
                status = ?output.status.code(),
                "xprop exited with failure"
            );
            None
        }
        Err(e) => {
            debug!(component = "owner", operation = "xprop", error = %e);
            None
        }
    }
}

/// Value of `NAME(TYPE) = value` in xprop output.
fn property<'a>(output: &'a str, name: &str) -> Option<&'a str> {
    output.lines().find_map(|line| {
        let rest = line.strip_prefix(name)?;
        if !rest.starts_with('(') {
            return None;
        }
        rest.split_once('=').map(|(_, value)| value.trim())
    })
}

fn parse_window_id(root_output: &str) -> Option<String> {
    let line = root_output
        .lines()
        .find(|line| line.starts_with("_NET_ACTIVE_WINDOW("))?;
    let id = line.split_whitespace().find(|word| word.starts_with("0x"))?;
    let id = id.trim_end_matches(',');
    // 0x0 means no window has focus
    (u64::from_str_radix(id.trim_start_matches("0x"), 16).ok()? != 0).then(|| id.to_string())
}

fn parse_class(props: &str) -> Vec<String> {
    property(props, "WM_CLASS")
        .map(|value| {
            value
                .split(',')
                .map(|class| unquote(class).to_string())
                .filter(|class| !class.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"')
}

fn binary_name(pid: u32) -> Option<String> {
    let exe = fs::read_link(format!("/proc/{}/exe", pid)).ok()?;
    exe.file_name().map(|name| name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROPS: &str = "WM_CLASS(STRING) = \"navigator\", \"Firefox\"\n\
                         WM_NAME(UTF8_STRING) = \"Inbox - Mozilla Firefox\"\n\
                         _NET_WM_PID(CARDINAL) = 4242\n";

    #[test]
    fn test_parse_window_id() {
        let root = "_NET_ACTIVE_WINDOW(WINDOW): window id # 0x3a00007\n";
        assert_eq!(parse_window_id(root).as_deref(), Some("0x3a00007"));
    }

    #[test]
    fn test_parse_window_id_no_focus() {
        let root = "_NET_ACTIVE_WINDOW(WINDOW): window id # 0x0\n";
        assert_eq!(parse_window_id(root), None);
    }

    #[test]
    fn test_parse_class_entries() {
        assert_eq!(parse_class(PROPS), vec!["navigator", "Firefox"]);
    }

    #[test]
    fn test_property_lookup() {
        assert_eq!(property(PROPS, "_NET_WM_PID"), Some("4242"));
        assert_eq!(
            property(PROPS, "WM_NAME").map(unquote),
            Some("Inbox - Mozilla Firefox")
        );
        assert_eq!(property(PROPS, "WM_ROLE"), None);
    }

    #[test]
    fn test_own_binary_name() {
        let name = binary_name(std::process::id());
        assert!(name.is_some_and(|n| !n.is_empty()));
    }
}
