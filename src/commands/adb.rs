use std::path::Path;

use serde::Serialize;

/// Intent action used for deep links.
pub const ACTION_VIEW: &str = "android.intent.action.VIEW";

/// `-s <serial>` when a device is named, nothing otherwise.
pub fn device_args(device_id: Option<&str>) -> Vec<String> {
    match device_id.map(str::trim) {
        Some(id) if !id.is_empty() => vec!["-s".to_string(), id.to_string()],
        _ => Vec::new(),
    }
}

fn with_device(device_id: Option<&str>, rest: &[&str]) -> Vec<String> {
    let mut args = device_args(device_id);
    args.extend(rest.iter().map(|s| s.to_string()));
    args
}

pub fn list_devices() -> Vec<String> {
    vec!["devices".to_string(), "-l".to_string()]
}

pub fn shell(device_id: Option<&str>, command: &str) -> Vec<String> {
    with_device(device_id, &["shell", command])
}

pub fn screencap(device_id: Option<&str>) -> Vec<String> {
    with_device(device_id, &["exec-out", "screencap", "-p"])
}

pub fn install(device_id: Option<&str>, apk: &Path) -> Vec<String> {
    let apk = apk.to_string_lossy();
    with_device(device_id, &["install", "-r", &apk])
}

pub fn uninstall(device_id: Option<&str>, package: &str, keep_data: bool) -> Vec<String> {
    if keep_data {
        with_device(device_id, &["uninstall", "-k", package])
    } else {
        with_device(device_id, &["uninstall", package])
    }
}

/// What to launch with `am start`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentLaunch<'a> {
    pub package: &'a str,
    pub activity: Option<&'a str>,
    pub action: Option<&'a str>,
    pub data_uri: Option<&'a str>,
}

/// Builds the launch command.
///
/// With neither activity, action nor data the package's launcher activity is
/// started through `monkey`, which resolves it on-device.
pub fn start_activity(device_id: Option<&str>, launch: &IntentLaunch<'_>) -> Vec<String> {
    let activity = non_blank(launch.activity);
    let action = non_blank(launch.action);
    let data_uri = non_blank(launch.data_uri);

    if activity.is_none() && action.is_none() && data_uri.is_none() {
        return with_device(
            device_id,
            &[
                "shell",
                "monkey",
                "-p",
                launch.package,
                "-c",
                "android.intent.category.LAUNCHER",
                "1",
            ],
        );
    }

    let mut args = with_device(device_id, &["shell", "am", "start"]);
    if let Some(action) = action {
        args.push("-a".to_string());
        args.push(action.to_string());
    }
    if let Some(uri) = data_uri {
        args.push("-d".to_string());
        args.push(uri.to_string());
    }
    match activity {
        Some(activity) => {
            args.push("-n".to_string());
            args.push(format!("{}/{}", launch.package, activity));
        }
        None => {
            args.push("-p".to_string());
            args.push(launch.package.to_string());
        }
    }
    args
}

pub fn force_stop(device_id: Option<&str>, package: &str) -> Vec<String> {
    with_device(device_id, &["shell", "am", "force-stop", package])
}

pub fn clear_data(device_id: Option<&str>, package: &str) -> Vec<String> {
    with_device(device_id, &["shell", "pm", "clear", package])
}

pub fn dumpsys_activities(device_id: Option<&str>) -> Vec<String> {
    with_device(device_id, &["shell", "dumpsys", "activity", "activities"])
}

pub fn dump_hierarchy(device_id: Option<&str>) -> Vec<String> {
    with_device(device_id, &["exec-out", "uiautomator", "dump", "/dev/tty"])
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Output parsing
// ---------------------------------------------------------------------------

/// Serials of attached devices in the `device` state, in listing order.
pub fn parse_devices(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with("List of devices") && !line.starts_with('*'))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(serial), Some("device")) => Some(serial.to_string()),
                _ => None,
            }
        })
        .collect()
}

/// Foreground activity as reported by `dumpsys activity activities`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumedActivity {
    pub package: String,
    /// Fully qualified activity class name.
    pub activity: String,
    /// `package/activity` component as printed by the device.
    pub component: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityReport {
    Parsed(ResumedActivity),
    /// A resumed-activity line was found but held no component.
    Raw(String),
    Missing,
}

/// Best-effort extraction of the resumed activity.
///
/// Matches `mResumedActivity`, `topResumedActivity` and `ResumedActivity`
/// lines; the component is the first token containing `/`.
pub fn parse_resumed_activity(dumpsys: &str) -> ActivityReport {
    let Some(line) = dumpsys
        .lines()
        .map(str::trim)
        .find(|line| line.contains("ResumedActivity"))
    else {
        return ActivityReport::Missing;
    };

    let component = line
        .split_whitespace()
        .find(|token| token.contains('/'))
        .map(|token| token.trim_end_matches('}'));

    match component.and_then(|c| c.split_once('/').map(|(p, a)| (c, p, a))) {
        Some((component, package, activity)) if !package.is_empty() && !activity.is_empty() => {
            let activity = if activity.starts_with('.') {
                format!("{package}{activity}")
            } else {
                activity.to_string()
            };
            ActivityReport::Parsed(ResumedActivity {
                package: package.to_string(),
                activity,
                component: component.to_string(),
            })
        }
        _ => ActivityReport::Raw(line.to_string()),
    }
}

/// Drops the trailing "dumped to" notice uiautomator appends to the XML.
pub fn strip_dump_notice(output: &str) -> String {
    let cut = ["UI hierchary dumped to", "UI hierarchy dumped to"]
        .iter()
        .filter_map(|notice| output.rfind(notice))
        .min();
    match cut {
        Some(idx) => output[..idx].trim_end().to_string(),
        None => output.trim_end().to_string(),
    }
}

/// `am start` and `monkey` exit 0 on most failures; find the reported error.
pub fn launch_error(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("Error") || line.contains("monkey aborted"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_args() {
        assert!(device_args(None).is_empty());
        assert!(device_args(Some("  ")).is_empty());
        assert_eq!(device_args(Some("emulator-5554")), vec!["-s", "emulator-5554"]);
    }

    #[test]
    fn test_shell_and_install_vectors() {
        assert_eq!(
            shell(Some("abc"), "ls -la /sdcard"),
            vec!["-s", "abc", "shell", "ls -la /sdcard"]
        );
        assert_eq!(
            install(None, Path::new("/tmp/app.apk")),
            vec!["install", "-r", "/tmp/app.apk"]
        );
        assert_eq!(
            uninstall(None, "com.example", true),
            vec!["uninstall", "-k", "com.example"]
        );
        assert_eq!(uninstall(None, "com.example", false), vec!["uninstall", "com.example"]);
    }

    #[test]
    fn test_start_activity_without_target_uses_monkey() {
        let args = start_activity(
            None,
            &IntentLaunch {
                package: "com.example",
                ..Default::default()
            },
        );
        assert_eq!(
            args,
            vec![
                "shell",
                "monkey",
                "-p",
                "com.example",
                "-c",
                "android.intent.category.LAUNCHER",
                "1"
            ]
        );
    }

    #[test]
    fn test_start_activity_with_component_and_data() {
        let args = start_activity(
            Some("emulator-5554"),
            &IntentLaunch {
                package: "com.example",
                activity: Some(".MainActivity"),
                action: Some(ACTION_VIEW),
                data_uri: Some("example://home"),
            },
        );
        assert_eq!(
            args,
            vec![
                "-s",
                "emulator-5554",
                "shell",
                "am",
                "start",
                "-a",
                ACTION_VIEW,
                "-d",
                "example://home",
                "-n",
                "com.example/.MainActivity"
            ]
        );
    }

    #[test]
    fn test_start_activity_action_only_scopes_package() {
        let args = start_activity(
            None,
            &IntentLaunch {
                package: "com.example",
                action: Some(ACTION_VIEW),
                data_uri: Some("https://example.com"),
                ..Default::default()
            },
        );
        assert_eq!(args.last().map(String::as_str), Some("com.example"));
        assert!(args.contains(&"-p".to_string()));
    }

    #[test]
    fn test_parse_devices_skips_header_and_other_states() {
        let output = "* daemon started successfully\n\
                      List of devices attached\n\
                      emulator-5554          device product:sdk model:Pixel\n\
                      R58M123ABC             unauthorized usb:1-1\n\
                      192.168.1.5:5555       offline\n\
                      0123456789ABCDEF       device usb:2-1\n\n";
        assert_eq!(parse_devices(output), vec!["emulator-5554", "0123456789ABCDEF"]);
    }

    #[test]
    fn test_parse_devices_without_header() {
        assert_eq!(parse_devices("emulator-5554\tdevice\n"), vec!["emulator-5554"]);
        assert!(parse_devices("").is_empty());
    }

    #[test]
    fn test_parse_resumed_activity_relative_name() {
        let dumpsys = "ACTIVITY MANAGER ACTIVITIES\n  \
            mResumedActivity: ActivityRecord{3f2a1b u0 com.android.launcher3/.uioverrides.QuickstepLauncher t7}\n";
        assert_eq!(
            parse_resumed_activity(dumpsys),
            ActivityReport::Parsed(ResumedActivity {
                package: "com.android.launcher3".into(),
                activity: "com.android.launcher3.uioverrides.QuickstepLauncher".into(),
                component: "com.android.launcher3/.uioverrides.QuickstepLauncher".into(),
            })
        );
    }

    #[test]
    fn test_parse_resumed_activity_top_resumed_absolute_name() {
        let dumpsys =
            "    topResumedActivity=ActivityRecord{9c1 u0 com.example/com.example.ui.Main t42}";
        match parse_resumed_activity(dumpsys) {
            ActivityReport::Parsed(found) => {
                assert_eq!(found.package, "com.example");
                assert_eq!(found.activity, "com.example.ui.Main");
            }
            other => panic!("unexpected report: {other:?}"),
        }
    }

    #[test]
    fn test_parse_resumed_activity_fallbacks() {
        assert_eq!(
            parse_resumed_activity("  mResumedActivity: null"),
            ActivityReport::Raw("mResumedActivity: null".into())
        );
        assert_eq!(parse_resumed_activity("nothing here"), ActivityReport::Missing);
    }

    #[test]
    fn test_strip_dump_notice() {
        let output = "<?xml version='1.0'?><hierarchy rotation=\"0\"></hierarchy>UI hierchary dumped to: /dev/tty\n";
        assert_eq!(
            strip_dump_notice(output),
            "<?xml version='1.0'?><hierarchy rotation=\"0\"></hierarchy>"
        );
        assert_eq!(strip_dump_notice("<hierarchy/>\n"), "<hierarchy/>");
    }

    #[test]
    fn test_launch_error() {
        let ok = "Starting: Intent { cmp=com.example/.Main }\n";
        assert!(launch_error(ok).is_none());

        let failed = "Starting: Intent { cmp=com.example/.Missing }\n\
                      Error type 3\n\
                      Error: Activity class {com.example/com.example.Missing} does not exist.\n";
        assert_eq!(launch_error(failed).as_deref(), Some("Error type 3"));

        let monkey = "** No activities found to run, monkey aborted.\n";
        assert!(launch_error(monkey).is_some());
    }
}
