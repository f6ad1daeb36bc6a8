//! Tool definitions and handlers.
//!
//! Each tool translates its typed arguments into an adb or Gradle argument
//! vector, runs it through the executor, and maps the outcome to a result
//! value or an error. Registration order here is the order clients see.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::commands::adb::{self, ActivityReport, IntentLaunch};
use crate::commands::{classify, gradle, stderr_or_stdout, Captured};
use crate::config::ServerConfig;
use crate::errors::{AdbMcpError, Result};
use crate::process::locator::ensure_executable;
use crate::process::{BoxFuture, Executor, ProcessSpec};

use super::registry::{ArgSpec, ArgType, ToolDescriptor, ToolRegistry};

const DEVICE_ID: ArgSpec = ArgSpec::optional("deviceId", ArgType::String, "Optional device serial");
const PACKAGE_NAME: ArgSpec = ArgSpec::required("packageName", ArgType::String, "Package name");

/// Shared state handed to every tool handler.
pub struct ToolContext {
    executor: Arc<dyn Executor>,
    config: ServerConfig,
}

impl ToolContext {
    pub fn new(executor: Arc<dyn Executor>, config: ServerConfig) -> Self {
        Self { executor, config }
    }

    /// Runs adb with the device-command budget.
    async fn adb(&self, args: Vec<String>) -> Result<Captured> {
        let timeout = self.config.command_timeout();
        let spec = ProcessSpec::new(self.config.adb_path.clone(), args, timeout);
        let outcome = self.executor.execute(spec).await;
        classify("adb", timeout, outcome, stderr_or_stdout)
    }
}

/// Builds the registry of every tool this server exposes.
pub fn standard_registry() -> Result<ToolRegistry> {
    ToolRegistry::builder()
        .register(
            ToolDescriptor {
                name: "list_devices",
                description: "List connected Android devices",
                args: vec![],
            },
            list_devices,
        )
        .register(
            ToolDescriptor {
                name: "adb_shell",
                description: "Execute an arbitrary adb shell command",
                args: vec![
                    ArgSpec::required(
                        "command",
                        ArgType::String,
                        "Shell command to execute on device",
                    ),
                    DEVICE_ID,
                ],
            },
            adb_shell,
        )
        .register(
            ToolDescriptor {
                name: "get_screenshot",
                description: "Capture a screenshot from the device (base64-encoded PNG)",
                args: vec![DEVICE_ID],
            },
            get_screenshot,
        )
        .register(
            ToolDescriptor {
                name: "install_apk",
                description: "Install an APK on the device",
                args: vec![
                    ArgSpec::required("path", ArgType::String, "Path to APK on the host"),
                    DEVICE_ID,
                ],
            },
            install_apk,
        )
        .register(
            ToolDescriptor {
                name: "uninstall_package",
                description: "Uninstall an application",
                args: vec![
                    ArgSpec::required("packageName", ArgType::String, "Package name to uninstall"),
                    ArgSpec::optional(
                        "keepData",
                        ArgType::Boolean,
                        "Keep data and cache directories",
                    ),
                    DEVICE_ID,
                ],
            },
            uninstall_package,
        )
        .register(
            ToolDescriptor {
                name: "start_activity",
                description: "Launch an application or a specific Activity",
                args: vec![
                    PACKAGE_NAME,
                    ArgSpec::optional(
                        "activityName",
                        ArgType::String,
                        "Optional activity class name",
                    ),
                    ArgSpec::optional("action", ArgType::String, "Optional intent action"),
                    ArgSpec::optional("dataUri", ArgType::String, "Optional intent data URI"),
                    DEVICE_ID,
                ],
            },
            start_activity,
        )
        .register(
            ToolDescriptor {
                name: "deep_link",
                description: "Open application using a deep link URI",
                args: vec![
                    PACKAGE_NAME,
                    ArgSpec::required("uri", ArgType::String, "Deep link URI"),
                    ArgSpec::optional(
                        "activityName",
                        ArgType::String,
                        "Optional specific activity to handle the link",
                    ),
                    DEVICE_ID,
                ],
            },
            deep_link,
        )
        .register(
            ToolDescriptor {
                name: "force_stop",
                description: "Force stop a running application",
                args: vec![PACKAGE_NAME, DEVICE_ID],
            },
            force_stop,
        )
        .register(
            ToolDescriptor {
                name: "clear_app_data",
                description: "Clear application data",
                args: vec![PACKAGE_NAME, DEVICE_ID],
            },
            clear_app_data,
        )
        .register(
            ToolDescriptor {
                name: "current_activity",
                description: "Retrieve the current foreground activity",
                args: vec![DEVICE_ID],
            },
            current_activity,
        )
        .register(
            ToolDescriptor {
                name: "dump_hierarchy",
                description: "Dump the UI hierarchy XML using uiautomator",
                args: vec![DEVICE_ID],
            },
            dump_hierarchy,
        )
        .register(
            ToolDescriptor {
                name: "gradle_assemble",
                description: "Compile Android project",
                args: vec![
                    ArgSpec::required(
                        "projectPath",
                        ArgType::String,
                        "Absolute path to project root",
                    ),
                    ArgSpec::optional(
                        "buildType",
                        ArgType::String,
                        "Build type (e.g. Debug, Release). Defaults to Debug.",
                    ),
                ],
            },
            gradle_assemble,
        )
        .build()
}

// ---------------------------------------------------------------------------
// Argument records
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceArgs {
    device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShellArgs {
    command: String,
    device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstallApkArgs {
    path: String,
    device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UninstallPackageArgs {
    package_name: String,
    #[serde(default)]
    keep_data: bool,
    device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartActivityArgs {
    package_name: String,
    activity_name: Option<String>,
    action: Option<String>,
    data_uri: Option<String>,
    device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeepLinkArgs {
    package_name: String,
    uri: String,
    activity_name: Option<String>,
    device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageArgs {
    package_name: String,
    device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GradleAssembleArgs {
    project_path: String,
    build_type: Option<String>,
}

fn decode<T: DeserializeOwned>(args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| AdbMcpError::Arguments(e.to_string()))
}

fn ok() -> Value {
    Value::String("ok".to_string())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn list_devices(ctx: &ToolContext, _args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let out = ctx.adb(adb::list_devices()).await?;
        let serials = adb::parse_devices(&out.stdout_text());
        Ok(Value::String(serials.join("\n")))
    })
}

fn adb_shell(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: ShellArgs = decode(args)?;
        if args.command.trim().is_empty() {
            return Err(AdbMcpError::InvalidArgument {
                field: "command".to_string(),
                expected: "non-empty string".to_string(),
            });
        }
        let out = ctx
            .adb(adb::shell(args.device_id.as_deref(), &args.command))
            .await?;
        Ok(Value::String(out.stdout_text().trim_end().to_string()))
    })
}

fn get_screenshot(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: DeviceArgs = decode(args)?;
        let out = ctx.adb(adb::screencap(args.device_id.as_deref())).await?;
        if out.stdout.is_empty() {
            return Err(AdbMcpError::CommandFailed {
                program: "adb".to_string(),
                exit_code: 0,
                detail: "screencap produced no image data".to_string(),
            });
        }
        Ok(Value::String(BASE64.encode(&out.stdout)))
    })
}

fn install_apk(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: InstallApkArgs = decode(args)?;
        let apk = PathBuf::from(&args.path);
        if !apk.is_file() {
            return Err(AdbMcpError::NotFound {
                message: "APK not found".to_string(),
                path: args.path,
            });
        }
        let apk = fs::canonicalize(&apk)?;
        let out = ctx
            .adb(adb::install(args.device_id.as_deref(), &apk))
            .await?;
        reject_failure_line(&out)?;
        Ok(ok())
    })
}

fn uninstall_package(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: UninstallPackageArgs = decode(args)?;
        let out = ctx
            .adb(adb::uninstall(
                args.device_id.as_deref(),
                &args.package_name,
                args.keep_data,
            ))
            .await?;
        reject_failure_line(&out)?;
        Ok(ok())
    })
}

fn start_activity(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: StartActivityArgs = decode(args)?;
        let launch = IntentLaunch {
            package: &args.package_name,
            activity: args.activity_name.as_deref(),
            action: args.action.as_deref(),
            data_uri: args.data_uri.as_deref(),
        };
        launch_intent(ctx, args.device_id.as_deref(), &launch).await
    })
}

fn deep_link(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: DeepLinkArgs = decode(args)?;
        let launch = IntentLaunch {
            package: &args.package_name,
            activity: args.activity_name.as_deref(),
            action: Some(adb::ACTION_VIEW),
            data_uri: Some(&args.uri),
        };
        launch_intent(ctx, args.device_id.as_deref(), &launch).await
    })
}

async fn launch_intent(
    ctx: &ToolContext,
    device_id: Option<&str>,
    launch: &IntentLaunch<'_>,
) -> Result<Value> {
    let out = ctx.adb(adb::start_activity(device_id, launch)).await?;
    let text = format!("{}\n{}", out.stdout_text(), out.stderr_text());
    if let Some(line) = adb::launch_error(&text) {
        return Err(AdbMcpError::CommandFailed {
            program: "adb".to_string(),
            exit_code: 0,
            detail: line,
        });
    }
    Ok(ok())
}

fn force_stop(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: PackageArgs = decode(args)?;
        ctx.adb(adb::force_stop(args.device_id.as_deref(), &args.package_name))
            .await?;
        Ok(ok())
    })
}

fn clear_app_data(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: PackageArgs = decode(args)?;
        let out = ctx
            .adb(adb::clear_data(args.device_id.as_deref(), &args.package_name))
            .await?;
        let stdout = out.stdout_text();
        if !stdout.contains("Success") {
            return Err(AdbMcpError::CommandFailed {
                program: "adb".to_string(),
                exit_code: 0,
                detail: stderr_or_stdout(&out),
            });
        }
        Ok(ok())
    })
}

fn current_activity(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: DeviceArgs = decode(args)?;
        let out = ctx
            .adb(adb::dumpsys_activities(args.device_id.as_deref()))
            .await?;
        match adb::parse_resumed_activity(&out.stdout_text()) {
            ActivityReport::Parsed(found) => Ok(serde_json::to_value(found)?),
            ActivityReport::Raw(line) => Ok(Value::String(line)),
            ActivityReport::Missing => Ok(Value::String(
                "no resumed activity reported".to_string(),
            )),
        }
    })
}

fn dump_hierarchy(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: DeviceArgs = decode(args)?;
        let out = ctx
            .adb(adb::dump_hierarchy(args.device_id.as_deref()))
            .await?;
        Ok(Value::String(adb::strip_dump_notice(&out.stdout_text())))
    })
}

fn gradle_assemble(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: GradleAssembleArgs = decode(args)?;
        let project_dir = PathBuf::from(&args.project_path);
        if !project_dir.is_dir() {
            return Err(AdbMcpError::NotFound {
                message: "project directory not found".to_string(),
                path: args.project_path,
            });
        }
        // The child resolves a relative program path against its new cwd.
        let project_dir = fs::canonicalize(&project_dir)?;

        let wrapper = gradle::wrapper_path(&project_dir);
        if wrapper.is_file() {
            if let Err(err) = ensure_executable(&wrapper) {
                warn!(wrapper = %wrapper.display(), error = %err, "could not mark wrapper executable");
            }
        }

        let build_type = args
            .build_type
            .as_deref()
            .unwrap_or(gradle::DEFAULT_BUILD_TYPE);
        let timeout = ctx.config.build_timeout();
        let spec = ProcessSpec::new(wrapper, gradle::assemble(build_type), timeout)
            .in_dir(&project_dir);
        debug!(project = %project_dir.display(), task = %gradle::assemble_task(build_type), "starting gradle build");

        let outcome = ctx.executor.execute(spec).await;
        let out = classify("gradle", timeout, outcome, gradle::failure_detail)?;
        Ok(Value::String(gradle::build_log(&out)))
    })
}

/// adb install/uninstall print `Failure [...]`, sometimes with exit status 0.
fn reject_failure_line(out: &Captured) -> Result<()> {
    let text = format!("{}\n{}", out.stdout_text(), out.stderr_text());
    match text
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("Failure") || l.contains("Failure ["))
    {
        Some(line) => Err(AdbMcpError::CommandFailed {
            program: "adb".to_string(),
            exit_code: 0,
            detail: line.to_string(),
        }),
        None => Ok(()),
    }
}
