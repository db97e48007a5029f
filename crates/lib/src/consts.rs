/// Application name used for data directories.
pub const APP_NAME: &str = "workbench";

/// Workspace root override.
pub const ENV_ROOT: &str = "WORKBENCH_ROOT";

/// Default build type passed to configure commands.
pub const ENV_BUILD_TYPE: &str = "WORKBENCH_BUILD_TYPE";

/// Default generator passed to configure commands.
pub const ENV_GENERATOR: &str = "WORKBENCH_GENERATOR";

/// Container runtime used for container targets (docker, podman, ...).
pub const ENV_CONTAINER_RUNTIME: &str = "WORKBENCH_CONTAINER_RUNTIME";

/// Number of output lines retained for failure reports.
pub const ENV_TAIL_LINES: &str = "WORKBENCH_TAIL_LINES";

/// Path to a JSON target file.
pub const ENV_TARGETS: &str = "WORKBENCH_TARGETS";

pub const DEFAULT_BUILD_TYPE: &str = "Release";
pub const DEFAULT_GENERATOR: &str = "Ninja";
pub const DEFAULT_CONTAINER_RUNTIME: &str = "docker";
pub const DEFAULT_TAIL_LINES: usize = 200;

/// Build directory name inside each source tree, unless a target overrides it.
pub const DEFAULT_BUILD_DIR: &str = "build";

/// Exit code reported for a command that could not be spawned.
pub const EXIT_SPAWN_FAILED: i32 = 127;

/// Exit code reported for a command stopped by an interrupt.
pub const EXIT_INTERRUPTED: i32 = 130;
