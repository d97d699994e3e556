pub mod health;
pub mod sync;

pub use health::{
    check_http_server, check_server, check_server_blocking, check_servers, check_stdio_server,
    HealthStatus, DEFAULT_TIMEOUT,
};
pub use sync::{
    first_run_init, merge_servers, remove_from_platforms, sync_all, sync_project, ExitStatus,
    FirstRunReport, ProjectSyncReport, SyncReport, SyncService,
};
