//! Built-in checks, in report order.

pub mod full_disk_access;
pub mod launch_items;
pub mod network;
pub mod processes;
pub mod scheduled_tasks;
pub mod sessions;
pub mod system_binaries;
pub mod system_extensions;
pub mod system_logs;

use super::Check;
use crate::error::Result;

/// Every built-in check, in the order they are reported.
pub fn all_checks() -> Result<Vec<Box<dyn Check>>> {
    Ok(vec![
        Box::new(network::check()?),
        Box::new(sessions::check()?),
        Box::new(processes::check()?),
        Box::new(scheduled_tasks::check()?),
        Box::new(launch_items::check()?),
        Box::new(system_binaries::check()?),
        Box::new(full_disk_access::check()?),
        Box::new(system_extensions::check()?),
        Box::new(system_logs::check()?),
    ])
}
