//! Configuration system.
//!
//! Consolidates configuration from tiers with field-by-field YAML merging:
//! 1. **Defaults** - Built into the binary
//! 2. **Project** - `$CWD/ops-dashboard/config.yaml`
//! 3. **User** - `~/.ops-dashboard/config.yaml`
//! 4. **Environment** - variables below
//!
//! ## Environment Variables
//! - `OPS_DASHBOARD_CONFIG_PATH` - Explicit config file (replaces tiers 2-3)
//! - `OPS_DASHBOARD_DB_PATH` - Database path
//! - `OPS_DASHBOARD_PORT` - HTTP port
//! - `OPS_DASHBOARD_ADMIN_TOKEN` - Admin bearer token
//! - `OPS_DASHBOARD_USER_DIR` - User config dir (default: `~/.ops-dashboard`)
//! - `OPS_DASHBOARD_PROJECT_DIR` - Project config dir (default: `./ops-dashboard`)

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
