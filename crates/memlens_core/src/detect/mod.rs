mod check_modules;
mod lsmod;
mod reconcile;

/// Hidden kernel module detection.
pub use check_modules::{CheckModules, CheckModulesOptions, MIN_MODULE_REFCOUNT, ModuleRow, check_modules};
/// The kernel's self-reported module list.
pub use lsmod::{lsmod_columns, lsmod_row, module_list, module_name};
/// Generic two-view reconciliation.
pub use reconcile::{CandidateRecord, CrossView, Phase, Reconciled, reconcile};
