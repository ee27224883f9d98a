/// Cross-view hidden module check.
pub mod check_modules;
/// Image and profile summary command.
pub mod info;
/// Module list command.
pub mod lsmod;
/// Profile layout listing command.
pub mod profile;
/// Typed object render command.
pub mod show;
mod util;

#[cfg(test)]
mod test_support;
