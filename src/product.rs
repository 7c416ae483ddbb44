//! Builds the `Server` response header value, optionally disclosing host
//! information according to a [`ServerInfoLevel`].
//!
//! Grounded on `base/global_state.c`'s `GSPopulateProductName`, which
//! appends a parenthesized, space-separated list of `uname(2)` fields
//! (plus a Linux distribution description) gated by the same bitflags.
//! `uname(2)` itself has no single idiomatic Rust equivalent in the
//! corpus's dependency stack, so the fields are instead sourced from
//! `sysinfo`, the crate `hypernetix-hyperspot` reaches for host and OS
//! information.

use sysinfo::System;

use crate::options::ServerInfoLevel;

const BASE_PRODUCT_NAME: &str = "rampart";

/// Build the `Server` header value for `level`. Returns the bare product
/// name when `level` is [`ServerInfoLevel::NONE`], without even querying
/// system information in that case.
#[must_use]
pub fn build(level: ServerInfoLevel) -> String {
    if level == ServerInfoLevel::NONE {
        return BASE_PRODUCT_NAME.to_string();
    }

    let mut fields = Vec::new();

    if level.contains(ServerInfoLevel::KERNEL_NAME) {
        fields.push(System::name().unwrap_or_else(|| "unknown".to_string()));
    }
    if level.contains(ServerInfoLevel::HOST_NAME) {
        fields.push(
            hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string()),
        );
    }
    if level.contains(ServerInfoLevel::KERNEL_RELEASE) {
        fields.push(System::kernel_version().unwrap_or_else(|| "unknown".to_string()));
    }
    if level.contains(ServerInfoLevel::MACHINE) {
        fields.push(std::env::consts::ARCH.to_string());
    }
    if level.contains(ServerInfoLevel::DIST_DESCRIPTION) {
        fields.push(System::long_os_version().unwrap_or_else(|| "unknown".to_string()));
    }

    if fields.is_empty() {
        BASE_PRODUCT_NAME.to_string()
    } else {
        format!("{BASE_PRODUCT_NAME} ({})", fields.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_level_is_the_bare_product_name() {
        assert_eq!(build(ServerInfoLevel::NONE), "rampart");
    }

    #[test]
    fn machine_level_appends_architecture() {
        let product = build(ServerInfoLevel::MACHINE);
        assert!(product.starts_with("rampart ("));
        assert!(product.contains(std::env::consts::ARCH));
    }
}
