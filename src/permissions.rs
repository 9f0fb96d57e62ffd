/*!
 * # Permissions Module
 *
 * Named capabilities for the administrative address operations. This is a
 * catalog for an external authorization layer; nothing here enforces them.
 */

use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::HashMap;

/// Permission definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Permission {
    pub name: String,
    pub description: String,
    /// Granted to every role when the permission is seeded
    pub is_default: bool,
}

/// Permission string constants for compile-time safety
pub mod consts {
    pub const ADDRESSES_UPDATE: &str = "core.addresses.update";
    pub const ADDRESSES_STORE: &str = "core.addresses.store";
    pub const ADDRESSES_DESTROY: &str = "core.addresses.destroy";
    pub const ADDRESSES_INDEX: &str = "core.addresses.index";
    pub const ADDRESSES_MAKE_DEFAULT: &str = "core.addresses.makeDefault";
    pub const ADDRESSES_EDIT: &str = "core.addresses.edit";
    pub const ADDRESSES_LOCALIZE: &str = "core.addresses.localize";
    pub const ADDRESSES_CREATE: &str = "core.addresses.create";
    pub const ADDRESSES_OPTIONS: &str = "core.addresses.options";
    pub const ADDRESSES_LOCALITIES: &str = "core.addresses.localities";
    pub const ADDRESSES_REGIONS: &str = "core.addresses.regions";
}

const CATALOG: [(&str, &str); 11] = [
    (consts::ADDRESSES_UPDATE, "Update edited address"),
    (consts::ADDRESSES_STORE, "Store newly created address"),
    (consts::ADDRESSES_DESTROY, "Delete address"),
    (consts::ADDRESSES_INDEX, "Get addresses for addressable"),
    (consts::ADDRESSES_MAKE_DEFAULT, "Make address as default"),
    (consts::ADDRESSES_EDIT, "Get edit form"),
    (consts::ADDRESSES_LOCALIZE, "Get lat/long data for an address"),
    (consts::ADDRESSES_CREATE, "Get create form"),
    (consts::ADDRESSES_OPTIONS, "Get addresses for select"),
    (consts::ADDRESSES_LOCALITIES, "Get localities for the select"),
    (consts::ADDRESSES_REGIONS, "Get regions for the select"),
];

lazy_static! {
    pub static ref PERMISSIONS: HashMap<String, Permission> = CATALOG
        .iter()
        .map(|(name, description)| {
            (
                name.to_string(),
                Permission {
                    name: name.to_string(),
                    description: description.to_string(),
                    is_default: false,
                },
            )
        })
        .collect();
}

/// Get a permission by name
pub fn get_permission(name: &str) -> Option<&'static Permission> {
    PERMISSIONS.get(name)
}

/// All permissions in declaration order
pub fn all_permissions() -> Vec<&'static Permission> {
    CATALOG
        .iter()
        .filter_map(|(name, _)| PERMISSIONS.get(*name))
        .collect()
}
