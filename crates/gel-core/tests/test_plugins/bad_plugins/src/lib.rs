//! Declarations the loader must refuse. None of the function pointers is
//! ever called.
#![allow(dead_code)]

/// Same leading fields as gel-core's declaration
#[repr(C)]
pub struct Declaration {
    pub abi_version: u32,
    pub core_version: &'static str,
    pub descriptor: fn(),
    pub create: fn(),
}

fn never_called() {}

/// An ABI from the future
#[no_mangle]
pub static wrong_abi_plugin: Declaration = Declaration {
    abi_version: 999,
    core_version: "999.0.0",
    descriptor: never_called,
    create: never_called,
};

/// The right ABI, built against another engine version
#[no_mangle]
pub static stale_core_plugin: Declaration = Declaration {
    abi_version: 1,
    core_version: "0.0.0-stale",
    descriptor: never_called,
    create: never_called,
};

// A near miss of `absent_plugin`, which is not exported
#[no_mangle]
pub static absent_plugin_v2: u32 = 0;
