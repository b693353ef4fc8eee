pub mod support;
pub mod dependency_tests;
pub mod version_tests;
pub mod ffi_tests;
