pub mod local_tests;
pub mod settings_tests;
