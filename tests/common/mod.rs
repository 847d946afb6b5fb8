#![allow(dead_code)]

pub mod synthetic_image;

/// Route `log` output through the test harness; safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
