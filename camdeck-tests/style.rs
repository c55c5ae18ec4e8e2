//! Style Enforcement Tests
//!
//! - `panic_enforcement` - Production code propagates errors instead of
//!   calling `unwrap()` or `expect()`

#[path = "style/panic_enforcement.rs"]
mod panic_enforcement;
