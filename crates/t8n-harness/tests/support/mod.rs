//! Applications this test binary can become when relaunched.

pub mod echo_app;
pub mod fixture_app;
