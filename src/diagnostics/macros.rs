//! Crate-internal logging macro.

/// Forward to the `log` crate when the `log` feature is enabled. Without it
/// the arguments are only type-checked.
macro_rules! ka_log {
    ($level:ident, $($arg:tt)+) => {{
        #[cfg(feature = "log")]
        {
            log::$level!(target: "kindalloc", $($arg)+);
        }
        #[cfg(not(feature = "log"))]
        {
            let _ = format_args!($($arg)+);
        }
    }};
}
