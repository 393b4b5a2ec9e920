//! Instrumentation entry points.
//!
//! `profile_scope!` is a macro rather than a function so the call site's
//! file, line and enclosing function can be captured. Each expansion
//! interns its scope once and caches the key in a per-call-site
//! `OnceLock`; afterwards entering the scope costs one `OnceLock` load
//! plus the recorder push.

/// Resolve the path of the enclosing function at the call site.
///
/// Works by naming a zero-sized item inside the function and reading its
/// type name, then trimming the item's own segment.
#[doc(hidden)]
#[macro_export]
macro_rules! function_path {
    () => {{
        fn anchor() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let mut name = type_name_of(anchor);
        name = name.strip_suffix("::anchor").unwrap_or(name);
        // Expansions inside closures pick up closure segments; trim them
        // so the path names the enclosing function.
        while let Some(stripped) = name.strip_suffix("::{{closure}}") {
            name = stripped;
        }
        name
    }};
}

/// Profile the enclosing block as a named scope, optionally with a tag.
///
/// ```
/// fn simulate() {
///     framescope::profile_scope!(simulate);
///     // ... the scope ends when the function returns ...
/// }
/// ```
///
/// The guard introduced by the expansion exits the scope on every exit
/// path, including early returns and unwinding. Scopes on one thread
/// must nest, which the guard enforces by construction.
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_scope {
    ($name:ident) => {
        $crate::profile_scope!($name, $crate::settings::Tag::NONE)
    };
    ($name:ident, $tag:expr) => {
        let _framescope_guard = {
            static SCOPE: ::std::sync::OnceLock<$crate::profiler::ScopeKey> =
                ::std::sync::OnceLock::new();
            let key = *SCOPE.get_or_init(|| {
                $crate::profiler::global().insert_scope(
                    stringify!($name),
                    concat!(file!(), ":", line!()),
                    $crate::function_path!(),
                    file!(),
                    line!(),
                    $tag,
                )
            });
            $crate::profiler::ScopeGuard::enter(key)
        };
    };
}

/// With the `profiling` feature disabled the expansion is empty.
#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_scope {
    ($($args:tt)*) => {};
}

/// Assign a name to the calling thread.
///
/// Evaluates to `Result<bool, Error>`: `Ok(true)` when the name was
/// bound, `Ok(false)` when the thread already had an identity. Works
/// whether or not profiling is compiled in.
#[macro_export]
macro_rules! name_thread {
    ($name:expr) => {
        $crate::registry::assign_thread_name($name)
    };
}
