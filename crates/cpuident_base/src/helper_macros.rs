//! Helper macros


/// Get the name of the surrounding function
/// 
/// Expands to the full path of the function, e.g. `cpuident_core::walk::walk_cache_topology`.
#[macro_export]
macro_rules! func_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            core::any::type_name::<T>()
        }
        let name = type_name_of(f);
        match name.strip_suffix("::f") {
            Some(stripped) => stripped,
            None => name,
        }
    }};
}
