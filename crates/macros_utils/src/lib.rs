//! Small declarative helpers shared by the HTTP binaries.

#[cfg(feature = "actix")]
#[doc(hidden)]
pub use actix_web;

/// Generate a `routes` function that registers handlers on an actix
/// `ServiceConfig`.
///
/// `route name` registers a handler produced by the actix route macros,
/// `module name` delegates to `name::routes`.
///
/// ```ignore
/// macros_utils::routes! {
///     route health_route,
///     module refresh,
/// }
/// ```
#[cfg(feature = "actix")]
#[macro_export]
macro_rules! routes {
    ($($kind:ident $name:ident),* $(,)?) => {
        pub fn routes(config: &mut $crate::actix_web::web::ServiceConfig) {
            $( $crate::__register_route!(config, $kind $name); )*
        }
    };
}

#[cfg(feature = "actix")]
#[doc(hidden)]
#[macro_export]
macro_rules! __register_route {
    ($config:ident, route $name:ident) => {
        $config.service($name);
    };
    ($config:ident, module $name:ident) => {
        $name::routes($config);
    };
}
