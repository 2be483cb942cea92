//! Convenience macros.

/// Builds a [`HookDeclarations`](crate::hooks::HookDeclarations) map.
///
/// # Example
/// ```rust,ignore
/// let hooks = declare_hooks! {
///     "config" => Hook::parallel_workflow(),
///     "beforeBuild" => Hook::async_workflow(),
/// };
/// ```
#[macro_export]
macro_rules! declare_hooks {
    () => {
        $crate::hooks::HookDeclarations::new()
    };
    ($($name:expr => $hook:expr),+ $(,)?) => {{
        let declarations = $crate::hooks::HookDeclarations::new();
        $(
            let declarations = declarations.with($name, $hook);
        )+
        declarations
    }};
}
