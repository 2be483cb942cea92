//! Reports on the generated entry once the build finishes.

use tracing::info;

use hookline_plugin::prelude::*;

pub fn setup() -> anyhow::Result<HookImpls> {
    Ok(HookImpls::new().async_worker("afterBuild", |report: Value| async move {
        let imports = report
            .get("entry")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        info!(imports, "Entry analysis");
        Ok(None)
    }))
}
