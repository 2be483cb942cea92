//! File-system routes: contributes config and an entry import.

use hookline_plugin::prelude::*;

use super::BuildSettings;

pub fn setup(settings: &Context<BuildSettings>) -> anyhow::Result<HookImpls> {
    let settings = settings.clone();

    Ok(HookImpls::new()
        .worker("config", |_| Ok(Some(json!({ "routes": "src/pages" }))))
        .worker("validateSchema", |config: Value| {
            match config.get("routes").and_then(Value::as_str) {
                Some(_) => Ok(None),
                None => Ok(Some(json!("router: `routes` must be a string"))),
            }
        })
        .async_brook("modifyEntryImports", move |entry: Value| {
            let settings = settings.clone();
            async move {
                let mode = settings.get().mode;
                let mut imports: Vec<Value> = serde_json::from_value(entry)?;
                imports.push(json!(format!("import routes from './routes?mode={mode}';")));
                Ok(Value::Array(imports))
            }
        }))
}
