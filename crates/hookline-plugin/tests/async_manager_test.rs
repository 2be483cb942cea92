//! Integration tests for the asynchronous manager.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use hookline_plugin::ErrorKind;
use hookline_plugin::prelude::*;

use helpers::Explosion;

fn bundler_hooks() -> HookDeclarations {
    declare_hooks! {
        "config" => Hook::parallel_workflow(),
        "modifyEntry" => Hook::async_waterfall(),
        "beforeBuild" => Hook::async_workflow(),
        "serve" => Hook::async_pipeline_with_last(|input| json!({ "fallback": input })),
    }
}

#[tokio::test]
async fn test_setups_run_concurrently() {
    let manager = create_async_manager(bundler_hooks());
    let ready = Arc::new(Notify::new());

    let waiting = {
        let ready = Arc::clone(&ready);
        manager.create_plugin(
            move || {
                let ready = Arc::clone(&ready);
                async move {
                    ready.notified().await;
                    Ok::<_, anyhow::Error>(
                        HookImpls::new().worker("config", |_| Ok(Some(json!("waiting")))),
                    )
                }
            },
            PluginOptions::named("waiting"),
        )
    };
    let signalling = {
        let ready = Arc::clone(&ready);
        manager.create_plugin(
            move || {
                let ready = Arc::clone(&ready);
                async move {
                    ready.notify_one();
                    Ok::<_, anyhow::Error>(
                        HookImpls::new().worker("config", |_| Ok(Some(json!("signalling")))),
                    )
                }
            },
            PluginOptions::named("signalling"),
        )
    };

    manager.use_plugin([waiting, signalling]);
    let runners = tokio::time::timeout(Duration::from_secs(5), manager.init())
        .await
        .expect("setups should not wait on each other")
        .unwrap();

    let configs = runners
        .parallel_workflow("config")
        .unwrap()
        .run(json!({}))
        .await
        .unwrap();
    assert_eq!(configs, vec![json!("waiting"), json!("signalling")]);
}

#[tokio::test]
async fn test_setup_failure_is_returned_unchanged() {
    let manager = create_async_manager(bundler_hooks());
    let broken = manager.create_plugin(
        || async { Err::<HookImpls, _>(anyhow::Error::new(Explosion("async"))) },
        PluginOptions::named("broken"),
    );
    let fine = manager.create_plugin(
        || async { Ok::<_, anyhow::Error>(HookImpls::new()) },
        PluginOptions::named("fine"),
    );

    manager.use_plugin([fine, broken]);
    let err = manager.init().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Handler);
    assert!(err.handler_error().unwrap().is::<Explosion>());
}

#[tokio::test]
async fn test_parallel_workflow_drops_empty_answers() {
    let manager = create_async_manager(bundler_hooks());
    let silent = manager.create_plugin(
        || async {
            Ok::<_, anyhow::Error>(HookImpls::new().async_worker("config", |_| async {
                tokio::task::yield_now().await;
                Ok(None)
            }))
        },
        PluginOptions::named("silent"),
    );
    let loud = manager.create_plugin(
        || async {
            Ok::<_, anyhow::Error>(
                HookImpls::new().worker("config", |input: Value| Ok(Some(input))),
            )
        },
        PluginOptions::named("loud"),
    );

    manager.use_plugin([silent, loud]);
    let runners = manager.init().await.unwrap();
    let configs = runners
        .parallel_workflow("config")
        .unwrap()
        .run(json!({ "mode": "dev" }))
        .await
        .unwrap();

    assert_eq!(configs, vec![json!({ "mode": "dev" })]);
}

#[tokio::test]
async fn test_runs_in_separate_containers_stay_isolated() {
    let stage: Context<String> = Context::new("none".into());
    let manager = create_async_manager(bundler_hooks());

    let reader = {
        let stage = stage.clone();
        manager.create_plugin(
            move || {
                let stage = stage.clone();
                async move {
                    Ok::<_, anyhow::Error>(HookImpls::new().async_brook(
                        "modifyEntry",
                        move |input: Value| {
                            let stage = stage.clone();
                            async move {
                                tokio::task::yield_now().await;
                                let seen = stage.get();
                                tokio::task::yield_now().await;
                                Ok(json!(format!("{}:{}", input.as_str().unwrap_or_default(), seen)))
                            }
                        },
                    ))
                }
            },
            PluginOptions::named("reader"),
        )
    };

    manager.use_plugin([reader]);
    let runners = manager.init().await.unwrap();
    let modify = runners.async_waterfall("modifyEntry").unwrap();

    let (dev, prod) = (create_container(), create_container());
    stage.set_in(&dev, "dev".into());
    stage.set_in(&prod, "prod".into());

    let (a, b) = tokio::join!(
        modify.run_in(&dev, json!("a")),
        modify.run_in(&prod, json!("b")),
    );

    assert_eq!(a.unwrap(), json!("a:dev"));
    assert_eq!(b.unwrap(), json!("b:prod"));
    assert_eq!(modify.run(json!("c")).await.unwrap(), json!("c:none"));
}

#[tokio::test]
async fn test_async_pipeline_falls_back_to_last() {
    let manager = create_async_manager(bundler_hooks());
    let logger = manager.create_plugin(
        || async {
            Ok::<_, anyhow::Error>(HookImpls::new().async_middleware(
                "serve",
                |input: Value, next: AsyncNext| async move {
                    let output = next.run(input).await?;
                    Ok(json!({ "logged": output }))
                },
            ))
        },
        PluginOptions::named("logger"),
    );

    manager.use_plugin([logger]);
    let runners = manager.init().await.unwrap();
    let output = runners
        .async_pipeline("serve")
        .unwrap()
        .run(json!("/index"))
        .await
        .unwrap();

    assert_eq!(output, json!({ "logged": { "fallback": "/index" } }));
}

#[tokio::test]
async fn test_before_build_workflow_uses_run_scope() {
    let target: Context<&'static str> = Context::new("web");
    let manager = create_async_manager(bundler_hooks());

    let guard = {
        let target = target.clone();
        manager.create_plugin(
            move || {
                let target = target.clone();
                async move {
                    Ok::<_, anyhow::Error>(HookImpls::new().async_worker(
                        "beforeBuild",
                        move |_| {
                            let target = target.clone();
                            async move {
                                if target.get() == "node" {
                                    Ok(Some(json!("skip")))
                                } else {
                                    Ok(None)
                                }
                            }
                        },
                    ))
                }
            },
            PluginOptions::named("guard"),
        )
    };

    manager.use_plugin([guard]);
    let runners = manager.init().await.unwrap();
    let before_build = runners.async_workflow("beforeBuild").unwrap();

    assert_eq!(before_build.run(json!(null)).await.unwrap(), None);

    let node = create_container();
    manager
        .run_async_with(
            async {
                target.set("node").unwrap();
            },
            InitOptions::with_container(node.clone()),
        )
        .await;

    assert_eq!(
        before_build.run_in(&node, json!(null)).await.unwrap(),
        Some(json!("skip"))
    );
}

#[tokio::test]
async fn test_concurrent_inits_keep_their_containers() {
    let stage: Context<String> = Context::new("none".into());
    let seen: Context<String> = Context::new(String::new());
    let manager = create_async_manager(bundler_hooks());

    let tracker = {
        let (stage, seen) = (stage.clone(), seen.clone());
        manager.create_plugin(
            move || {
                let (stage, seen) = (stage.clone(), seen.clone());
                async move {
                    tokio::task::yield_now().await;
                    let before = stage.get();
                    tokio::task::yield_now().await;
                    seen.set(format!("{before}/{}", stage.get()))?;

                    let reader = stage.clone();
                    Ok::<_, anyhow::Error>(
                        HookImpls::new().brook("modifyEntry", move |_| Ok(json!(reader.get()))),
                    )
                }
            },
            PluginOptions::named("tracker"),
        )
    };
    manager.use_plugin([tracker]);

    let (a, b) = (create_container(), create_container());
    stage.set_in(&a, "a".into());
    stage.set_in(&b, "b".into());

    let (runners_a, runners_b) = tokio::join!(
        manager.init_with(InitOptions::with_container(a.clone())),
        manager.init_with(InitOptions::with_container(b.clone())),
    );
    let (runners_a, runners_b) = (runners_a.unwrap(), runners_b.unwrap());

    assert_eq!(seen.get_in(&a), "a/a");
    assert_eq!(seen.get_in(&b), "b/b");
    assert_eq!(seen.get_in(manager.container()), "");

    let modify_a = runners_a.async_waterfall("modifyEntry").unwrap();
    let modify_b = runners_b.async_waterfall("modifyEntry").unwrap();
    assert_eq!(modify_a.run(json!(null)).await.unwrap(), json!("a"));
    assert_eq!(modify_b.run(json!(null)).await.unwrap(), json!("b"));

    let attached_a = manager
        .run_with(use_runner, InitOptions::with_container(a))
        .unwrap();
    let attached_b = manager
        .run_with(use_runner, InitOptions::with_container(b))
        .unwrap();
    assert!(attached_a.same(&runners_a));
    assert!(attached_b.same(&runners_b));
}
