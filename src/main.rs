// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use glbc::{
    config::Config,
    constants::{ERROR_REQUEUE_DURATION_SECS, STEADY_REQUEUE_DURATION_SECS, TOKIO_WORKER_THREADS},
    context::Context,
    crd::Route,
    geo::GeoResolver,
    metrics,
    net::watcher::HostsWatcher,
    net::SystemResolver,
    reconcilers::certificate::KubeSecretStore,
    reconcilers::dns::KubeDnsRecordStore,
    tls::CertManagerProvider,
    traffic::{ObjectKey, TrafficIngress, TrafficResource, TrafficRoute},
};
use k8s_openapi::api::networking::v1::Ingress;
use kube::{
    api::PostParams,
    runtime::{controller::Action, reflector::ObjectRef, watcher, Controller},
    Api, Client, Resource,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("glbc-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Respects RUST_LOG for the filter and RUST_LOG_FORMAT (json/text) for
    // the output format.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    let config = Config::parse();
    info!(domain = %config.domain, "starting glbc controller");

    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized");

    let resolver: glbc::net::SharedHostResolver = Arc::new(SystemResolver::from_system_config()?);
    let geo = Arc::new(GeoResolver::new(
        config.geo_service_url.clone(),
        config.geo_dataset_dir.clone(),
    ));
    let (ingress_watcher, ingress_triggers) =
        HostsWatcher::new(Arc::clone(&resolver), config.host_watch_interval());
    let (route_watcher, route_triggers) =
        HostsWatcher::new(Arc::clone(&resolver), config.host_watch_interval());

    let cert_provider = Arc::new(CertManagerProvider::new(
        client.clone(),
        config.certificate_namespace.clone(),
        config.certificate_issuer.clone(),
    ));

    let metrics_addr = config.metrics_addr.clone();
    let ctx = Arc::new(Context {
        client: client.clone(),
        config,
        cert_provider,
        secrets: Arc::new(KubeSecretStore::new(client.clone())),
        dns_records: Arc::new(KubeDnsRecordStore::new(client.clone())),
        resolver,
        geo,
        ingress_watcher,
        route_watcher,
    });

    tokio::spawn(async move {
        if let Err(err) = metrics::serve(&metrics_addr).await {
            error!(error = %err, "metrics server exited");
        }
    });

    tokio::select! {
        result = run_ingress_controller(Arc::clone(&ctx), ingress_triggers) => {
            error!("CRITICAL: Ingress controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Ingress controller exited unexpectedly without error")
        }
        result = run_route_controller(Arc::clone(&ctx), route_triggers) => {
            error!("CRITICAL: Route controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Route controller exited unexpectedly without error")
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}

/// Turn the host watcher's change channel into a controller trigger stream.
fn trigger_stream<K>(
    triggers: mpsc::UnboundedReceiver<ObjectKey>,
) -> impl futures::Stream<Item = ObjectRef<K>>
where
    K: Resource<DynamicType = ()>,
{
    futures::stream::unfold(triggers, |mut rx| async move {
        rx.recv()
            .await
            .map(|key| (ObjectRef::new(&key.name).within(&key.namespace), rx))
    })
}

/// Run the Ingress controller
async fn run_ingress_controller(
    ctx: Arc<Context>,
    triggers: mpsc::UnboundedReceiver<ObjectKey>,
) -> Result<()> {
    info!("starting Ingress controller");

    let api = Api::<Ingress>::all(ctx.client.clone());

    Controller::new(api, watcher::Config::default())
        .reconcile_on(trigger_stream(triggers))
        .run(reconcile_ingress, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the Route controller
async fn run_route_controller(
    ctx: Arc<Context>,
    triggers: mpsc::UnboundedReceiver<ObjectKey>,
) -> Result<()> {
    info!("starting Route controller");

    let api = Api::<Route>::all(ctx.client.clone());

    Controller::new(api, watcher::Config::default())
        .reconcile_on(trigger_stream(triggers))
        .run(reconcile_route, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

async fn reconcile_ingress(
    ingress: Arc<Ingress>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let original = TrafficIngress::new((*ingress).clone());
    let mut reconciled = original.clone();

    let outcome = ctx.ingress_pipeline().run(&mut reconciled).await;
    if outcome.is_ok() && ctx.config.advanced_scheduling && !reconciled.is_deleted() {
        reconciled.apply_transforms(&original)?;
    }

    let changed = serde_json::to_value(reconciled.inner()).map_err(anyhow::Error::from)?
        != serde_json::to_value(original.inner()).map_err(anyhow::Error::from)?;
    if changed {
        let api: Api<Ingress> = Api::namespaced(ctx.client.clone(), &original.namespace());
        api.replace(&original.name(), &PostParams::default(), reconciled.inner())
            .await
            .map_err(anyhow::Error::from)?;
    }

    outcome?;
    metrics::record_reconciliation_success("Ingress", start.elapsed());
    Ok(Action::requeue(Duration::from_secs(
        STEADY_REQUEUE_DURATION_SECS,
    )))
}

async fn reconcile_route(route: Arc<Route>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let original = TrafficRoute::new((*route).clone());
    let mut reconciled = original.clone();

    let outcome = ctx.route_pipeline().run(&mut reconciled).await;
    if outcome.is_ok() && ctx.config.advanced_scheduling && !reconciled.is_deleted() {
        reconciled.apply_transforms(&original)?;
    }

    let changed = serde_json::to_value(reconciled.inner()).map_err(anyhow::Error::from)?
        != serde_json::to_value(original.inner()).map_err(anyhow::Error::from)?;
    if changed {
        let api: Api<Route> = Api::namespaced(ctx.client.clone(), &original.namespace());
        api.replace(&original.name(), &PostParams::default(), reconciled.inner())
            .await
            .map_err(anyhow::Error::from)?;
    }

    outcome?;
    metrics::record_reconciliation_success("Route", start.elapsed());
    Ok(Action::requeue(Duration::from_secs(
        STEADY_REQUEUE_DURATION_SECS,
    )))
}

fn error_policy<K>(_obj: Arc<K>, err: &ReconcileError, _ctx: Arc<Context>) -> Action
where
    K: Resource<DynamicType = ()>,
{
    let kind = K::kind(&());
    warn!(kind = %kind, error = %err, "reconciliation failed, requeueing with backoff");
    metrics::record_reconciliation_error(&kind);
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}
