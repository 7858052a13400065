use crate::cli::ServeArgs;
use crate::infra::{AppState, FloorPlanEngine};
use crate::routes::with_floor_plan_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use floorplan::alerts::{
    spawn_alert_schedule, AlertSchedule, LogNotifier, NotificationDispatcher, TriggerSettings,
};
use floorplan::clock::SystemClock;
use floorplan::config::AppConfig;
use floorplan::error::AppError;
use floorplan::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let engine = FloorPlanEngine::in_memory(Arc::new(SystemClock));
    let dispatcher = NotificationDispatcher::spawn(Arc::new(LogNotifier));
    let generator = engine.generator.clone().with_dispatcher(dispatcher);

    let job = &config.alert_job;
    if job.secret.is_none() {
        warn!("ALERT_JOB_SECRET is not set; the manual alert trigger will reject every call");
    }
    let schedule = job.enabled.then(|| {
        spawn_alert_schedule(
            generator.clone(),
            AlertSchedule {
                interval: job.interval,
                accrue_interest: job.accrue_interest,
            },
        )
    });

    let trigger = TriggerSettings {
        secret: job.secret.clone(),
        accrue_interest: job.accrue_interest,
    };
    let app = with_floor_plan_routes(&engine, generator, trigger)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        alert_job_enabled = job.enabled,
        "floor plan service ready"
    );

    let served = axum::serve(listener, app).await;
    if let Some(handle) = schedule {
        handle.abort();
    }
    served?;
    Ok(())
}
