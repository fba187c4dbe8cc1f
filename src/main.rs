mod models;
mod screens;
mod services;

use chrono::Local;
use eframe::egui;
use screens::attendance_form::FormAction;
use screens::confirmation::ConfirmationAction;
use services::config_loader::{self, RollcallConfig};
use services::device;
use services::eligibility::{EligibilityGate, StoredSubmissionLog};
use services::geocode::NominatimResolver;
use services::geolocation::{ConfiguredLocationProvider, PositionOptions};
use services::local_store::FileStore;
use services::pipeline::{AttendancePipeline, PipelineSettings, SubmissionOutcome};
use services::remote::RestAttendanceClient;
use services::submission_flow::SubmissionPhase;
use services::token::TokenFormat;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

type LivePipeline =
    AttendancePipeline<RestAttendanceClient, ConfiguredLocationProvider, NominatimResolver>;

enum PipelineEvent {
    LocationPrefetched(Result<(), String>),
    Validated(Result<String, String>),
    Submitted(Result<SubmissionOutcome, String>),
}

struct Running {
    runtime: tokio::runtime::Runtime,
    pipeline: Arc<LivePipeline>,
    events_tx: Sender<PipelineEvent>,
    events_rx: Receiver<PipelineEvent>,
}

struct RollcallApp {
    running: Result<Running, String>,
}

impl Running {
    fn start(config: &RollcallConfig) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let pipeline = Arc::new(build_pipeline(config)?);
        let (events_tx, events_rx) = mpsc::channel::<PipelineEvent>();
        Ok(Self {
            runtime,
            pipeline,
            events_tx,
            events_rx,
        })
    }

    fn spawn_prefetch(&self, ctx: &egui::Context) {
        let pipeline = Arc::clone(&self.pipeline);
        let tx = self.events_tx.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let result = pipeline
                .prefetch_location()
                .await
                .map_err(|err| err.to_string());
            let _ = tx.send(PipelineEvent::LocationPrefetched(result));
            ctx.request_repaint();
        });
    }

    fn spawn_validate(&self, ctx: &egui::Context, event_code: String) {
        let pipeline = Arc::clone(&self.pipeline);
        let tx = self.events_tx.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let result = pipeline
                .validate_code(&event_code, Local::now())
                .await
                .map(|validation| validation.event_code)
                .map_err(|err| err.to_string());
            let _ = tx.send(PipelineEvent::Validated(result));
            ctx.request_repaint();
        });
    }

    fn spawn_submit(&self, ctx: &egui::Context, details: models::AttendeeDetails) {
        let pipeline = Arc::clone(&self.pipeline);
        let tx = self.events_tx.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let result = pipeline
                .submit(&details, Local::now())
                .await
                .map_err(|err| err.to_string());
            let _ = tx.send(PipelineEvent::Submitted(result));
            ctx.request_repaint();
        });
    }

    fn drain_events(&self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                PipelineEvent::LocationPrefetched(Ok(())) => {
                    info!("Startup location fix cached");
                }
                PipelineEvent::LocationPrefetched(Err(message)) => {
                    warn!("Startup location request failed: {}", message);
                }
                PipelineEvent::Validated(Ok(event_code)) => {
                    screens::attendance_form::report_info(format!(
                        "Event code {event_code} is valid. Fill in your details."
                    ));
                }
                PipelineEvent::Validated(Err(message)) => {
                    screens::attendance_form::report_error(message);
                }
                PipelineEvent::Submitted(Ok(outcome)) => {
                    info!(
                        "Submission confirmed for {} at {}: {} (token {})",
                        outcome.event_code, outcome.location_name, outcome.message, outcome.token
                    );
                    screens::attendance_form::clear_fields();
                }
                PipelineEvent::Submitted(Err(message)) => {
                    screens::attendance_form::report_error(message);
                }
            }
        }
    }
}

fn build_pipeline(config: &RollcallConfig) -> anyhow::Result<LivePipeline> {
    let store = Arc::new(FileStore::open(&config.data_dir)?);
    info!("Local store at {}", store.path().display());
    let device_id = device::load_or_create_device_id(&*store)?;
    let gate = EligibilityGate::new(Arc::new(StoredSubmissionLog::new(Arc::clone(&store))));

    let api = RestAttendanceClient::new(config.remote.clone())?;
    let locator = ConfiguredLocationProvider::from_config(&config.location);
    let resolver = NominatimResolver::new(&config.geocode)?;

    Ok(AttendancePipeline::new(
        api,
        locator,
        resolver,
        gate,
        store,
        PipelineSettings {
            device_id,
            token_format: TokenFormat::from(&config.token),
            position_options: PositionOptions::from(&config.location),
            fallback_place_name: config.geocode.fallback_name.clone(),
        },
    ))
}

impl eframe::App for RollcallApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(8.0);
            let running = match &self.running {
                Ok(running) => running,
                Err(message) => {
                    ui.colored_label(egui::Color32::RED, message);
                    return;
                }
            };

            running.drain_events();
            let phase = running.pipeline.phase();

            ui.vertical_centered(|ui| match &phase {
                SubmissionPhase::Success { .. } | SubmissionPhase::Failure { .. } => {
                    if let ConfirmationAction::Acknowledge = screens::confirmation::ui(ui, &phase) {
                        if let Err(err) = running.pipeline.acknowledge() {
                            warn!("Acknowledge ignored: {}", err);
                        }
                        info!("Transition: {} -> idle", phase.name());
                    }
                }
                _ => match screens::attendance_form::ui(ui, &phase) {
                    FormAction::Validate(event_code) => running.spawn_validate(ctx, event_code),
                    FormAction::Submit(details) => running.spawn_submit(ctx, details),
                    FormAction::Stay => {}
                },
            });

            if phase.is_busy() {
                ctx.request_repaint_after(Duration::from_millis(100));
            }
        });
    }
}

const LOG_DIR_ENV: &str = "ROLLCALL_LOG_DIR";

fn log_dir() -> PathBuf {
    std::env::var_os(LOG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Console plus a daily `rollcall.log` file. The returned guard flushes the
/// file writer on drop and must live as long as `main`.
fn init_tracing(log_dir: &Path) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false);

    if let Err(err) = fs::create_dir_all(log_dir) {
        eprintln!("cannot create log dir {}: {err}", log_dir.display());
    }
    let (file_writer, file_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "rollcall.log"));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer)
        .with_thread_names(true);

    match tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
    {
        Ok(()) => Some(file_guard),
        Err(err) => {
            eprintln!("tracing init failed: {err}");
            None
        }
    }
}

fn main() -> eframe::Result<()> {
    let logs = log_dir();
    let _log_guard = init_tracing(&logs);
    info!("Starting Rollcall, logging to {}", logs.display());

    let config_path = config_loader::config_path();
    let running = config_loader::load_rollcall_config(&config_path).and_then(|config| {
        Running::start(&config).map_err(|err| format!("Startup failed: {err:#}"))
    });
    if let Err(message) = &running {
        error!("{message}");
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([640.0, 720.0])
            .with_resizable(false),
        ..Default::default()
    };

    eframe::run_native(
        "Rollcall",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_pixels_per_point(1.1);

            let mut style = (*cc.egui_ctx.style()).clone();
            style
                .text_styles
                .insert(egui::TextStyle::Heading, egui::FontId::proportional(28.0));
            style
                .text_styles
                .insert(egui::TextStyle::Body, egui::FontId::proportional(18.0));
            style
                .text_styles
                .insert(egui::TextStyle::Button, egui::FontId::proportional(18.0));
            style.spacing.button_padding = egui::vec2(14.0, 9.0);
            cc.egui_ctx.set_style(style);

            if let Ok(running) = &running {
                running.spawn_prefetch(&cc.egui_ctx);
            }

            Ok(Box::new(RollcallApp { running }))
        }),
    )
}
