use std::{
    future::IntoFuture,
    path::{Path, PathBuf},
    process,
    sync::Arc,
};

use mdconvert::{
    application::{
        downloads::{DownloadService, build_deliverable},
        error::AppError,
        render::build_renderer,
        store::ArtifactStore,
        sweeper::spawn_sweeper,
        uploads::UploadService,
    },
    config,
    domain::{artifact::checksum, uploads::UploadPolicy},
    infra::{
        error::InfraError,
        http::{self, HttpState},
        staging::StagingArea,
        telemetry,
    },
};
use mdconvert_api_types::DownloadFormat;
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let max_file_bytes = settings.uploads.max_file_bytes.get();
    let store = Arc::new(ArtifactStore::new(settings.retention.window));
    let renderer = build_renderer(settings.render.engine);

    let staging = StagingArea::new(settings.uploads.staging_directory.clone(), max_file_bytes)
        .map_err(|err| AppError::from(InfraError::Io(err)))?;

    let state = HttpState {
        uploads: Arc::new(UploadService::new(
            Arc::clone(&store),
            Arc::clone(&renderer),
            UploadPolicy::new(max_file_bytes),
        )),
        downloads: Arc::new(DownloadService::new(Arc::clone(&store), renderer)),
        store: Arc::clone(&store),
        staging: Arc::new(staging),
    };

    let sweeper = spawn_sweeper(Arc::clone(&store), settings.retention.sweep_interval);

    let result = serve_http(&settings, state).await;

    sweeper.shutdown().await;
    info!(
        target = "mdconvert::serve",
        artifacts_dropped = store.len(),
        "server stopped"
    );

    result
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state, settings.debug.enabled);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "mdconvert::serve",
        addr = %settings.server.addr,
        engine = %settings.render.engine,
        debug_endpoints = settings.debug.enabled,
        "listening"
    );

    let shutdown = Arc::new(Notify::new());
    let trigger = Arc::clone(&shutdown);
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!(target = "mdconvert::serve", "shutdown requested");
            trigger.notify_one();
        })
        .into_future();
    tokio::pin!(server);

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = &mut server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = async {
            shutdown.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                target = "mdconvert::serve",
                grace_seconds = grace.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

async fn run_render(settings: config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    let engine = match args.render.render_engine.as_deref() {
        Some(value) => value
            .parse::<config::RenderEngine>()
            .map_err(AppError::validation)?,
        None => settings.render.engine,
    };
    let format = DownloadFormat::from(args.format);
    let policy = UploadPolicy::new(settings.uploads.max_file_bytes.get());

    let filename = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string);
    let filename = policy
        .check_filename(filename.as_deref())
        .map_err(|err| AppError::validation(err.to_string()))?;

    let bytes = tokio::fs::read(&args.file)
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))?;
    let content = policy
        .decode(bytes)
        .map_err(|err| AppError::validation(err.to_string()))?;

    let base_name = base_name_of(filename);
    let renderer = build_renderer(engine);
    let deliverable = build_deliverable(
        renderer.as_ref(),
        format,
        base_name,
        &content,
        &checksum(&content),
    )
    .map_err(|err| AppError::unexpected(err.to_string()))?;

    let output = args
        .output
        .unwrap_or_else(|| default_output(&args.file, &deliverable.filename));
    tokio::fs::write(&output, deliverable.body.as_bytes())
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))?;

    info!(
        target = "mdconvert::render",
        input = %args.file.display(),
        output = %output.display(),
        format = %format,
        engine = %engine,
        "converted document"
    );
    Ok(())
}

fn base_name_of(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    }
}

fn default_output(input: &Path, filename: &str) -> PathBuf {
    input.with_file_name(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_output_sits_next_to_input() {
        let output = default_output(Path::new("docs/notes.md"), "notes.html");
        assert_eq!(output, PathBuf::from("docs/notes.html"));
    }

    #[test]
    fn base_name_drops_only_the_extension() {
        assert_eq!(base_name_of("release.notes.md"), "release.notes");
        assert_eq!(base_name_of("README.markdown"), "README");
    }
}
