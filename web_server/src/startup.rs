use std::net::TcpListener;
use std::sync::Arc;

use actix_web::{App, HttpServer, dev::Server, middleware::Logger, web};
use actix_web_opentelemetry::RequestTracing;

use crate::{
    app_settings::AppSettings,
    publisher::LocalPublisher,
    remote::RemoteStore,
    routes::{download::download_artifact, health::health_check, merge::merge_upload},
    storage::FileStorage,
    sweeper::RetentionSweeper,
};

/// Services shared by every request handler.
pub struct AppServices {
    pub settings: AppSettings,
    /// Published merge outputs, read back by the download route
    pub artifacts: FileStorage,
    pub publisher: LocalPublisher,
    /// Remote object store for the cloud variant. The concrete client is
    /// injected by the host; `None` keeps the service on local storage.
    pub remote: Option<Arc<dyn RemoteStore>>,
}

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(settings: AppSettings) -> Result<Self, std::io::Error> {
        Self::build_with_remote(settings, None).await
    }

    pub async fn build_with_remote(
        settings: AppSettings,
        remote: Option<Arc<dyn RemoteStore>>,
    ) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&settings.storage.uploads_dir)?;
        std::fs::create_dir_all(&settings.storage.merged_dir)?;

        // The sweeper only makes sense when a remote store is wired in;
        // local artifacts persist until cleared manually.
        if let (Some(store), Some(remote_settings)) = (&remote, &settings.remote) {
            let sweeper = RetentionSweeper::new(
                store.clone(),
                &settings.retention,
                remote_settings.parent_folder_id.clone(),
            );
            tokio::spawn(sweeper.run());
        }

        let services = AppServices {
            artifacts: FileStorage::new(settings.storage.merged_dir.clone()),
            publisher: LocalPublisher::new(FileStorage::new(settings.storage.merged_dir.clone())),
            remote,
            settings: settings.clone(),
        };

        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();
        let server = run(listener, Arc::new(services))?;
        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the web server and blocks the main thread until it stops
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

fn run(listener: TcpListener, services: Arc<AppServices>) -> Result<Server, std::io::Error> {
    let port = listener
        .local_addr()
        .expect("TCPListener is invalid")
        .port();

    let services = web::Data::new(services);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(RequestTracing::new())
            .route("/management/health", web::get().to(health_check))
            .route("/upload", web::post().to(merge_upload))
            .route("/merged/{filename}", web::get().to(download_artifact))
            .app_data(services.clone())
    })
    .listen(listener)?
    .run();

    tracing::info!("PDF Merger Web Server is running. port={port}");

    Ok(server)
}
