use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use guided_tour::config::TourConfig;
use guided_tour::overlay::{HeadlessPage, Viewport};
use guided_tour::sandbox::{self, Command, Sandbox};
use guided_tour::store::{FileStore, KeyValueStore};
use guided_tour::tour::{
    EventBus, Page, StepCatalog, TourDeps, TourHost, TourRouteState, notify, tour_routes,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = TourConfig::load()?;

    let first_page = std::env::args()
        .nth(1)
        .or_else(|| Page::START.path().map(str::to_string))
        .unwrap_or_else(|| "/".to_string());

    eprintln!("🧭 Guided tour sandbox v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   State: {}", config.store_path.display());
    match config.completion {
        Some(ref completion) => eprintln!("   Completion: POST {}", completion.endpoint),
        None => eprintln!("   Completion: not reported (set TOUR_COMPLETION_URL)"),
    }
    if let Some(port) = config.http_port {
        eprintln!("   Control API: http://0.0.0.0:{}/api/tour/status", port);
    }
    eprintln!("   Type `help` for commands.\n");

    // ── Page + tour ─────────────────────────────────────────────────────
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.store_path));
    let page = Arc::new(HeadlessPage::new(
        first_page.clone(),
        Viewport {
            width: 1280.0,
            height: 800.0,
        },
    ));
    let deps = TourDeps {
        store,
        bus: EventBus::new(),
        surface: page.clone(),
        notifier: notify::from_config(config.completion.clone()),
        catalog: Arc::new(StepCatalog::attendance_tour()),
        config: config.clone(),
    };
    let host = Arc::new(TourHost::new(deps));
    let sandbox = Arc::new(Sandbox::new(page, Arc::clone(&host)));

    // ── Control API ─────────────────────────────────────────────────────
    if let Some(port) = config.http_port {
        let app = tour_routes(TourRouteState {
            host: Arc::clone(&host),
        })
        .merge(sandbox::sandbox_routes(Arc::clone(&sandbox)));
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
        tracing::info!(port, "Tour control server started");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Tour control server stopped");
            }
        });
    }

    sandbox.goto(&first_page).await;
    println!("{}", sandbox::render_page(sandbox.page()));

    // ── REPL ────────────────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprint!("> ");
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            eprint!("> ");
            continue;
        }
        match Command::parse(&line) {
            Ok(command) => match sandbox.execute(command).await {
                Some(output) => println!("{output}"),
                None => break,
            },
            Err(e) => eprintln!("{e}"),
        }
        eprint!("> ");
    }

    host.teardown().await;
    Ok(())
}
