use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::broadcast;

use quiz_backend::config::{Config, RateLimitConfig, SrsConfig, TranslatorConfig};
use quiz_backend::routes::build_router;
use quiz_backend::state::AppState;
use quiz_backend::store::Store;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    _temp_dir: TempDir,
}

fn mock_translator_config() -> TranslatorConfig {
    TranslatorConfig {
        enabled: true,
        mock: true,
        api_url: String::new(),
        api_key: String::new(),
        model: "mock-translator".to_string(),
        timeout_secs: 5,
        semantic_judge_enabled: false,
    }
}

async fn spawn_with(api_limit: u64, translator: TranslatorConfig) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("quiz-test.sled");

    // Config is built directly; set_var would race across parallel tests
    let config = Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path: sled_path.to_string_lossy().to_string(),
        jwt_secret: format!("integration-test-jwt-secret-{}", uuid::Uuid::new_v4()),
        cors_origin: "http://localhost:5173".to_string(),
        trust_proxy: false,
        default_native_language: "en".to_string(),
        rate_limit: RateLimitConfig {
            window_secs: 60,
            max_requests: api_limit,
        },
        srs: SrsConfig {
            growth_factor: 2.0,
            min_interval_days: 1,
            advance_threshold: 3,
            regression_enabled: true,
            regression_threshold: 2,
        },
        translator,
    };

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    store.run_migrations().expect("run migrations");

    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(store, &config, shutdown_tx);
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        _temp_dir: temp_dir,
    }
}

pub async fn spawn_test_app() -> TestApp {
    spawn_with(500, mock_translator_config()).await
}

pub async fn spawn_test_app_with_limit(api_limit: u64) -> TestApp {
    spawn_with(api_limit, mock_translator_config()).await
}

pub async fn spawn_test_app_with_translator(translator: TranslatorConfig) -> TestApp {
    spawn_with(500, translator).await
}
