use std::sync::atomic::{AtomicU32, Ordering};

use tracing_subscriber::{fmt, EnvFilter};

use edulearn::config::Config;

async fn async_main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load();

    let app = match edulearn::mongo(&config.mongo_uri, &config.mongo_db).await {
        Ok(a) => a,
        Err(e) => return tracing::error!("cannot reach mongodb: {:#}", e),
    };

    if let Err(e) = edulearn::api::serve(app, config).await {
        tracing::error!("server returned: {:#}", e);
    }
}

fn main() {
    static NUM: AtomicU32 = AtomicU32::new(0);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name_fn(|| format!("edulearn-worker-{}", NUM.fetch_add(1, Ordering::Relaxed)))
        .build()
    {
        Ok(r) => r,
        Err(e) => return eprintln!("{}", e),
    };

    rt.block_on(async_main())
}
