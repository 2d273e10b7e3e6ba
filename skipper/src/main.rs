//! Process entry point. Thin by design: all bootstrap/run logic lives in
//! `app_context`, which the rest of this crate is tested against directly.

use std::sync::Arc;

use skipper::app_context::AppContext;
use skipper::engine::DataClient;

fn main() {
    tracing_subscriber::fmt().with_thread_ids(true).init();

    let sources: Vec<Arc<dyn DataClient>> = Vec::new();

    let result = AppContext::bootstrap(sources).and_then(AppContext::run);
    if let Err(err) = result {
        tracing::error!("{err:?}");
        std::process::exit(1);
    }
}
