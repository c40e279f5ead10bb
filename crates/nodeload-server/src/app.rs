//! Wiring from configuration to a ready load handler, and the
//! line-oriented request loop the binary runs.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use nodeload_domain::permissions::MembershipAuthorizer;
use nodeload_domain::resolver::{NodeResolver, ResolverConfig};
use nodeload_storage::{load_fixture, Fixture, MemoryDataStore, StorageResult};

use crate::adapters::{DataStoreEntityReader, DataStoreMembershipReader};
use crate::config::NodeloadConfig;
use crate::handlers::loader::{LoadHandler, LoadRequest};

/// Load handler backed by the in-memory store.
pub type MemoryLoadHandler = LoadHandler<
    DataStoreEntityReader<MemoryDataStore>,
    MembershipAuthorizer<DataStoreMembershipReader<MemoryDataStore>>,
>;

/// Creates the in-memory store, seeded from `fixtures_path` when given.
pub async fn build_store(fixtures_path: Option<&Path>) -> StorageResult<Arc<MemoryDataStore>> {
    let store = MemoryDataStore::new_shared();
    if let Some(path) = fixtures_path {
        let fixture = Fixture::from_path(path)?;
        let count = load_fixture(store.as_ref(), fixture).await?;
        info!(path = %path.display(), records = count, "store seeded from fixtures");
    }
    Ok(store)
}

/// Builds a load handler over `store` using the loader settings.
pub fn build_handler(config: &NodeloadConfig, store: Arc<MemoryDataStore>) -> MemoryLoadHandler {
    let reader = Arc::new(DataStoreEntityReader::new(Arc::clone(&store)));
    let authorizer = Arc::new(MembershipAuthorizer::new(Arc::new(
        DataStoreMembershipReader::new(store),
    )));
    let resolver_config = ResolverConfig::default().with_fetch_timeout(config.loader.fetch_timeout());
    let resolver = Arc::new(NodeResolver::with_config(reader, authorizer, resolver_config));

    LoadHandler::new(resolver)
        .with_max_batch_size(config.loader.max_batch_size)
        .with_metrics(config.metrics.enabled)
}

#[derive(Serialize)]
struct ErrorLine {
    error: String,
}

/// Reads newline-delimited JSON load requests from `input` and writes one
/// JSON line per request to `output`.
///
/// Each request runs in its own batch scope. A line that cannot be parsed or
/// a request that fails validation produces `{"error": "..."}` and does not
/// stop the loop. Blank lines are skipped. Returns the number of requests
/// answered.
pub async fn serve_lines<I, O>(
    handler: &MemoryLoadHandler,
    input: I,
    mut output: O,
) -> std::io::Result<usize>
where
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut answered = 0;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<LoadRequest>(&line) {
            Ok(request) => match handler.load_many(request).await {
                Ok(response) => serde_json::to_string(&response),
                Err(err) => {
                    warn!(error = %err, "load request rejected");
                    serde_json::to_string(&ErrorLine {
                        error: err.to_string(),
                    })
                }
            },
            Err(err) => {
                warn!(error = %err, "malformed load request");
                serde_json::to_string(&ErrorLine {
                    error: format!("malformed request: {err}"),
                })
            }
        }
        .map_err(std::io::Error::other)?;

        output.write_all(reply.as_bytes()).await?;
        output.write_all(b"\n").await?;
        answered += 1;
    }

    output.flush().await?;
    debug!(answered, "input exhausted");
    Ok(answered)
}
