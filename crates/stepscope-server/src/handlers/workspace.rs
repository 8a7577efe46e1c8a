//! Handler for `workspace/didChangeConfiguration` notifications.

use lsp_types::DidChangeConfigurationParams;
use tracing::{info, warn};

use crate::config::Settings;
use crate::server::ServerState;

use super::diagnostics::publish_all_feature_diagnostics;

/// Reload settings, rebuild the catalog and republish diagnostics.
///
/// Settings that fail to parse or to build a catalog are logged and the
/// previous settings stay in effect.
pub fn handle_did_change_configuration(
    state: &mut ServerState,
    params: DidChangeConfigurationParams,
) {
    let applied = Settings::from_value(params.settings)
        .and_then(|settings| state.apply_settings(settings));
    if let Err(err) = applied {
        warn!(error = %err, "keeping previous settings");
        return;
    }
    let steps = state.rescan();
    info!(steps, "reloaded settings");
    publish_all_feature_diagnostics(state);
}
