// Aquaserver
// Copyright (C) 2025 Aquaserver Contributors

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use aqua_server::config::Config;
use aqua_server::cycler::SnapshotCycler;
use aqua_server::enumerator::CommandEnumerator;
use aqua_server::repos::GitRepoOps;
use aqua_server::server::ApiServer;
use aqua_server::state::AppState;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    info!("Starting continuous test dispatcher");

    let config = Config::from_env();
    info!("Loaded configuration: bind_address={}", config.bind_address);

    let state = Arc::new(AppState::new());
    let repo_ops = Arc::new(GitRepoOps::new(&config));
    let enumerator = Arc::new(CommandEnumerator::new(config.list_tests_command.clone()));

    let cycler = SnapshotCycler::new(state.clone(), repo_ops, enumerator, &config);
    let cycler_task = tokio::spawn(cycler.run());

    let server = ApiServer::new(&config, state)?;
    info!("Dispatcher listening on http://{}", server.bind_address());

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, stopping");
            cycler_task.abort();
        }
    }

    Ok(())
}
