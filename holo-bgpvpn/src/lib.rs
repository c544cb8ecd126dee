//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod api;
mod debug;
pub mod driver;
pub mod error;
pub mod manager;
pub mod model;
pub mod plugin;
pub mod registry;
pub mod store;
pub mod validator;

use tokio::sync::mpsc;
use tracing::{Instrument, debug_span};

use crate::plugin::Plugin;

//
// Type aliases.
//
pub type Sender<T> = mpsc::Sender<T>;
pub type Receiver<T> = mpsc::Receiver<T>;
pub type Responder<T> = tokio::sync::oneshot::Sender<T>;
pub type PluginSender = Sender<api::Request>;

// ===== global functions =====

// Spawns the task that owns the plugin. Requests are processed one at a
// time, in the order they are received.
pub fn start(mut plugin: Plugin) -> PluginSender {
    let (plugin_tx, mut plugin_rx) = mpsc::channel::<api::Request>(4);

    tokio::spawn(async move {
        let span = debug_span!("bgpvpn");
        async move {
            while let Some(request) = plugin_rx.recv().await {
                api::process_request(&mut plugin, request);
            }
        }
        .instrument(span)
        .await;
    });

    plugin_tx
}
