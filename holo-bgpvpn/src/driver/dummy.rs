//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use crate::driver::Driver;

// Driver that accepts every change and does nothing with it.
//
// Useful to run the service without any BGP backend, and as the default
// service provider.
#[derive(Debug, Default)]
pub struct DummyDriver;

// ===== impl DummyDriver =====

impl Driver for DummyDriver {}
