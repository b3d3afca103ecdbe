//  Copyright 2025 Vestibule Project Authors
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Cold storage failed to serve a request.
    #[error(transparent)]
    ColdStorage(#[from] anyhow::Error),
    /// The store was shut down; its workers have exited and submissions are
    /// rejected.
    #[error("cached store is shut down")]
    Shutdown,
}

pub type Result<T> = core::result::Result<T, Error>;
