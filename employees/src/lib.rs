// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! REST service to manage employee records.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use iii_iv_core::db::Db;
use iii_iv_core::env::get_optional_var;
use log::{info, warn};
use std::error::Error;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

pub(crate) mod db;
pub(crate) mod driver;
use driver::Driver;
pub(crate) mod model;
mod rest;
use rest::app;

/// Default port to listen on when none is configured.
const DEFAULT_PORT: u16 = 3000;

/// Configuration of the listening socket.
#[derive(Debug, PartialEq)]
pub struct ServerOptions {
    /// Address to bind to.
    pub address: IpAddr,

    /// Port to bind to.
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self { address: IpAddr::V4(Ipv4Addr::LOCALHOST), port: DEFAULT_PORT }
    }
}

impl ServerOptions {
    /// Creates a new set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_ADDRESS` and `<prefix>_PORT`, both of which
    /// are optional.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        let defaults = Self::default();
        Ok(Self {
            address: get_optional_var::<IpAddr>(prefix, "ADDRESS")?.unwrap_or(defaults.address),
            port: get_optional_var::<u16>(prefix, "PORT")?.unwrap_or(defaults.port),
        })
    }

    /// Returns the socket address described by these options.
    fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

/// Initializes the schema in `db` and serves the application until Ctrl-C is received.
async fn run(opts: ServerOptions, db: Arc<dyn Db + Send + Sync>) -> Result<(), Box<dyn Error>> {
    db::init_schema(&mut db.ex().await?).await?;

    let driver = Driver::new(db);
    let app = app(driver);

    let listener = tokio::net::TcpListener::bind(opts.socket_addr()).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to wait for Ctrl-C; shutting down: {}", e);
            }
        })
        .await?;
    Ok(())
}

/// Prepares `db` and serves the application as configured by `opts` until Ctrl-C is received.
///
/// `db` is closed before returning, whether serving succeeded or not.
///
/// While it'd be nice to push this responsibility to `main`, doing so would force us to expose many
/// crate-internal types to the public, which in turn would make dead code detection harder.
pub async fn serve(
    opts: ServerOptions,
    db: Arc<dyn Db + Send + Sync>,
) -> Result<(), Box<dyn Error>> {
    let result = run(opts, db.clone()).await;
    match &result {
        Ok(()) => info!("Shutting down"),
        Err(e) => warn!("Shutting down due to error: {}", e),
    }
    db.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serve_closes_db_when_schema_init_fails() {
        let db = Arc::new(iii_iv_core::db::sqlite::testutils::setup().await);
        db.close().await;

        let err = serve(ServerOptions::default(), db).await.unwrap_err();
        assert!(err.to_string().contains("closed pool"), "Got: {}", err);
    }

    #[cfg(feature = "postgres")]
    #[tokio::test]
    async fn test_serve_closes_db_when_postgres_unreachable() {
        use iii_iv_core::db::postgres::{PostgresDb, PostgresOptions};

        let opts = PostgresOptions {
            host: "127.0.0.1".to_owned(),
            port: 1,
            database: "staff".to_owned(),
            username: "nobody".to_owned(),
            password: "nothing".to_owned(),
            min_connections: None,
            max_connections: Some(1),
            max_retries: 0,
        };
        let db = Arc::new(PostgresDb::connect(opts).unwrap());

        // Dropping an unclosed PostgresDb panics in debug builds, so an error here also proves
        // that serve closed the pool.
        assert!(serve(ServerOptions::default(), db).await.is_err());
    }

    #[test]
    fn test_server_options_from_env_defaults() {
        temp_env::with_vars([("EMPLOYEES_ADDRESS", None::<&str>), ("EMPLOYEES_PORT", None)], || {
            assert_eq!(ServerOptions::default(), ServerOptions::from_env("EMPLOYEES").unwrap());
        });
    }

    #[test]
    fn test_server_options_from_env_all_present() {
        let overrides = [("EMPLOYEES_ADDRESS", Some("0.0.0.0")), ("EMPLOYEES_PORT", Some("8080"))];
        temp_env::with_vars(overrides, || {
            let opts = ServerOptions::from_env("EMPLOYEES").unwrap();
            assert_eq!(
                ServerOptions { address: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 8080 },
                opts
            );
            assert_eq!("0.0.0.0:8080", opts.socket_addr().to_string());
        });
    }

    #[test]
    fn test_server_options_from_env_bad_port() {
        let overrides = [("EMPLOYEES_ADDRESS", None), ("EMPLOYEES_PORT", Some("http"))];
        temp_env::with_vars(overrides, || {
            let err = ServerOptions::from_env("EMPLOYEES").unwrap_err();
            assert!(err.contains("EMPLOYEES_PORT"));
        });
    }

    #[test]
    fn test_server_options_from_env_bad_address() {
        temp_env::with_var("EMPLOYEES_ADDRESS", Some("localhost"), || {
            let err = ServerOptions::from_env("EMPLOYEES").unwrap_err();
            assert!(err.contains("EMPLOYEES_ADDRESS"));
        });
    }
}
