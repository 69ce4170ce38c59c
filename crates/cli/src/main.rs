// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! drift: run a node role of the delay-tolerant compute fabric.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use drift_core::Eid;
use drift_node::{Broker, Client, Datastore, Executor};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "drift", about = "Delay-tolerant distributed compute fabric")]
struct Cli {
    /// Node endpoint id (dtn:// or ipn: scheme)
    #[arg(short, long)]
    id: Eid,

    /// Path to the DTN agent's socket
    #[arg(short, long, default_value = "/tmp/drift-agent.sock")]
    socket: PathBuf,

    /// Verbose logging
    #[arg(short, action = clap::ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    role: Role,
}

#[derive(Debug, Subcommand)]
enum Role {
    /// Announce this broker and collect peers
    Broker,
    /// Serve named data
    Datastore {
        /// Root directory for the name index and data blobs
        root: PathBuf,
    },
    /// Run sandboxed WebAssembly jobs
    Executor {
        /// Root directory for executor storage
        root: PathBuf,
    },
    /// Talk to the fabric
    Client {
        /// File to store context information
        #[arg(short, long, default_value = "context.toml")]
        context: PathBuf,

        #[command(subcommand)]
        command: ClientCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ClientCommand {
    /// Query the broker for jobs
    Query {
        /// Endpoint id of the job submitter
        submitter: Eid,
    },
    /// Interact with a datastore
    Data {
        /// Endpoint id of the datastore
        datastore: Eid,
        /// Name of the data
        name: String,

        #[command(subcommand)]
        op: DataOp,
    },
}

#[derive(Debug, Subcommand)]
enum DataOp {
    /// Retrieve data from the datastore
    Get,
    /// Send data for storage
    Put {
        /// Path to the data file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.role {
        Role::Broker => {
            tracing::info!("running in broker mode");
            let broker = Broker::new(cli.id, cli.socket);
            broker.run().await.context("broker failed")?;
        }
        Role::Datastore { root } => {
            tracing::info!("running in datastore mode");
            let datastore = Datastore::open(cli.id, cli.socket, &root)
                .await
                .context("cannot open datastore")?;
            datastore.run().await.context("datastore failed")?;
        }
        Role::Executor { root } => {
            tracing::info!("running in executor mode");
            let executor = Executor::open(cli.id, cli.socket, &root)
                .await
                .context("cannot open executor")?;
            executor.run().await.context("executor failed")?;
        }
        Role::Client { context, command } => {
            tracing::info!("running in client mode");
            let client = Client::load(cli.id, cli.socket, context)?;
            client.connect().await?;
            run_client_command(&client, command).await?;
        }
    }

    Ok(())
}

async fn run_client_command(client: &Client, command: ClientCommand) -> anyhow::Result<()> {
    match command {
        ClientCommand::Query { submitter } => {
            let jobs = client.job_query(&submitter).await?;
            println!("completed: {:?}", jobs.completed);
            println!("queued: {:?}", jobs.queued);
        }
        ClientCommand::Data { datastore, name, op: DataOp::Get } => {
            let (name, data) = client.data_get(&datastore, &name).await?;
            println!("{name}: {} bytes", data.len());
            match String::from_utf8(data) {
                Ok(text) => println!("{text}"),
                Err(raw) => println!("{:?}", raw.as_bytes()),
            }
        }
        ClientCommand::Data { datastore, name, op: DataOp::Put { file } } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("cannot read {}", file.display()))?;
            client.data_put(&datastore, &name, data).await?;
            println!("stored {name}");
        }
    }
    Ok(())
}
