use clap::Parser;
use flate2::read::GzDecoder;
use mimalloc::MiMalloc;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use graft_chunk::{new_chunker, Format};
use graft_client::{HttpAllocatorClient, HttpMutationClient, HttpOptions, MutationClient, TlsOptions};
use graft_loader::{BatchMutationOptions, Loader};
use graft_xidmap::XidMap;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn init_logging() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("graft_ingest=info,graft_loader=info,graft_client=info")
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact());

    let _ = tracing::dispatcher::set_global_default(tracing::Dispatch::new(subscriber));
}

#[derive(Parser)]
#[command(
    name = "graft-ingest",
    about = "Bulk-load graph statements into a remote mutation cluster"
)]
struct Args {
    /// Location of the *.rdf(.gz) or *.json(.gz) file to load.
    #[arg(short, long)]
    file: PathBuf,

    /// Input format ("rdf" or "json") instead of inferring it from the
    /// file name.
    #[arg(long)]
    format: Option<String>,

    /// Location of a schema file applied before loading.
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Mutation server address(es), comma-separated, load-balanced.
    #[arg(short, long, default_value = "127.0.0.1:9080")]
    dgraph: String,

    /// Identifier allocator (zero) server address.
    #[arg(short, long, default_value = "127.0.0.1:5080")]
    zero: String,

    /// Directory to persist the external-name to uid mapping.
    #[arg(short = 'X', long)]
    xidmap: Option<PathBuf>,

    /// Number of concurrent requests to the mutation servers.
    #[arg(short, long, default_value_t = 10)]
    conc: usize,

    /// Number of statements sent per mutation.
    #[arg(short, long, default_value_t = 1000)]
    batch: usize,

    /// Ignore conflicts on index keys during a transaction.
    #[arg(
        short,
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        num_args = 1
    )]
    ignore_index_conflict: bool,

    /// Auth token passed to the server for the schema alter operation.
    #[arg(short, long)]
    auth_token: Option<String>,

    /// Enable compression on the server connection.
    #[arg(short = 'C', long)]
    use_compression: bool,

    /// Ignore ids in the load files and assign new ones.
    #[arg(long)]
    new_uids: bool,

    /// Expected server host name for TLS verification.
    #[arg(long)]
    tls_server_name: Option<String>,

    /// CA certificate (PEM) added to the trust roots.
    #[arg(long)]
    tls_cacert: Option<PathBuf>,

    /// Trust the system CA roots (default behavior; flag kept for parity).
    #[arg(long)]
    tls_use_system_ca: bool,

    /// Client certificate (PEM) for mutual TLS.
    #[arg(long)]
    tls_cert: Option<PathBuf>,

    /// Client private key (PEM) for mutual TLS.
    #[arg(long)]
    tls_key: Option<PathBuf>,
}

impl Args {
    fn tls_options(&self) -> Result<Option<TlsOptions>, std::io::Error> {
        let wants_tls = self.tls_server_name.is_some()
            || self.tls_cacert.is_some()
            || self.tls_cert.is_some()
            || self.tls_use_system_ca;
        if !wants_tls {
            return Ok(None);
        }
        let ca_cert_pem = match &self.tls_cacert {
            Some(path) => Some(std::fs::read(path)?),
            None => None,
        };
        let identity_pem = match (&self.tls_cert, &self.tls_key) {
            (Some(cert), Some(key)) => {
                let mut pem = std::fs::read(cert)?;
                pem.extend(std::fs::read(key)?);
                Some(pem)
            }
            (None, None) => None,
            _ => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "--tls-cert and --tls-key must be given together",
                ))
            }
        };
        Ok(Some(TlsOptions {
            server_name: self.tls_server_name.clone(),
            ca_cert_pem,
            identity_pem,
        }))
    }

    /// Open the input, transparently decompressing `.gz` files.
    fn open_input(&self) -> Result<Box<dyn BufRead + Send>, std::io::Error> {
        let file = std::fs::File::open(&self.file)?;
        let is_gz = self
            .file
            .extension()
            .is_some_and(|ext| ext == "gz");
        if is_gz {
            Ok(Box::new(BufReader::new(GzDecoder::new(file))))
        } else {
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let format = match &args.format {
        Some(name) => Format::from_name(name)?,
        None => Format::infer(&args.file)?,
    };

    let http_opts = HttpOptions {
        auth_token: args.auth_token.clone(),
        gzip: args.use_compression,
        ignore_index_conflict: args.ignore_index_conflict,
        tls: args.tls_options()?,
    };

    let endpoints: Vec<String> = args
        .dgraph
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let client = Arc::new(HttpMutationClient::new(&endpoints, &http_opts)?);
    let allocator = Arc::new(HttpAllocatorClient::new(&args.zero, &http_opts)?);

    let mut xidmap = XidMap::new(allocator).with_new_uids(args.new_uids);
    if let Some(ref dir) = args.xidmap {
        xidmap = xidmap.with_persistence(dir)?;
    }

    if let Some(ref schema_path) = args.schema {
        let schema = std::fs::read_to_string(schema_path)?;
        info!(schema = %schema_path.display(), "applying schema");
        client.alter(&schema).await?;
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping the producer");
                cancel.cancel();
            }
        });
    }

    let opts = BatchMutationOptions::new(args.batch, args.conc).with_cancel(cancel);
    let loader = Loader::new(client, Arc::new(xidmap), opts);

    let reader = args.open_input()?;
    info!(
        file = %args.file.display(),
        ?format,
        endpoints = endpoints.len(),
        batch = args.batch,
        conc = args.conc,
        "starting load"
    );
    let counter = loader.load(reader, new_chunker(format)).await?;

    println!("Number of TXs run            : {}", counter.txns_done);
    println!("Number of statements sent    : {}", counter.nquads);
    println!("Time spent                   : {:?}", counter.elapsed);
    println!("Statements per second        : {}", counter.rate());
    Ok(())
}

#[tokio::main]
async fn main() {
    init_logging();
    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("graft-ingest: {e}");
        std::process::exit(1);
    }
}
