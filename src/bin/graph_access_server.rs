//! Graph access server - Unix socket front end for GraphAccessEngine
//!
//! Serves neighbour lookups over a directory of CSR objects. Each client
//! connection gets its own thread and session; queries a client opens are
//! ended when it disconnects.
//!
//! Usage:
//!   graph-access-server /path/to/objects [--socket /tmp/graph-access.sock]
//!
//! Protocol:
//!   Request:  [4-byte length BE] [MessagePack payload]
//!   Response: [4-byte length BE] [MessagePack payload]
//!
//! A typical exchange:
//!   hello -> startQuery { algorithm: "bfs" } -> getNeighbours ... -> endQuery

use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn, Level};

use graph_access::csr::partition_graph;
use graph_access::session::ClientSession;
use graph_access::{
    Algorithm, Direction, EngineConfig, GraphAccessEngine, GraphError, IndexLayout, LocalStore, NeighbourRequest,
    ObjectStore, QueryId,
};

// Global client ID counter
static NEXT_CLIENT_ID: AtomicUsize = AtomicUsize::new(1);

/// Largest frame accepted from a client.
const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

const PROTOCOL_VERSION: u32 = 1;

const DEFAULT_SOCKET: &str = "/tmp/graph-access.sock";

// ============================================================================
// Wire Protocol Types
// ============================================================================

/// Request from client
#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum Request {
    /// Announce protocol version
    Hello {
        #[serde(rename = "protocolVersion")]
        protocol_version: Option<u32>,
        #[serde(rename = "clientId")]
        client_id: Option<String>,
    },

    /// Open a query; the traversal order decides the prefetch policy
    StartQuery { algorithm: Algorithm },

    GetNeighbours {
        node: u32,
        label: u32,
        direction: Direction,
        #[serde(rename = "queryId")]
        query_id: QueryId,
    },

    EndQuery {
        #[serde(rename = "queryId")]
        query_id: QueryId,
    },

    GetStats,

    Ping,
}

/// Response to client
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    HelloOk {
        ok: bool,
        #[serde(rename = "protocolVersion")]
        protocol_version: u32,
        #[serde(rename = "serverVersion")]
        server_version: String,
    },

    QueryStarted {
        #[serde(rename = "queryId")]
        query_id: QueryId,
    },

    Neighbours { neighbours: Vec<u32> },

    Ok { ok: bool },

    /// Counters as a JSON object string
    Stats { stats: String },

    Pong { pong: bool },

    ErrorWithCode { error: String, code: String },
}

impl From<GraphError> for Response {
    fn from(e: GraphError) -> Self {
        Response::ErrorWithCode {
            error: e.to_string(),
            code: e.code().to_string(),
        }
    }
}

/// Request envelope: captures requestId alongside the tagged Request.
#[derive(Deserialize)]
struct RequestEnvelope {
    #[serde(default, rename = "requestId")]
    request_id: Option<String>,
    #[serde(flatten)]
    request: Request,
}

/// Response envelope: wraps Response with optional requestId for echo-back.
#[derive(Serialize)]
struct ResponseEnvelope {
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
    #[serde(flatten)]
    response: Response,
}

// ============================================================================
// Request Handler
// ============================================================================

fn handle_request(engine: &GraphAccessEngine, session: &mut ClientSession, request: Request) -> Response {
    match request {
        Request::Hello { protocol_version, client_id } => {
            session.protocol_version = protocol_version.unwrap_or(PROTOCOL_VERSION);
            debug!(client = session.id, client_name = ?client_id, "hello");
            Response::HelloOk {
                ok: true,
                protocol_version: PROTOCOL_VERSION,
                server_version: env!("CARGO_PKG_VERSION").to_string(),
            }
        }

        Request::StartQuery { algorithm } => match session.start_query(engine, algorithm) {
            Ok(query_id) => Response::QueryStarted { query_id },
            Err(e) => e.into(),
        },

        Request::GetNeighbours { node, label, direction, query_id } => {
            let request = NeighbourRequest::new(node, label, direction);
            match engine.get_neighbours(request, query_id) {
                Ok(neighbours) => Response::Neighbours { neighbours },
                Err(e) => e.into(),
            }
        }

        Request::EndQuery { query_id } => match session.end_query(engine, query_id) {
            Ok(()) => Response::Ok { ok: true },
            Err(e) => e.into(),
        },

        Request::GetStats => match engine.stats().to_json() {
            Ok(stats) => Response::Stats { stats },
            Err(e) => e.into(),
        },

        Request::Ping => Response::Pong { pong: true },
    }
}

// ============================================================================
// Client Connection Handler
// ============================================================================

fn read_message<R: Read>(stream: &mut R) -> std::io::Result<Option<Vec<u8>>> {
    // Read 4-byte length prefix (big-endian)
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Message too large: {} bytes", len),
        ));
    }

    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf)?;
    Ok(Some(buf))
}

fn write_message<W: Write>(stream: &mut W, data: &[u8]) -> std::io::Result<()> {
    let len = data.len() as u32;
    stream.write_all(&len.to_be_bytes())?;
    stream.write_all(data)?;
    stream.flush()
}

fn handle_client(mut stream: UnixStream, engine: Arc<GraphAccessEngine>, client_id: usize) {
    info!(client = client_id, "client connected");
    let mut session = ClientSession::new(client_id);

    loop {
        let msg = match read_message(&mut stream) {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                info!(client = client_id, "client disconnected");
                break;
            }
            Err(e) => {
                warn!(client = client_id, error = %e, "read error");
                break;
            }
        };

        let envelope = match rmp_serde::from_slice::<RequestEnvelope>(&msg) {
            Ok(env) => {
                let response = handle_request(&engine, &mut session, env.request);
                ResponseEnvelope { request_id: env.request_id, response }
            }
            Err(e) => ResponseEnvelope {
                request_id: None,
                response: Response::ErrorWithCode {
                    error: format!("Invalid request: {}", e),
                    code: "INVALID_REQUEST".to_string(),
                },
            },
        };

        let resp_bytes = match rmp_serde::to_vec_named(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(client = client_id, error = %e, "serialize error");
                continue;
            }
        };

        if let Err(e) = write_message(&mut stream, &resp_bytes) {
            warn!(client = client_id, error = %e, "write error");
            break;
        }
    }

    // Cleanup: end whatever the client left open
    let ended = session.close(&engine);
    if ended > 0 {
        info!(client = client_id, ended, "ended queries left open by client");
    }
}

// ============================================================================
// Command Line
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    fn level(self) -> Level {
        match self {
            Verbosity::Quiet => Level::WARN,
            Verbosity::Normal => Level::INFO,
            Verbosity::Verbose => Level::DEBUG,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ServerArgs {
    data_dir: PathBuf,
    socket: PathBuf,
    config: Option<PathBuf>,
    layout: Option<IndexLayout>,
    workers: Option<usize>,
    verbosity: Verbosity,
    demo: bool,
}

#[derive(Debug, PartialEq)]
enum Command {
    Help,
    Version,
    Serve(ServerArgs),
}

const USAGE: &str = "Usage: graph-access-server <data-dir> [--socket <path>] [--config <file>] \
[--layout outgoing|bidirectional] [--workers N] [--demo] [--quiet|--verbose]";

fn print_help() {
    println!("graph-access-server {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Cached, prefetching neighbour lookups over range-addressable CSR objects");
    println!();
    println!("{}", USAGE);
    println!();
    println!("Arguments:");
    println!("  <data-dir>     Directory holding the graph objects");
    println!("  --socket       Unix socket path (default: {})", DEFAULT_SOCKET);
    println!("  --config       JSON engine config file");
    println!("  --layout       Index layout of the objects (default: bidirectional)");
    println!("  --workers      Prefetch workers per query");
    println!();
    println!("Flags:");
    println!("  --demo         Write a small generated graph into <data-dir> first");
    println!("  --quiet        Only log warnings and errors");
    println!("  --verbose      Log every request");
    println!("  -V, --version  Print version information");
    println!("  -h, --help     Print this help message");
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    if args.iter().any(|a| a == "--version" || a == "-V") {
        return Ok(Command::Version);
    }
    if args.iter().any(|a| a == "--help" || a == "-h") {
        return Ok(Command::Help);
    }

    let mut data_dir = None;
    let mut socket = PathBuf::from(DEFAULT_SOCKET);
    let mut config = None;
    let mut layout = None;
    let mut workers = None;
    let mut verbosity = Verbosity::Normal;
    let mut demo = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| iter.next().cloned().ok_or_else(|| format!("{} needs a value", flag));
        match arg.as_str() {
            "--socket" => socket = PathBuf::from(value("--socket")?),
            "--config" => config = Some(PathBuf::from(value("--config")?)),
            "--layout" => {
                let raw = value("--layout")?;
                layout = Some(IndexLayout::from_str(&raw).ok_or_else(|| format!("unknown layout '{}'", raw))?);
            }
            "--workers" => {
                let raw = value("--workers")?;
                workers = Some(raw.parse::<usize>().map_err(|_| format!("invalid worker count '{}'", raw))?);
            }
            "--quiet" => verbosity = Verbosity::Quiet,
            "--verbose" => verbosity = Verbosity::Verbose,
            "--demo" => demo = true,
            flag if flag.starts_with("--") => return Err(format!("unknown flag '{}'", flag)),
            path if data_dir.is_none() => data_dir = Some(PathBuf::from(path)),
            extra => return Err(format!("unexpected argument '{}'", extra)),
        }
    }

    let data_dir = data_dir.ok_or_else(|| "missing <data-dir>".to_string())?;
    Ok(Command::Serve(ServerArgs {
        data_dir,
        socket,
        config,
        layout,
        workers,
        verbosity,
        demo,
    }))
}

fn engine_config(args: &ServerArgs) -> anyhow::Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::read_from(path).with_context(|| format!("reading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(layout) = args.layout {
        config.index_layout = layout;
    }
    if let Some(workers) = args.workers {
        config.prefetch_workers = workers;
    }
    config.validate()?;
    Ok(config)
}

/// Deterministic sample graph: every node links to a few others under
/// labels 0..3.
fn write_demo_graph(dir: &Path, layout: IndexLayout) -> anyhow::Result<usize> {
    const NODES: u32 = 1_000;
    const NODES_PER_OBJECT: u32 = 100;

    let mut edges = Vec::new();
    for node in 0..NODES {
        for k in 1..=3u32 {
            let destination = (node.wrapping_mul(31).wrapping_add(k * 17)) % NODES;
            edges.push((node, k % 3, destination));
        }
    }

    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let objects = partition_graph(&edges, NODES, NODES_PER_OBJECT, layout)?;
    let count = objects.len();
    for (name, bytes) in objects {
        std::fs::write(dir.join(&name), bytes).with_context(|| format!("writing {}", name))?;
    }
    Ok(count)
}

// ============================================================================
// Main
// ============================================================================

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let args = match parse_args(&args) {
        Ok(Command::Version) => {
            println!("graph-access-server {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Ok(Command::Help) => {
            print_help();
            return Ok(());
        }
        Ok(Command::Serve(args)) => args,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            eprintln!();
            eprintln!("{}", USAGE);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(args.verbosity.level())
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting graph-access-server");
    let config = engine_config(&args)?;

    if args.demo {
        let objects = write_demo_graph(&args.data_dir, config.index_layout)?;
        info!(objects, dir = %args.data_dir.display(), "wrote demo graph");
    }

    let store: Arc<dyn ObjectStore> = Arc::new(
        LocalStore::open(&args.data_dir).with_context(|| format!("opening {}", args.data_dir.display()))?,
    );
    let engine = Arc::new(GraphAccessEngine::open(store, config)?);
    if engine.directory().is_empty() {
        bail!("no objects found in {}", args.data_dir.display());
    }

    // Remove stale socket file
    let _ = std::fs::remove_file(&args.socket);
    let listener = UnixListener::bind(&args.socket)
        .with_context(|| format!("binding {}", args.socket.display()))?;
    info!(socket = %args.socket.display(), "listening");

    // Set up signal handler for graceful shutdown
    let engine_for_signal = Arc::clone(&engine);
    let socket_for_signal = args.socket.clone();
    let mut signals = signal_hook::iterator::Signals::new([signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM])
        .context("registering signal handlers")?;

    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let stats = engine_for_signal.stats();
            info!(
                signal = sig,
                cache_hits = stats.cache_hits,
                prefetcher_hits = stats.prefetcher_hits,
                in_flight_hits = stats.in_flight_hits,
                remote_fetches = stats.remote_fetches,
                "shutting down"
            );
            let _ = std::fs::remove_file(&socket_for_signal);
            std::process::exit(0);
        }
    });

    // Accept connections
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let client_id = NEXT_CLIENT_ID.fetch_add(1, Ordering::SeqCst);
                let engine = Arc::clone(&engine);
                thread::spawn(move || handle_client(stream, engine, client_id));
            }
            Err(e) => {
                warn!(error = %e, "accept error");
            }
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
