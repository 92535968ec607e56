//! Run conformance sessions against another implementation, or against ourselves.

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};
use symbiote::{
    catalog,
    channel::{memory, tcp::Tcp},
    crate_version, parse_duration, BinaryEncoding, Config, Driver, Encoding, JsonEncoding, Policy,
    Report,
};
use tokio::net::TcpListener;
use tracing::{error, info, Level};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// Install a global subscriber that logs at `level` and above.
fn init_logging(level: Level, json: bool) {
    let filter = EnvFilter::new(level.to_string());
    let result = if json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_line_number(true)
            .with_file(true);
        tracing::subscriber::set_global_default(Registry::default().with(filter).with(fmt_layer))
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
        tracing::subscriber::set_global_default(Registry::default().with(filter).with(fmt_layer))
    };
    if let Err(e) = result {
        eprintln!("❌ Failed to set subscriber: {e}");
        std::process::exit(1);
    }
}

/// Build a session [Config] from the shared flags.
fn config(matches: &ArgMatches) -> Config {
    let seed = *matches.get_one::<u64>("seed").unwrap();
    let mut config = Config::recommended(seed);
    config.trials = *matches.get_one::<usize>("trials").unwrap();
    config.timeout = parse_duration(matches.get_one::<String>("timeout").unwrap())
        .unwrap_or_else(|e| {
            eprintln!("❌ Invalid timeout: {e}");
            std::process::exit(1);
        });
    config.policy = matches
        .get_one::<String>("policy")
        .unwrap()
        .parse::<Policy>()
        .unwrap_or_else(|e| {
            eprintln!("❌ Invalid policy: {e}");
            std::process::exit(1);
        });
    config.max_failures = matches.get_one::<usize>("max-failures").copied();
    config.max_message_size = *matches.get_one::<usize>("max-message-size").unwrap();
    config
}

/// Log a finished report and print it to stdout as JSON.
fn emit(report: &Report) -> bool {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{json}"),
        Err(e) => error!(error = %e, "failed to serialize report"),
    }
    report.is_success()
}

/// Accept connections forever, running a Second session on each.
async fn serve<E: Encoding>(driver: Driver<E>, port: u16, once: bool) -> bool {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = TcpListener::bind(addr).await.unwrap_or_else(|e| {
        eprintln!("❌ Failed to bind {addr}: {e}");
        std::process::exit(1);
    });
    info!(%addr, encoding = E::NAME, "listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "failed to accept connection");
                continue;
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            error!(%peer, error = %e, "failed to set nodelay");
        }
        info!(%peer, "accepted connection");
        let channel = Tcp::<E>::new(stream, driver.config().max_message_size);
        if once {
            return emit(&driver.second(channel).await);
        }

        let driver = driver.clone();
        tokio::spawn(async move {
            let report = driver.second(channel).await;
            emit(&report);
        });
    }
}

/// Run a First session against the peer at `addr`.
async fn connect<E: Encoding>(driver: Driver<E>, addr: SocketAddr) -> bool {
    let channel = Tcp::<E>::connect(addr, driver.config().max_message_size)
        .await
        .unwrap_or_else(|e| {
            eprintln!("❌ Failed to connect to {addr}: {e}");
            std::process::exit(1);
        });
    info!(%addr, encoding = E::NAME, "connected");
    emit(&driver.first(channel).await)
}

/// Run both peers in this process.
async fn local<E: Encoding>(driver: Driver<E>) -> bool {
    let (first, second) = memory::pair(driver.config().mailbox_size);
    let (first, second) = tokio::join!(driver.first(first), driver.second(second));
    let first = emit(&first);
    let second = emit(&second);
    first && second
}

async fn run<E: Encoding>(config: Config, matches: &ArgMatches) -> bool {
    let driver = Driver::<E>::new(Arc::new(catalog::registry()), config);
    match matches.subcommand() {
        Some(("serve", sub)) => {
            let port = *sub.get_one::<u16>("port").unwrap();
            serve(driver, port, sub.get_flag("once")).await
        }
        Some(("connect", sub)) => {
            let addr = sub
                .get_one::<String>("address")
                .unwrap()
                .parse::<SocketAddr>()
                .unwrap_or_else(|e| {
                    eprintln!("❌ Invalid address: {e}");
                    std::process::exit(1);
                });
            connect(driver, addr).await
        }
        Some(("local", _)) => local(driver).await,
        _ => unreachable!("subcommand is required"),
    }
}

#[tokio::main]
async fn main() {
    let matches = Command::new("symbiote")
        .version(crate_version())
        .about("Check that two implementations agree on how values are serialized")
        .subcommand_required(true)
        .arg(
            Arg::new("encoding")
                .short('e')
                .long("encoding")
                .value_name("ENCODING")
                .help("Wire encoding for every message")
                .value_parser(["json", "binary"])
                .default_value("binary")
                .global(true),
        )
        .arg(
            Arg::new("trials")
                .short('n')
                .long("trials")
                .value_name("COUNT")
                .help("Maximum trials each peer generates per topic")
                .value_parser(value_parser!(usize))
                .default_value("100")
                .global(true),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("DURATION")
                .help("How long to wait for the peer in 's' or 'ms'")
                .default_value("10s")
                .global(true),
        )
        .arg(
            Arg::new("policy")
                .long("policy")
                .value_name("POLICY")
                .help("When the generator hands over: per-topic, per-trial, or never")
                .default_value("per-topic")
                .global(true),
        )
        .arg(
            Arg::new("max-failures")
                .long("max-failures")
                .value_name("COUNT")
                .help("Failed trials tolerated per topic before aborting")
                .value_parser(value_parser!(usize))
                .global(true),
        )
        .arg(
            Arg::new("max-message-size")
                .long("max-message-size")
                .value_name("BYTES")
                .help("Largest frame accepted over TCP")
                .value_parser(value_parser!(usize))
                .default_value("1048576")
                .global(true),
        )
        .arg(
            Arg::new("seed")
                .short('s')
                .long("seed")
                .value_name("SEED")
                .help("Seed for value generation")
                .value_parser(value_parser!(u64))
                .default_value("1337")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Minimum level to log")
                .value_parser(value_parser!(Level))
                .default_value("info")
                .global(true),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Log as JSON")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("serve")
                .about("Accept connections and run a Second session on each")
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .help("Port to listen on")
                        .value_parser(value_parser!(u16))
                        .default_value("8080"),
                )
                .arg(
                    Arg::new("once")
                        .long("once")
                        .help("Exit after the first session")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("connect")
                .about("Run a First session against a listening peer")
                .arg(
                    Arg::new("address")
                        .value_name("ADDRESS")
                        .help("Address of the peer, such as 127.0.0.1:8080")
                        .required(true),
                ),
        )
        .subcommand(Command::new("local").about("Run both peers in this process"))
        .get_matches();

    init_logging(
        *matches.get_one::<Level>("log-level").unwrap(),
        matches.get_flag("json-logs"),
    );

    let config = config(&matches);
    let encoding = matches.get_one::<String>("encoding").unwrap().as_str();
    info!(
        encoding,
        trials = config.trials,
        timeout = ?config.timeout,
        policy = %config.policy,
        max_failures = ?config.max_failures,
        seed = config.seed,
        "configuration"
    );

    let success = match encoding {
        "json" => run::<JsonEncoding>(config, &matches).await,
        _ => run::<BinaryEncoding>(config, &matches).await,
    };
    if !success {
        std::process::exit(1);
    }
}
