use std::path::PathBuf;

use reginsight_convergence::db::establish_connection_pool;
use reginsight_convergence::models::config::ServerConfig;
use reginsight_convergence::processing::Worker;
use reginsight_convergence::processing::cleaner::HtmlTextExtractor;
use reginsight_convergence::processing::embedding::{FastEmbedder, parse_embedding_model};
use reginsight_convergence::processing::ingest::ingest_csv;
use reginsight_convergence::repository::DieselRepository;

fn main() {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let pool = match establish_connection_pool(&config.database_url) {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };
    let repo = DieselRepository::new(pool);

    // Loaded once and shared by every request for the life of the process.
    let mut embedder = match parse_embedding_model(&config.embedding_model)
        .and_then(FastEmbedder::try_new)
    {
        Ok(embedder) => embedder,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let mut args = std::env::args().skip(1);
    if args.next().as_deref() == Some("ingest") {
        let path = args.next().map(PathBuf::from).unwrap_or(config.input_csv.clone());
        let outcome = ingest_csv(
            &path,
            &HtmlTextExtractor,
            &mut embedder,
            &repo,
            config.ingest_settings(),
        );
        if let Err(e) = outcome {
            log::error!("{e}");
            std::process::exit(1);
        }
        return;
    }

    let context = zmq::Context::new();
    let responder = context.socket(zmq::REP).expect("Cannot create zmq socket");
    responder
        .bind(&config.zmq_address)
        .expect("Cannot bind to zmq port");
    log::info!("Listening on {}", config.zmq_address);

    let mut worker = Worker {
        extractor: &HtmlTextExtractor,
        embedder: &mut embedder,
        repo: &repo,
        settings: config.ingest_settings(),
        default_input: config.input_csv.clone(),
    };

    loop {
        let msg = match responder.recv_bytes(0) {
            Ok(msg) => msg,
            Err(e) => {
                log::error!("Failed to receive message: {e}");
                continue;
            }
        };

        let reply = worker.handle_bytes(&msg);
        let payload = match serde_json::to_vec(&reply) {
            Ok(payload) => payload,
            Err(e) => {
                log::error!("Failed to encode reply: {e}");
                br#"{"status":500,"body":{"detail":"internal error"}}"#.to_vec()
            }
        };
        if let Err(e) = responder.send(payload, 0) {
            log::error!("Failed to send reply: {e}");
        }
    }
}
